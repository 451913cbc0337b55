// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `BlueAir` Lib - A Rust library to mirror BlueAir air purifiers.
//!
//! This library keeps a local copy of the state of BlueAir devices in sync
//! with the BlueAir cloud: it polls the cloud on a fixed interval, forwards
//! writes to it, and notifies subscribers of every confirmed change.
//!
//! # Supported Features
//!
//! - **Attributes**: Standby, fan speed, fan mode, night mode, brightness,
//!   child lock, germ shield and the other attributes the cloud reports
//! - **Sensors**: PM1, PM2.5, PM10, VOC, temperature, humidity, filter usage
//! - **Air quality**: A US EPA style AQI derived from PM2.5, PM10 and VOC
//! - **Events**: Per-device callbacks and a registry-wide event broadcast
//!
//! # Quick Start
//!
//! ```no_run
//! use blueair_lib::{DeviceConfig, DeviceRegistry, PlatformConfig, Region, Subscribable};
//!
//! #[tokio::main]
//! async fn main() -> blueair_lib::Result<()> {
//!     let config = PlatformConfig::new("me@example.com", "secret", "account-uuid")
//!         .with_region(Region::Us)
//!         .with_device(DeviceConfig::new("device-uuid").with_name("Bedroom"));
//!
//!     let registry = DeviceRegistry::connect(config).await?;
//!
//!     for device in registry.devices() {
//!         device.on_aqi_changed(|aqi| println!("AQI is now {aqi}"));
//!
//!         // Night mode also lowers the fan speed and turns the display off
//!         let delta = device.request_set("nightmode", true).await?;
//!         println!("{} changed: {:?}", device.name(), delta.keys().collect::<Vec<_>>());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Remote Client
//!
//! The synchronization engine only talks to the cloud through
//! [`RemoteClient`]. Any implementation can be handed to
//! [`DeviceRegistry::start`], which is how the engine is tested without a
//! network.
//!
//! # Architecture
//!
//! - [`manager`]: The registry and the device handles
//! - [`state`]: Confirmed device state and change deltas
//! - [`protocol`]: The cloud client and its wire format
//! - [`aqi`]: Air quality index computation
//! - [`event`]: Registry-wide event broadcasting
//! - [`subscription`]: Per-device callbacks
//! - [`types`]: Attribute values and cloud regions
//! - [`error`]: Error types

pub mod aqi;
mod engine;
pub mod error;
pub mod event;
pub mod manager;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod types;

pub use error::{ConfigError, Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{DeviceEvent, DeviceId, EventBus};
pub use manager::{Device, DeviceConfig, DeviceRegistry, PlatformConfig};
#[cfg(feature = "http")]
pub use protocol::{BlueAirClient, ClientConfig};
pub use protocol::{DeviceStatus, RemoteClient, Session};
pub use state::{DeviceState, StateDelta};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use types::{AttributeValue, Region};

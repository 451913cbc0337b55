// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry for mirroring the devices of a BlueAir account.
//!
//! # Overview
//!
//! The [`DeviceRegistry`] is the entry point for applications. Starting it:
//!
//! - validates the [`PlatformConfig`] and logs in to the cloud
//! - fetches every configured device once and creates a [`Device`] for each
//!   one the cloud knows about
//! - polls the devices on the configured interval and merges the results
//!
//! Each [`Device`] owns its confirmed state. Writes go through the cloud and
//! are merged only once confirmed; the poll of a device is suspended while
//! one of its writes is in flight.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use blueair_lib::manager::{DeviceConfig, DeviceRegistry, PlatformConfig};
//! use blueair_lib::event::DeviceId;
//!
//! #[tokio::main]
//! async fn main() -> blueair_lib::Result<()> {
//!     let config = PlatformConfig::new("me@example.com", "secret", "account-uuid")
//!         .with_device(DeviceConfig::new("device-uuid").with_name("Living Room"));
//!
//!     let registry = DeviceRegistry::connect(config).await?;
//!
//!     let id = DeviceId::new("device-uuid");
//!     registry.request_set(&id, "fanspeed", 2).await?;
//!     registry.request_set(&id, "childlock", true).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Watching Device State
//!
//! ```no_run
//! use blueair_lib::manager::Device;
//!
//! # fn example(device: &Device) {
//! let mut state_rx = device.watch();
//!
//! tokio::spawn(async move {
//!     while state_rx.changed().await.is_ok() {
//!         let state = state_rx.borrow();
//!         println!("Fan speed: {:?}, AQI: {:?}", state.fan_speed(), state.aqi());
//!     }
//! });
//! # }
//! ```

mod device_config;
mod device_registry;
mod managed_device;

pub use device_config::{DeviceConfig, PlatformConfig};
pub use device_registry::DeviceRegistry;
pub use managed_device::Device;

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry-wide device events.
//!
//! Device tasks publish a [`DeviceEvent`] on the shared [`EventBus`] when a
//! device is added, goes missing from a poll, changes state, or fails a
//! write. Per-device callbacks live in [`subscription`](crate::subscription);
//! the bus is for consumers that watch every device at once.
//!
//! # Examples
//!
//! ```
//! use blueair_lib::event::{DeviceEvent, DeviceId, EventBus};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(DeviceEvent::device_missing(DeviceId::new("purifier-1")));
//!
//! let event = rx.recv().await.unwrap();
//! assert!(event.is_lifecycle());
//! assert_eq!(event.device_id().as_str(), "purifier-1");
//! # }
//! ```

mod device_event;
mod device_id;
mod event_bus;

pub use device_event::DeviceEvent;
pub use device_id::DeviceId;
pub use event_bus::EventBus;

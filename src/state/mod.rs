// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state management types.
//!
//! This module provides the confirmed state mirror of a BlueAir device.
//! [`DeviceState`] holds the attributes, sensor readings and derived AQI of
//! a device, and [`StateDelta`] describes what a reconciliation changed.
//!
//! # Examples
//!
//! ```
//! use blueair_lib::state::{Attributes, DeviceState, SensorReadings};
//! use blueair_lib::types::AttributeValue;
//!
//! let mut state = DeviceState::new(
//!     Attributes::from([("standby".to_string(), AttributeValue::Bool(false))]),
//!     SensorReadings::new(),
//! )
//! .unwrap();
//!
//! // Reconcile a poll snapshot
//! let delta = state
//!     .reconcile(
//!         &Attributes::from([("standby".to_string(), AttributeValue::Bool(true))]),
//!         &SensorReadings::from([("pm2_5".to_string(), 35.4)]),
//!     )
//!     .unwrap();
//!
//! assert_eq!(delta.attribute("standby"), Some(AttributeValue::Bool(true)));
//! assert_eq!(delta.aqi, Some(100));
//! assert_eq!(state.aqi(), Some(100));
//! ```

use std::collections::BTreeMap;

use crate::types::AttributeValue;

mod device_state;
mod state_delta;

pub use device_state::DeviceState;
pub use state_delta::StateDelta;

/// Device state attributes keyed by attribute name.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Sensor readings keyed by sensor name.
pub type SensorReadings = BTreeMap<String, f64>;

/// Fan speed forced when night mode is switched on.
pub const NIGHT_MODE_FAN_SPEED: i64 = 11;

/// Names of the attributes reported by BlueAir purifiers.
pub mod attribute {
    /// Device is in standby (off).
    pub const STANDBY: &str = "standby";
    /// Fan speed.
    pub const FAN_SPEED: &str = "fanspeed";
    /// Physical controls are locked.
    pub const CHILD_LOCK: &str = "childlock";
    /// Fan speed follows air quality.
    pub const AUTO_MODE: &str = "automode";
    /// Night mode.
    pub const NIGHT_MODE: &str = "nightmode";
    /// LED brightness.
    pub const BRIGHTNESS: &str = "brightness";
    /// Germ shield.
    pub const GERM_SHIELD: &str = "germshield";
    /// Filter usage in percent.
    pub const FILTER_USAGE: &str = "filterusage";
}

/// Names of the sensors reported by BlueAir purifiers.
pub mod sensor {
    /// Temperature in °C.
    pub const TEMPERATURE: &str = "temperature";
    /// Relative humidity in percent.
    pub const HUMIDITY: &str = "humidity";
    /// PM1 concentration.
    pub const PM1: &str = "pm1";
    /// PM2.5 concentration.
    pub const PM2_5: &str = "pm2_5";
    /// PM10 concentration.
    pub const PM10: &str = "pm10";
    /// Total VOC.
    pub const VOC: &str = "voc";
    /// Formaldehyde.
    pub const HCHO: &str = "hcho";
    /// Measured fan speed.
    pub const FAN_SPEED: &str = "fanspeed";
    /// Derived air quality index, never set directly.
    pub const AQI: &str = "aqi";
}

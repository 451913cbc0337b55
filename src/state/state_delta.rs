// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change set produced by a reconciliation.

use serde::Serialize;

use crate::types::AttributeValue;

use super::{Attributes, SensorReadings};

/// The keys a reconciliation actually changed, with their new values.
///
/// A delta never carries unchanged keys, so consumers can update only what
/// moved. `aqi` is `Some` only when the derived index changed.
///
/// # Examples
///
/// ```
/// use blueair_lib::state::StateDelta;
/// use blueair_lib::types::AttributeValue;
///
/// let mut delta = StateDelta::default();
/// assert!(delta.is_empty());
///
/// delta.state.insert("fanspeed".to_string(), AttributeValue::Int(11));
/// assert_eq!(delta.len(), 1);
/// assert!(delta.contains("fanspeed"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateDelta {
    /// Changed attributes.
    pub state: Attributes,
    /// Changed sensor readings.
    pub sensor_data: SensorReadings,
    /// New AQI, if it changed.
    pub aqi: Option<u16>,
}

impl StateDelta {
    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty() && self.sensor_data.is_empty() && self.aqi.is_none()
    }

    /// Returns the number of changed keys, counting the AQI as one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len() + self.sensor_data.len() + usize::from(self.aqi.is_some())
    }

    /// Returns the new value of a changed attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.state.get(name).copied()
    }

    /// Returns the new value of a changed sensor.
    #[must_use]
    pub fn sensor(&self, name: &str) -> Option<f64> {
        self.sensor_data.get(name).copied()
    }

    /// Returns `true` if the named attribute, sensor or `aqi` changed.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state.contains_key(key)
            || self.sensor_data.contains_key(key)
            || (key == super::sensor::AQI && self.aqi.is_some())
    }

    /// Iterates over the names of every changed key.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.state
            .keys()
            .chain(self.sensor_data.keys())
            .map(String::as_str)
            .chain(self.aqi.map(|_| super::sensor::AQI))
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state tracking.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aqi::{self, Pollutant};
use crate::error::ValueError;
use crate::types::AttributeValue;

use super::{Attributes, NIGHT_MODE_FAN_SPEED, SensorReadings, StateDelta, attribute, sensor};

/// Confirmed state of a BlueAir device.
///
/// Holds the attributes, the sensor readings and the AQI derived from them.
/// The set of attributes is fixed when the state is created: every later
/// reconciliation may only change the value of attributes that already
/// exist. Sensors may appear over time.
///
/// [`reconcile`](Self::reconcile) is the only way to change a state after
/// creation.
///
/// # Examples
///
/// ```
/// use blueair_lib::state::{Attributes, DeviceState, SensorReadings};
/// use blueair_lib::types::AttributeValue;
///
/// let state = DeviceState::new(
///     Attributes::from([("fanspeed".to_string(), AttributeValue::Int(30))]),
///     SensorReadings::from([("temperature".to_string(), 21.5)]),
/// )
/// .unwrap();
///
/// assert_eq!(state.attribute("fanspeed"), Some(AttributeValue::Int(30)));
/// assert_eq!(state.sensor("temperature"), Some(21.5));
/// assert_eq!(state.aqi(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    state: Attributes,
    sensor_data: SensorReadings,
    aqi: Option<u16>,
    updated_at: Option<DateTime<Utc>>,
}

impl DeviceState {
    /// Creates a state from an initial snapshot.
    ///
    /// The attribute names of `state` become the fixed schema of the device.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::DerivedSensor`] if `sensor_data` contains `aqi`.
    pub fn new(state: Attributes, sensor_data: SensorReadings) -> Result<Self, ValueError> {
        reject_derived(&sensor_data)?;

        let mut device_state = Self {
            state,
            sensor_data,
            aqi: None,
            updated_at: Some(Utc::now()),
        };
        device_state.aqi = device_state.compute_aqi();
        Ok(device_state)
    }

    // ========== Accessors ==========

    /// Returns every attribute.
    #[must_use]
    pub fn state(&self) -> &Attributes {
        &self.state
    }

    /// Returns every sensor reading, without the derived AQI.
    #[must_use]
    pub fn sensor_data(&self) -> &SensorReadings {
        &self.sensor_data
    }

    /// Returns the value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.state.get(name).copied()
    }

    /// Returns the value of a sensor.
    #[must_use]
    pub fn sensor(&self, name: &str) -> Option<f64> {
        self.sensor_data.get(name).copied()
    }

    /// Returns the derived AQI.
    ///
    /// `None` until one of `pm2_5`, `pm10` or `voc` has been observed.
    #[must_use]
    pub fn aqi(&self) -> Option<u16> {
        self.aqi
    }

    /// Returns when the state last changed.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns `true` if the attribute exists on this device.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.state.contains_key(name)
    }

    /// Returns `true` if the device is in standby.
    #[must_use]
    pub fn is_standby(&self) -> bool {
        self.bool_attribute(attribute::STANDBY)
    }

    /// Returns `true` if night mode is on.
    #[must_use]
    pub fn is_night_mode(&self) -> bool {
        self.bool_attribute(attribute::NIGHT_MODE)
    }

    /// Returns the fan speed attribute.
    #[must_use]
    pub fn fan_speed(&self) -> Option<i64> {
        self.attribute(attribute::FAN_SPEED)
            .and_then(|v| v.as_int())
    }

    /// Returns the filter usage in percent.
    #[must_use]
    pub fn filter_usage(&self) -> Option<i64> {
        self.attribute(attribute::FILTER_USAGE)
            .and_then(|v| v.as_int())
    }

    fn bool_attribute(&self, name: &str) -> bool {
        self.attribute(name)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    // ========== Writes ==========

    /// Checks that `value` may be written to `attribute`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidAttribute`] if the attribute does not
    /// exist, or [`ValueError::TypeMismatch`] if the value kind differs from
    /// the stored one.
    pub fn validate_write(&self, attribute: &str, value: AttributeValue) -> Result<(), ValueError> {
        let current = self
            .state
            .get(attribute)
            .ok_or_else(|| ValueError::InvalidAttribute(attribute.to_string()))?;

        if current.kind() != value.kind() {
            return Err(ValueError::TypeMismatch {
                attribute: attribute.to_string(),
                expected: current.kind(),
                actual: value.kind(),
            });
        }

        Ok(())
    }

    /// Returns the attributes merged once a write of `value` to `attribute`
    /// is confirmed.
    ///
    /// Switching night mode on also forces the fan to
    /// [`NIGHT_MODE_FAN_SPEED`] and the brightness to 0, for devices that
    /// have those attributes.
    #[must_use]
    pub fn write_delta(&self, attribute: &str, value: AttributeValue) -> Attributes {
        let mut writes = Attributes::from([(attribute.to_string(), value)]);

        if attribute == attribute::NIGHT_MODE && value == AttributeValue::Bool(true) {
            for (coupled, forced) in [
                (attribute::FAN_SPEED, NIGHT_MODE_FAN_SPEED),
                (attribute::BRIGHTNESS, 0),
            ] {
                if self.has_attribute(coupled) {
                    writes.insert(coupled.to_string(), AttributeValue::Int(forced));
                }
            }
        }

        writes
    }

    // ========== Reconciliation ==========

    /// Merges attribute and sensor values into the state.
    ///
    /// Only keys whose value differs from the current one are applied and
    /// returned. The AQI is recomputed when `pm2_5`, `pm10` or `voc` changed.
    /// The input is validated as a whole before anything is applied, so a
    /// rejected call leaves the state untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] if an attribute is unknown or has the wrong
    /// kind, or if `sensor_data` contains the derived `aqi`.
    pub fn reconcile(
        &mut self,
        state: &Attributes,
        sensor_data: &SensorReadings,
    ) -> Result<StateDelta, ValueError> {
        for (name, value) in state {
            self.validate_write(name, *value)?;
        }
        reject_derived(sensor_data)?;

        let mut delta = StateDelta::default();

        for (name, value) in state {
            if self.state.get(name) != Some(value) {
                delta.state.insert(name.clone(), *value);
            }
        }

        for (name, value) in sensor_data {
            let unchanged = self
                .sensor_data
                .get(name)
                .is_some_and(|current| same_reading(*current, *value));
            if !unchanged {
                delta.sensor_data.insert(name.clone(), *value);
            }
        }

        self.state
            .extend(delta.state.iter().map(|(k, v)| (k.clone(), *v)));
        self.sensor_data
            .extend(delta.sensor_data.iter().map(|(k, v)| (k.clone(), *v)));

        if delta.sensor_data.keys().any(|k| Pollutant::is_aqi_input(k)) {
            let aqi = self.compute_aqi();
            if aqi != self.aqi {
                self.aqi = aqi;
                delta.aqi = aqi;
            }
        }

        if !delta.is_empty() {
            self.updated_at = Some(Utc::now());
        }

        Ok(delta)
    }

    /// Removes the entries [`reconcile`](Self::reconcile) would reject and
    /// returns why each one was removed.
    ///
    /// Used for polled snapshots, where one attribute this device did not
    /// report at startup must not hold back the rest.
    pub fn retain_valid(
        &self,
        state: &mut Attributes,
        sensor_data: &mut SensorReadings,
    ) -> Vec<ValueError> {
        let mut rejected = Vec::new();

        state.retain(|name, value| match self.validate_write(name, *value) {
            Ok(()) => true,
            Err(e) => {
                rejected.push(e);
                false
            }
        });

        if sensor_data.remove(sensor::AQI).is_some() {
            rejected.push(ValueError::DerivedSensor(sensor::AQI.to_string()));
        }

        rejected
    }

    fn compute_aqi(&self) -> Option<u16> {
        aqi::calculate(
            self.sensor(sensor::PM2_5),
            self.sensor(sensor::PM10),
            self.sensor(sensor::VOC),
        )
    }
}

fn reject_derived(sensor_data: &SensorReadings) -> Result<(), ValueError> {
    if sensor_data.contains_key(sensor::AQI) {
        return Err(ValueError::DerivedSensor(sensor::AQI.to_string()));
    }
    Ok(())
}

/// Exact comparison; a NaN reading equals itself.
fn same_reading(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeKind;

    fn purifier() -> DeviceState {
        DeviceState::new(
            Attributes::from([
                ("standby".to_string(), AttributeValue::Bool(false)),
                ("fanspeed".to_string(), AttributeValue::Int(40)),
                ("nightmode".to_string(), AttributeValue::Bool(false)),
                ("brightness".to_string(), AttributeValue::Int(80)),
                ("childlock".to_string(), AttributeValue::Bool(false)),
            ]),
            SensorReadings::from([("temperature".to_string(), 21.0)]),
        )
        .unwrap()
    }

    fn attrs(entries: &[(&str, AttributeValue)]) -> Attributes {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect()
    }

    fn sensors(entries: &[(&str, f64)]) -> SensorReadings {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect()
    }

    #[test]
    fn new_state_without_pollutants_has_no_aqi() {
        let state = purifier();
        assert_eq!(state.aqi(), None);
        assert!(state.updated_at().is_some());
        assert_eq!(state.fan_speed(), Some(40));
        assert!(!state.is_standby());
    }

    #[test]
    fn new_state_computes_aqi_from_snapshot() {
        let state = DeviceState::new(Attributes::new(), sensors(&[("pm10", 154.0)])).unwrap();
        assert_eq!(state.aqi(), Some(100));
    }

    #[test]
    fn new_state_rejects_aqi_sensor() {
        let err = DeviceState::new(Attributes::new(), sensors(&[("aqi", 3.0)])).unwrap_err();
        assert_eq!(err, ValueError::DerivedSensor("aqi".to_string()));
    }

    #[test]
    fn reconcile_returns_only_changed_keys() {
        let mut state = purifier();

        let delta = state
            .reconcile(
                &attrs(&[
                    ("standby", AttributeValue::Bool(true)),
                    ("fanspeed", AttributeValue::Int(40)),
                ]),
                &sensors(&[("temperature", 21.0), ("humidity", 45.0)]),
            )
            .unwrap();

        assert_eq!(delta.state, attrs(&[("standby", AttributeValue::Bool(true))]));
        assert_eq!(delta.sensor_data, sensors(&[("humidity", 45.0)]));
        assert_eq!(delta.aqi, None);
        assert!(state.is_standby());
        assert_eq!(state.sensor("humidity"), Some(45.0));
    }

    #[test]
    fn reconcile_with_current_values_is_empty() {
        let mut state = purifier();
        let before = state.clone();

        let delta = state
            .reconcile(&before.state().clone(), &before.sensor_data().clone())
            .unwrap();

        assert!(delta.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn reconcile_rejects_unknown_attribute_atomically() {
        let mut state = purifier();
        let before = state.clone();

        let err = state
            .reconcile(
                &attrs(&[
                    ("standby", AttributeValue::Bool(true)),
                    ("turbo", AttributeValue::Bool(true)),
                ]),
                &SensorReadings::new(),
            )
            .unwrap_err();

        assert_eq!(err, ValueError::InvalidAttribute("turbo".to_string()));
        assert_eq!(state, before);
    }

    #[test]
    fn reconcile_rejects_kind_change() {
        let mut state = purifier();
        let err = state
            .reconcile(
                &attrs(&[("standby", AttributeValue::Int(1))]),
                &SensorReadings::new(),
            )
            .unwrap_err();

        assert_eq!(
            err,
            ValueError::TypeMismatch {
                attribute: "standby".to_string(),
                expected: AttributeKind::Bool,
                actual: AttributeKind::Int,
            }
        );
    }

    #[test]
    fn reconcile_rejects_direct_aqi() {
        let mut state = purifier();
        let err = state
            .reconcile(&Attributes::new(), &sensors(&[("aqi", 12.0)]))
            .unwrap_err();
        assert_eq!(err, ValueError::DerivedSensor("aqi".to_string()));
        assert_eq!(state.aqi(), None);
    }

    #[test]
    fn aqi_appears_with_first_pollutant() {
        let mut state = purifier();

        let delta = state
            .reconcile(
                &Attributes::new(),
                &sensors(&[("pm2_5", 0.0), ("pm10", 0.0), ("voc", 0.0)]),
            )
            .unwrap();

        assert_eq!(delta.aqi, Some(0));
        assert_eq!(state.aqi(), Some(0));
    }

    #[test]
    fn aqi_in_delta_only_when_it_changes() {
        let mut state = purifier();
        state
            .reconcile(&Attributes::new(), &sensors(&[("pm2_5", 35.4)]))
            .unwrap();
        assert_eq!(state.aqi(), Some(100));

        // pm10 changes but PM2.5 still dominates
        let delta = state
            .reconcile(&Attributes::new(), &sensors(&[("pm10", 10.0)]))
            .unwrap();
        assert_eq!(delta.sensor("pm10"), Some(10.0));
        assert_eq!(delta.aqi, None);

        let delta = state
            .reconcile(&Attributes::new(), &sensors(&[("pm2_5", 5.0)]))
            .unwrap();
        assert_eq!(delta.aqi, Some(28));
    }

    #[test]
    fn non_pollutant_sensor_does_not_touch_aqi() {
        let mut state = purifier();
        let delta = state
            .reconcile(&Attributes::new(), &sensors(&[("pm1", 50.0)]))
            .unwrap();
        assert_eq!(delta.aqi, None);
        assert_eq!(state.aqi(), None);
    }

    #[test]
    fn retain_valid_drops_only_rejected_entries() {
        let state = purifier();
        let mut attributes = attrs(&[
            ("standby", AttributeValue::Bool(true)),
            ("germshield", AttributeValue::Bool(true)),
            ("fanspeed", AttributeValue::Bool(true)),
        ]);
        let mut readings = sensors(&[("pm2_5", 12.0), ("aqi", 40.0)]);

        let rejected = state.retain_valid(&mut attributes, &mut readings);

        assert_eq!(attributes, attrs(&[("standby", AttributeValue::Bool(true))]));
        assert_eq!(readings, sensors(&[("pm2_5", 12.0)]));
        assert_eq!(rejected.len(), 3);
        assert!(rejected.contains(&ValueError::InvalidAttribute("germshield".to_string())));
        assert!(rejected.contains(&ValueError::DerivedSensor("aqi".to_string())));
    }

    #[test]
    fn validate_write() {
        let state = purifier();
        assert!(state.validate_write("fanspeed", AttributeValue::Int(11)).is_ok());
        assert_eq!(
            state.validate_write("turbo", AttributeValue::Int(1)),
            Err(ValueError::InvalidAttribute("turbo".to_string()))
        );
        assert!(matches!(
            state.validate_write("fanspeed", AttributeValue::Bool(true)),
            Err(ValueError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn night_mode_write_forces_fan_and_brightness() {
        let state = purifier();
        let writes = state.write_delta("nightmode", AttributeValue::Bool(true));

        assert_eq!(
            writes,
            attrs(&[
                ("nightmode", AttributeValue::Bool(true)),
                ("fanspeed", AttributeValue::Int(NIGHT_MODE_FAN_SPEED)),
                ("brightness", AttributeValue::Int(0)),
            ])
        );
    }

    #[test]
    fn night_mode_write_forces_values_even_if_already_set() {
        let mut state = purifier();
        state
            .reconcile(
                &attrs(&[
                    ("fanspeed", AttributeValue::Int(NIGHT_MODE_FAN_SPEED)),
                    ("brightness", AttributeValue::Int(0)),
                ]),
                &SensorReadings::new(),
            )
            .unwrap();

        let writes = state.write_delta("nightmode", AttributeValue::Bool(true));
        assert_eq!(writes.len(), 3);
        assert_eq!(
            writes.get("fanspeed"),
            Some(&AttributeValue::Int(NIGHT_MODE_FAN_SPEED))
        );
        assert_eq!(writes.get("brightness"), Some(&AttributeValue::Int(0)));
    }

    #[test]
    fn night_mode_off_has_no_coupling() {
        let state = purifier();
        let writes = state.write_delta("nightmode", AttributeValue::Bool(false));
        assert_eq!(writes, attrs(&[("nightmode", AttributeValue::Bool(false))]));
    }

    #[test]
    fn night_mode_coupling_skips_missing_attributes() {
        let state = DeviceState::new(
            attrs(&[("nightmode", AttributeValue::Bool(false))]),
            SensorReadings::new(),
        )
        .unwrap();

        let writes = state.write_delta("nightmode", AttributeValue::Bool(true));
        assert_eq!(writes, attrs(&[("nightmode", AttributeValue::Bool(true))]));
    }
}

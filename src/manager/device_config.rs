// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform and device configuration.
//!
//! Field names follow the camelCase keys of the plugin's JSON configuration,
//! and every field missing from the JSON takes its default value.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::event::DeviceId;
use crate::types::Region;

/// Configuration of the whole platform: account, region, polling, devices.
///
/// # Examples
///
/// ```
/// use blueair_lib::manager::{DeviceConfig, PlatformConfig};
///
/// let config: PlatformConfig = serde_json::from_str(r#"{
///     "username": "me@example.com",
///     "password": "secret",
///     "accountUuid": "account-uuid",
///     "region": "USA",
///     "devices": [{ "id": "device-uuid", "name": "Bedroom" }]
/// }"#).unwrap();
///
/// assert_eq!(config.polling_interval_ms, 5000);
/// assert_eq!(config.devices[0].filter_change_level, 90);
/// assert!(config.validate().is_ok());
///
/// // Or built in code
/// let config = PlatformConfig::new("me@example.com", "secret", "account-uuid")
///     .with_device(DeviceConfig::new("device-uuid").with_name("Bedroom"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformConfig {
    /// Display name of the platform.
    pub name: String,
    /// BlueAir account username.
    pub username: String,
    /// BlueAir account password.
    pub password: String,
    /// Region the account is registered in.
    pub region: Region,
    /// Account UUID, as shown by device discovery.
    pub account_uuid: String,
    /// Log every poll at info level instead of debug.
    pub verbose_logging: bool,
    /// Enable debug output in the configuration UI.
    pub ui_debug: bool,
    /// Delay between two polls of a device, in milliseconds.
    #[serde(rename = "pollingInterval")]
    pub polling_interval_ms: u64,
    /// Devices to mirror.
    pub devices: Vec<DeviceConfig>,
}

impl PlatformConfig {
    /// Default platform name.
    pub const DEFAULT_NAME: &'static str = "BlueAir Platform";
    /// Default polling interval in milliseconds.
    pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 5000;

    /// Creates a configuration for an account, with defaults everywhere else.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        account_uuid: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            account_uuid: account_uuid.into(),
            ..Self::default()
        }
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Sets the polling interval.
    #[must_use]
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Adds a device.
    #[must_use]
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.devices.push(device);
        self
    }

    /// Returns the polling interval.
    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// Returns the configuration of a device.
    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.id == id.as_str())
    }

    /// Returns the identifiers of every configured device, in order.
    #[must_use]
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.iter().map(|d| DeviceId::new(&d.id)).collect()
    }

    /// Checks that the configuration can be used to start a registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if credentials or the account UUID are empty,
    /// the polling interval is zero, or a device is configured twice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.is_empty() {
            return Err(ConfigError::MissingOption("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingOption("password"));
        }
        if self.account_uuid.is_empty() {
            return Err(ConfigError::MissingOption("accountUuid"));
        }
        if self.polling_interval_ms == 0 {
            return Err(ConfigError::InvalidPollingInterval);
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.id.is_empty() {
                return Err(ConfigError::MissingOption("devices[].id"));
            }
            if !seen.insert(device.id.as_str()) {
                return Err(ConfigError::DuplicateDevice(device.id.clone()));
            }
        }

        Ok(())
    }

    /// Builds the configuration of a cloud client for this account.
    #[cfg(feature = "http")]
    #[must_use]
    pub fn client_config(&self) -> crate::protocol::ClientConfig {
        crate::protocol::ClientConfig::new(&self.username, &self.password, &self.account_uuid)
            .with_region(self.region)
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            username: String::new(),
            password: String::new(),
            region: Region::default(),
            account_uuid: String::new(),
            verbose_logging: false,
            ui_debug: false,
            polling_interval_ms: Self::DEFAULT_POLLING_INTERVAL_MS,
            devices: Vec::new(),
        }
    }
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("region", &self.region)
            .field("account_uuid", &self.account_uuid)
            .field("polling_interval_ms", &self.polling_interval_ms)
            .field("devices", &self.devices)
            .finish_non_exhaustive()
    }
}

/// Configuration of one device.
///
/// The feature flags describe which services the presentation layer exposes
/// for the device; the library itself only uses `id` and `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    /// Device UUID.
    pub id: String,
    /// Display name; when empty, the name registered in the cloud is used.
    pub name: String,
    /// Model name.
    pub model: String,
    /// Serial number.
    pub serial_number: String,
    /// Filter usage in percent above which the filter needs changing.
    pub filter_change_level: u8,
    /// Expose the LED.
    pub led: bool,
    /// Expose the air quality sensor.
    pub air_quality_sensor: bool,
    /// Expose the CO2 sensor.
    pub co2_sensor: bool,
    /// Expose the temperature sensor.
    pub temperature_sensor: bool,
    /// Expose the humidity sensor.
    pub humidity_sensor: bool,
    /// Expose the germ shield switch.
    pub germ_shield: bool,
    /// Expose the night mode switch.
    pub night_mode: bool,
}

impl DeviceConfig {
    /// Default filter change level in percent.
    pub const DEFAULT_FILTER_CHANGE_LEVEL: u8 = 90;

    /// Creates a configuration for the given device UUID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the model and serial number.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, serial_number: impl Into<String>) -> Self {
        self.model = model.into();
        self.serial_number = serial_number.into();
        self
    }

    /// Sets the filter change level.
    #[must_use]
    pub fn with_filter_change_level(mut self, level: u8) -> Self {
        self.filter_change_level = level;
        self
    }

    /// Returns the device identifier.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        DeviceId::new(&self.id)
    }

    /// Returns `true` once `filter_usage` has reached the change level.
    #[must_use]
    pub fn filter_needs_change(&self, filter_usage: i64) -> bool {
        filter_usage >= i64::from(self.filter_change_level)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            model: String::new(),
            serial_number: String::new(),
            filter_change_level: Self::DEFAULT_FILTER_CHANGE_LEVEL,
            led: false,
            air_quality_sensor: false,
            co2_sensor: false,
            temperature_sensor: false,
            humidity_sensor: false,
            germ_shield: false,
            night_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PlatformConfig {
        PlatformConfig::new("user", "pass", "acct").with_device(DeviceConfig::new("dev-1"))
    }

    #[test]
    fn defaults_from_empty_json() {
        let config: PlatformConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.name, "BlueAir Platform");
        assert_eq!(config.region, Region::Eu);
        assert_eq!(config.polling_interval(), Duration::from_secs(5));
        assert!(!config.verbose_logging);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn camel_case_fields() {
        let config: PlatformConfig = serde_json::from_str(
            r#"{
                "username": "u",
                "password": "p",
                "accountUuid": "acct",
                "region": "China",
                "verboseLogging": true,
                "pollingInterval": 10000,
                "devices": [{
                    "id": "dev-1",
                    "name": "Office",
                    "serialNumber": "SN1",
                    "filterChangeLevel": 80,
                    "germShield": true,
                    "nightMode": true
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.account_uuid, "acct");
        assert_eq!(config.region, Region::Cn);
        assert!(config.verbose_logging);
        assert_eq!(config.polling_interval_ms, 10_000);

        let device = &config.devices[0];
        assert_eq!(device.serial_number, "SN1");
        assert_eq!(device.filter_change_level, 80);
        assert!(device.germ_shield);
        assert!(device.night_mode);
        assert!(!device.led);
    }

    #[test]
    fn device_defaults() {
        let device: DeviceConfig = serde_json::from_str(r#"{"id": "dev-1"}"#).unwrap();
        assert_eq!(device, DeviceConfig::new("dev-1"));
        assert_eq!(device.filter_change_level, 90);
        assert!(device.filter_needs_change(90));
        assert!(!device.filter_needs_change(89));
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_missing_options() {
        let mut config = valid();
        config.password.clear();
        assert_eq!(config.validate(), Err(ConfigError::MissingOption("password")));

        let mut config = valid();
        config.account_uuid.clear();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingOption("accountUuid"))
        );
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let config = valid().with_polling_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::InvalidPollingInterval));
    }

    #[test]
    fn validate_rejects_duplicate_devices() {
        let config = valid().with_device(DeviceConfig::new("dev-1"));
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateDevice("dev-1".to_string()))
        );
    }

    #[test]
    fn device_lookup() {
        let config = valid().with_device(DeviceConfig::new("dev-2").with_name("Kitchen"));
        assert_eq!(
            config.device(&DeviceId::new("dev-2")).map(|d| d.name.as_str()),
            Some("Kitchen")
        );
        assert!(config.device(&DeviceId::new("dev-3")).is_none());
        assert_eq!(
            config.device_ids(),
            vec![DeviceId::new("dev-1"), DeviceId::new("dev-2")]
        );
    }

    #[test]
    fn debug_hides_password() {
        let debug = format!("{:?}", PlatformConfig::new("user", "hunter2", "acct"));
        assert!(!debug.contains("hunter2"));
    }
}

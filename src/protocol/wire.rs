// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request and response bodies of the BlueAir cloud API.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::event::DeviceId;
use crate::protocol::DeviceStatus;
use crate::state::{Attributes, SensorReadings, sensor};
use crate::types::AttributeValue;

/// Maps a wire sensor name to its normalized name.
///
/// Sensors not listed here are dropped.
pub(crate) fn sensor_name(wire: &str) -> Option<&'static str> {
    Some(match wire {
        "fsp0" => sensor::FAN_SPEED,
        "hcho" => sensor::HCHO,
        "h" => sensor::HUMIDITY,
        "pm1" => sensor::PM1,
        "pm10" => sensor::PM10,
        "pm2_5" => sensor::PM2_5,
        "t" => sensor::TEMPERATURE,
        "tVOC" => sensor::VOC,
        _ => return None,
    })
}

// ============================================================================
// Authentication
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct GigyaSessionResponse {
    pub(crate) oauth_token: Option<String>,
    pub(crate) oauth_token_secret: Option<String>,
    #[serde(rename = "errorMessage")]
    pub(crate) error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GigyaJwtResponse {
    pub(crate) id_token: Option<String>,
    #[serde(rename = "errorMessage")]
    pub(crate) error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessTokenResponse {
    pub(crate) access_token: Option<String>,
}

// ============================================================================
// Device state
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct StateQuery {
    deviceconfigquery: Vec<ConfigQuery>,
    includestates: bool,
    eventsubscription: EventSubscription,
}

#[derive(Debug, Serialize)]
struct ConfigQuery {
    id: String,
    r: ResourceQuery,
}

#[derive(Debug, Serialize)]
struct ResourceQuery {
    r: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct EventSubscription {
    include: Vec<EventFilter>,
}

#[derive(Debug, Serialize)]
struct EventFilter {
    filter: FilterExpression,
}

#[derive(Debug, Serialize)]
struct FilterExpression {
    o: String,
}

impl StateQuery {
    pub(crate) fn new(ids: &[DeviceId]) -> Self {
        Self {
            deviceconfigquery: ids
                .iter()
                .map(|id| ConfigQuery {
                    id: id.to_string(),
                    r: ResourceQuery { r: ["sensors"] },
                })
                .collect(),
            includestates: true,
            eventsubscription: EventSubscription {
                include: ids
                    .iter()
                    .map(|id| EventFilter {
                        filter: FilterExpression {
                            o: format!("= {id}"),
                        },
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StateResponse {
    #[serde(rename = "deviceInfo")]
    device_info: Option<Vec<DeviceInfo>>,
}

#[derive(Debug, Deserialize)]
struct DeviceInfo {
    id: String,
    configuration: Configuration,
    #[serde(default)]
    sensordata: Vec<SensorEntry>,
    #[serde(default)]
    states: Vec<StateEntry>,
}

#[derive(Debug, Deserialize)]
struct Configuration {
    di: DeviceIdentity,
}

#[derive(Debug, Deserialize)]
struct DeviceIdentity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SensorEntry {
    n: String,
    v: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StateEntry {
    n: String,
    v: Option<serde_json::Value>,
    vb: Option<bool>,
}

impl StateEntry {
    /// Returns the attribute value, or `None` for values that are neither
    /// integers nor booleans (firmware version strings, for instance).
    fn value(&self) -> Option<AttributeValue> {
        match (&self.v, self.vb) {
            (Some(v), _) => v
                .as_i64()
                .map(AttributeValue::Int)
                .or_else(|| v.as_bool().map(AttributeValue::Bool)),
            (None, Some(vb)) => Some(AttributeValue::Bool(vb)),
            (None, None) => None,
        }
    }
}

impl StateResponse {
    /// Converts the response into normalized device statuses.
    pub(crate) fn into_statuses(self) -> Result<Vec<DeviceStatus>, ParseError> {
        let devices = self
            .device_info
            .ok_or_else(|| ParseError::MissingField("deviceInfo".to_string()))?;

        Ok(devices.into_iter().map(DeviceInfo::into_status).collect())
    }
}

impl DeviceInfo {
    fn into_status(self) -> DeviceStatus {
        let sensor_data: SensorReadings = self
            .sensordata
            .iter()
            .filter_map(|entry| Some((sensor_name(&entry.n)?.to_string(), entry.v?)))
            .collect();

        let mut state = Attributes::new();
        for entry in &self.states {
            match entry.value() {
                Some(value) => {
                    state.insert(entry.n.clone(), value);
                }
                None if entry.v.is_some() => {
                    tracing::trace!(device_id = %self.id, state = %entry.n, "Skipping non-numeric state");
                }
                None => {
                    tracing::warn!(device_id = %self.id, state = %entry.n, "Unknown state entry without value");
                }
            }
        }

        DeviceStatus {
            id: DeviceId::new(self.id),
            name: self.configuration.di.name,
            state,
            sensor_data,
        }
    }
}

// ============================================================================
// Writes
// ============================================================================

/// Body of an attribute write: integers go in `v`, booleans in `vb`.
#[derive(Debug, Serialize)]
pub(crate) struct WriteBody<'a> {
    n: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    v: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vb: Option<bool>,
}

impl<'a> WriteBody<'a> {
    pub(crate) fn new(attribute: &'a str, value: AttributeValue) -> Self {
        let (v, vb) = match value {
            AttributeValue::Int(i) => (Some(i), None),
            AttributeValue::Bool(b) => (None, Some(b)),
        };
        Self { n: attribute, v, vb }
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// A device registered to the account, as listed by the discovery endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredDevice {
    /// Device identifier, used as [`DeviceConfig::id`](crate::manager::DeviceConfig).
    pub uuid: String,
    /// Name given in the BlueAir app.
    #[serde(default)]
    pub name: String,
    /// MAC address.
    #[serde(default)]
    pub mac: String,
    /// Device family.
    #[serde(default, rename = "type")]
    pub device_type: String,
    /// Role of the account for this device.
    #[serde(default, rename = "user-type")]
    pub user_type: String,
    /// MCU firmware version.
    #[serde(default, rename = "mcu-firmware")]
    pub mcu_firmware: String,
    /// Wi-Fi module firmware version.
    #[serde(default, rename = "wifi-firmware")]
    pub wifi_firmware: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisteredDevicesResponse {
    pub(crate) devices: Option<Vec<RegisteredDevice>>,
}

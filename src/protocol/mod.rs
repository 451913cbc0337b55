// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Communication with the BlueAir cloud.
//!
//! The synchronization engine only depends on the [`RemoteClient`] trait,
//! which covers the three calls it needs: login, batch state fetch and
//! single attribute write.
//!
//! # Clients
//!
//! - [`BlueAirClient`]: the BlueAir AWS cloud API over HTTPS (feature `http`)
//!
//! Every remote call made by [`BlueAirClient`] is bounded by a per-attempt
//! timeout and a retry budget, see [`ClientConfig`].

#[cfg(feature = "http")]
mod gigya;
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
mod retry;
mod session;
#[cfg(feature = "http")]
mod wire;

#[cfg(feature = "http")]
pub use http::{BlueAirClient, ClientConfig};
pub use session::Session;
#[cfg(feature = "http")]
pub use wire::RegisteredDevice;

use std::future::Future;

use crate::error::ProtocolError;
use crate::event::DeviceId;
use crate::state::{Attributes, SensorReadings};
use crate::types::AttributeValue;

/// Full state of one device as reported by the cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    /// The device identifier.
    pub id: DeviceId,
    /// The name the device is registered under.
    pub name: String,
    /// Attribute values.
    pub state: Attributes,
    /// Sensor readings, keyed by their normalized names.
    pub sensor_data: SensorReadings,
}

/// Access to the remote service that owns the authoritative device state.
///
/// Implementations must be shareable between the poll scheduler and every
/// device task, hence the `Send + Sync` bound.
pub trait RemoteClient: Send + Sync + 'static {
    /// Returns a valid session, logging in when none exists or the cached
    /// one has expired.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if authentication fails.
    fn login(&self) -> impl Future<Output = Result<Session, ProtocolError>> + Send;

    /// Fetches the full state of the given devices in one request.
    ///
    /// Identifiers unknown to the service are absent from the result.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the request fails after all retries.
    fn fetch_state(
        &self,
        ids: &[DeviceId],
    ) -> impl Future<Output = Result<Vec<DeviceStatus>, ProtocolError>> + Send;

    /// Sets one attribute of one device.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the write is not confirmed.
    fn write_attribute(
        &self,
        id: &DeviceId,
        attribute: &str,
        value: AttributeValue,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;
}

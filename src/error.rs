// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `BlueAir` library.
//!
//! This module provides the error hierarchy for handling failures across the
//! library. Response parsing failures surface as
//! [`ProtocolError::InvalidResponse`].

use thiserror::Error;

use crate::event::DeviceId;
use crate::types::AttributeKind;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// An attribute or sensor value was rejected.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Communication with the BlueAir cloud failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Device was not found in the registry.
    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),

    /// The device's synchronization task is no longer running.
    #[error("device {0} is no longer running")]
    DeviceStopped(DeviceId),
}

/// Errors related to attribute and sensor validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The attribute is not part of the device's state.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// The sensor is derived and cannot be set directly.
    #[error("sensor {0} is derived and cannot be set")]
    DerivedSensor(String),

    /// The value kind does not match the attribute's kind.
    #[error("attribute {attribute} expects a {expected} value, got {actual}")]
    TypeMismatch {
        /// The attribute name.
        attribute: String,
        /// The kind currently stored for the attribute.
        expected: AttributeKind,
        /// The kind that was provided.
        actual: AttributeKind,
    },
}

/// Errors related to communication with the BlueAir cloud.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body.
        body: String,
    },

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Every attempt allowed by the retry budget failed.
    #[error("request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error of the last attempt.
        #[source]
        source: Box<ProtocolError>,
    },

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] ParseError),
}

/// Errors related to parsing BlueAir responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),}

/// Errors related to configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required option is empty.
    #[error("missing required option: {0}")]
    MissingOption(&'static str),

    /// The polling interval is zero.
    #[error("polling interval must be greater than zero")]
    InvalidPollingInterval,

    /// The same device id is configured twice.
    #[error("device {0} is configured more than once")]
    DuplicateDevice(String),

    /// The region label is unknown.
    #[error("unknown region: {0}")]
    InvalidRegion(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device event types.

use crate::state::{DeviceState, StateDelta};

use super::DeviceId;

/// Events emitted by the device registry.
///
/// Every event carries the id of the device it concerns.
///
/// # Examples
///
/// ```
/// use blueair_lib::event::{DeviceId, DeviceEvent};
///
/// let device_id = DeviceId::new("purifier-1");
///
/// let added = DeviceEvent::device_added(device_id.clone(), "Bedroom");
/// assert!(added.is_lifecycle());
///
/// let missing = DeviceEvent::device_missing(device_id);
/// assert_eq!(missing.device_id().as_str(), "purifier-1");
/// ```
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A device was found in the initial snapshot and is now mirrored.
    DeviceAdded {
        /// The ID of the added device.
        device_id: DeviceId,
        /// The display name of the device.
        name: String,
    },

    /// A device that was being polled is absent from a fetch response.
    DeviceMissing {
        /// The ID of the device.
        device_id: DeviceId,
    },

    /// Device state changed.
    ///
    /// Emitted after every reconciliation with a non-empty delta, whether
    /// it came from a poll or a confirmed write.
    StateChanged {
        /// The ID of the device.
        device_id: DeviceId,
        /// The keys that changed.
        delta: StateDelta,
        /// The complete new state of the device.
        new_state: DeviceState,
    },

    /// A write was rejected by the cloud and nothing was merged.
    WriteFailed {
        /// The ID of the device.
        device_id: DeviceId,
        /// The attribute that was being written.
        attribute: String,
        /// The error reported for the write.
        error: String,
    },
}

impl DeviceEvent {
    /// Returns the device ID associated with this event.
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::DeviceAdded { device_id, .. }
            | Self::DeviceMissing { device_id }
            | Self::StateChanged { device_id, .. }
            | Self::WriteFailed { device_id, .. } => device_id,
        }
    }

    /// Returns `true` if this is a device lifecycle event (added/missing).
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::DeviceAdded { .. } | Self::DeviceMissing { .. })
    }

    /// Returns `true` if this is a state change event.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }

    /// Returns `true` if this is a failed write.
    #[must_use]
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::WriteFailed { .. })
    }

    /// Creates a device added event.
    #[must_use]
    pub fn device_added(device_id: DeviceId, name: impl Into<String>) -> Self {
        Self::DeviceAdded {
            device_id,
            name: name.into(),
        }
    }

    /// Creates a device missing event.
    #[must_use]
    pub fn device_missing(device_id: DeviceId) -> Self {
        Self::DeviceMissing { device_id }
    }

    /// Creates a state changed event.
    #[must_use]
    pub fn state_changed(device_id: DeviceId, delta: StateDelta, new_state: DeviceState) -> Self {
        Self::StateChanged {
            device_id,
            delta,
            new_state,
        }
    }

    /// Creates a write failed event.
    #[must_use]
    pub fn write_failed(
        device_id: DeviceId,
        attribute: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::WriteFailed {
            device_id,
            attribute: attribute.into(),
            error: error.into(),
        }
    }
}

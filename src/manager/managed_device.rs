// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handle to one mirrored device.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::engine::{DeviceCommand, DeviceHandles};
use crate::error::{Error, Result};
use crate::event::DeviceId;
use crate::state::{Attributes, DeviceState, SensorReadings, StateDelta};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};
use crate::types::AttributeValue;

use super::device_config::DeviceConfig;

/// A mirrored BlueAir device.
///
/// Handles are cheap to clone; every clone talks to the same device task.
/// Reads never wait: [`read`](Self::read) returns the state as of the last
/// completed merge. Writes are queued behind any request already pending for
/// the device and resolve in the order they were issued.
///
/// # Examples
///
/// ```no_run
/// use blueair_lib::manager::Device;
///
/// # async fn example(device: Device) -> blueair_lib::Result<()> {
/// println!("{} is in standby: {}", device.name(), device.read().is_standby());
///
/// let delta = device.request_set("nightmode", true).await?;
/// assert_eq!(delta.attribute("fanspeed").and_then(|v| v.as_int()), Some(11));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Device {
    id: DeviceId,
    name: String,
    config: Arc<DeviceConfig>,
    commands: mpsc::UnboundedSender<DeviceCommand>,
    state: watch::Receiver<DeviceState>,
    callbacks: Arc<CallbackRegistry>,
}

impl Device {
    pub(crate) fn new(
        id: DeviceId,
        name: String,
        config: DeviceConfig,
        handles: DeviceHandles,
    ) -> Self {
        Self {
            id,
            name,
            config: Arc::new(config),
            commands: handles.commands,
            state: handles.state,
            callbacks: handles.callbacks,
        }
    }

    /// Returns the device identifier.
    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration the device was created from.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Returns a snapshot of the confirmed state.
    #[must_use]
    pub fn read(&self) -> DeviceState {
        self.state.borrow().clone()
    }

    /// Returns a receiver notified after every merge that changed something.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<DeviceState> {
        self.state.clone()
    }

    /// Merges values into the confirmed state and returns what changed.
    ///
    /// Subscribers are notified only when the returned delta is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if an attribute is unknown or has the wrong
    /// kind, or if `sensor_data` contains `aqi`; nothing is merged then.
    /// Returns [`Error::DeviceStopped`] if the device task is gone.
    pub async fn reconcile(
        &self,
        state: Attributes,
        sensor_data: SensorReadings,
    ) -> Result<StateDelta> {
        let delta = self
            .call(|reply| DeviceCommand::Reconcile {
                state,
                sensor_data,
                reply,
            })
            .await??;
        Ok(delta)
    }

    /// Sets an attribute through the cloud and merges it once confirmed.
    ///
    /// Returns an empty delta, without contacting the cloud, when the value
    /// is already the confirmed one. Polling of this device is suspended
    /// while the write is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if the attribute is unknown or the value has
    /// the wrong kind, or [`Error::Protocol`] if the cloud did not confirm
    /// the write. A failed write leaves the state untouched.
    pub async fn request_set(
        &self,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<StateDelta> {
        let attribute = attribute.into();
        let value = value.into();
        self.call(|reply| DeviceCommand::Write {
            attribute,
            value,
            reply,
        })
        .await?
    }

    pub(crate) fn command_sender(&self) -> mpsc::UnboundedSender<DeviceCommand> {
        self.commands.clone()
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> DeviceCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| Error::DeviceStopped(self.id.clone()))?;
        response
            .await
            .map_err(|_| Error::DeviceStopped(self.id.clone()))
    }
}

impl Subscribable for Device {
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateDelta) + Send + Sync + 'static,
    {
        self.callbacks.on_state_changed(callback)
    }

    fn on_attribute_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, AttributeValue) + Send + Sync + 'static,
    {
        self.callbacks.on_attribute_changed(callback)
    }

    fn on_aqi_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.callbacks.on_aqi_changed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

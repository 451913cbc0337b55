// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Task owning one device's confirmed state.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::error::{Error, ValueError};
use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::protocol::{DeviceStatus, RemoteClient};
use crate::state::{Attributes, DeviceState, SensorReadings, StateDelta};
use crate::subscription::CallbackRegistry;
use crate::types::AttributeValue;

use super::poll_scheduler::{PollControl, PollSuspension};

/// Requests processed by a device task, in FIFO order.
#[derive(Debug)]
pub(crate) enum DeviceCommand {
    /// Merge values into the confirmed state.
    Reconcile {
        state: Attributes,
        sensor_data: SensorReadings,
        reply: oneshot::Sender<Result<StateDelta, ValueError>>,
    },
    /// Write one attribute to the cloud, then merge it once confirmed.
    Write {
        attribute: String,
        value: AttributeValue,
        reply: oneshot::Sender<Result<StateDelta, Error>>,
    },
    /// A poll result, stamped with the instant its fetch began.
    Snapshot {
        status: DeviceStatus,
        fetched_at: Instant,
    },
}

/// The endpoints handed out to [`Device`](crate::manager::Device) handles.
#[derive(Debug)]
pub(crate) struct DeviceHandles {
    pub(crate) commands: mpsc::UnboundedSender<DeviceCommand>,
    pub(crate) state: watch::Receiver<DeviceState>,
    pub(crate) callbacks: Arc<CallbackRegistry>,
}

/// Spawns the task owning `state` and returns the handles to reach it.
///
/// The task ends once every command sender has been dropped and the queue
/// is drained.
pub(crate) fn spawn_device<C: RemoteClient>(
    id: DeviceId,
    state: DeviceState,
    client: Arc<C>,
    events: EventBus,
    scheduler: mpsc::WeakUnboundedSender<PollControl>,
) -> DeviceHandles {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(state.clone());
    let callbacks = Arc::new(CallbackRegistry::new());

    let task = DeviceTask {
        id,
        state,
        client,
        commands: commands_rx,
        published: state_tx,
        callbacks: Arc::clone(&callbacks),
        events,
        scheduler,
        last_write_resolved: None,
    };
    tokio::spawn(task.run());

    DeviceHandles {
        commands: commands_tx,
        state: state_rx,
        callbacks,
    }
}

struct DeviceTask<C> {
    id: DeviceId,
    state: DeviceState,
    client: Arc<C>,
    commands: mpsc::UnboundedReceiver<DeviceCommand>,
    published: watch::Sender<DeviceState>,
    callbacks: Arc<CallbackRegistry>,
    events: EventBus,
    scheduler: mpsc::WeakUnboundedSender<PollControl>,
    /// When the most recent write got its answer, successful or not.
    last_write_resolved: Option<Instant>,
}

impl<C: RemoteClient> DeviceTask<C> {
    async fn run(mut self) {
        tracing::debug!(device_id = %self.id, "Device task started");

        while let Some(command) = self.commands.recv().await {
            match command {
                DeviceCommand::Reconcile {
                    state,
                    sensor_data,
                    reply,
                } => {
                    let result = self.apply(&state, &sensor_data);
                    let _ = reply.send(result);
                }
                DeviceCommand::Write {
                    attribute,
                    value,
                    reply,
                } => {
                    let result = self.write(&attribute, value).await;
                    let _ = reply.send(result);
                }
                DeviceCommand::Snapshot { status, fetched_at } => {
                    self.handle_snapshot(status, fetched_at);
                }
            }
        }

        tracing::debug!(device_id = %self.id, "Device task stopped");
    }

    /// The single mutation path: reconcile, publish, notify.
    fn apply(
        &mut self,
        state: &Attributes,
        sensor_data: &SensorReadings,
    ) -> Result<StateDelta, ValueError> {
        let delta = self.state.reconcile(state, sensor_data)?;
        self.publish(&delta);
        Ok(delta)
    }

    fn publish(&self, delta: &StateDelta) {
        if !delta.is_empty() {
            self.published.send_replace(self.state.clone());
            self.callbacks.dispatch(&delta);
            self.events.publish(DeviceEvent::state_changed(
                self.id.clone(),
                delta.clone(),
                self.state.clone(),
            ));
        }
    }

    async fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<StateDelta, Error> {
        self.state.validate_write(attribute, value)?;

        if self.state.attribute(attribute) == Some(value) {
            tracing::debug!(device_id = %self.id, attribute, value = %value, "Value already set");
            return Ok(StateDelta::default());
        }

        tracing::info!(device_id = %self.id, attribute, value = %value, "Setting state");

        // Polling resumes one interval after the guard drops.
        let _suspension = PollSuspension::new(self.id.clone(), self.scheduler.clone());

        let result = self
            .client
            .write_attribute(&self.id, attribute, value)
            .await;
        self.last_write_resolved = Some(Instant::now());

        match result {
            Ok(()) => {
                let writes = self.state.write_delta(attribute, value);
                let mut delta = self.state.reconcile(&writes, &SensorReadings::new())?;

                // Coupled night-mode values are reported even when unchanged
                delta.state.extend(writes);
                self.publish(&delta);
                Ok(delta)
            }
            Err(e) => {
                tracing::error!(
                    device_id = %self.id,
                    attribute,
                    value = %value,
                    error = %e,
                    "Error setting state"
                );
                self.events.publish(DeviceEvent::write_failed(
                    self.id.clone(),
                    attribute,
                    e.to_string(),
                ));
                Err(e.into())
            }
        }
    }

    fn handle_snapshot(&mut self, mut status: DeviceStatus, fetched_at: Instant) {
        if self
            .last_write_resolved
            .is_some_and(|resolved| fetched_at < resolved)
        {
            tracing::debug!(device_id = %self.id, "Dropping snapshot fetched before the last write");
            return;
        }

        for rejected in self
            .state
            .retain_valid(&mut status.state, &mut status.sensor_data)
        {
            tracing::warn!(device_id = %self.id, error = %rejected, "Ignoring polled value");
        }

        match self.apply(&status.state, &status.sensor_data) {
            Ok(delta) => {
                tracing::debug!(device_id = %self.id, changed = delta.len(), "Reconciled snapshot");
            }
            Err(e) => {
                tracing::warn!(device_id = %self.id, error = %e, "Rejected snapshot");
            }
        }
    }
}

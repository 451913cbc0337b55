// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The task owning the poll timer.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::protocol::{DeviceStatus, RemoteClient};

use super::DeviceCommand;

/// Messages a device task sends to the scheduler about its own polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollControl {
    /// Stop polling the device until it is resumed.
    Suspend(DeviceId),
    /// Poll the device again one interval from now.
    Resume(DeviceId),
}

/// Suspends polling of one device for as long as it lives.
///
/// The scheduler is only referenced weakly so that device tasks never keep
/// it alive.
pub(crate) struct PollSuspension {
    id: DeviceId,
    scheduler: mpsc::WeakUnboundedSender<PollControl>,
}

impl PollSuspension {
    pub(crate) fn new(id: DeviceId, scheduler: mpsc::WeakUnboundedSender<PollControl>) -> Self {
        send(&scheduler, PollControl::Suspend(id.clone()));
        Self { id, scheduler }
    }
}

impl Drop for PollSuspension {
    fn drop(&mut self) {
        send(&self.scheduler, PollControl::Resume(self.id.clone()));
    }
}

fn send(scheduler: &mpsc::WeakUnboundedSender<PollControl>, message: PollControl) {
    if let Some(scheduler) = scheduler.upgrade() {
        let _ = scheduler.send(message);
    }
}

/// Polls every tracked device on a fixed interval, in batches.
///
/// Each device has its own due time, or none while suspended. When the
/// earliest due time passes, every device that is due is fetched in one
/// `fetch_state` call; their next poll is then due one interval after the
/// fetch completed, whether it succeeded or not.
pub(crate) struct PollScheduler<C> {
    client: Arc<C>,
    interval: Duration,
    devices: HashMap<DeviceId, mpsc::UnboundedSender<DeviceCommand>>,
    due: BTreeMap<DeviceId, Option<Instant>>,
    control: mpsc::UnboundedReceiver<PollControl>,
    events: EventBus,
    verbose: bool,
}

impl<C: RemoteClient> PollScheduler<C> {
    /// Creates a scheduler; every device is first due one interval from now.
    pub(crate) fn new(
        client: Arc<C>,
        interval: Duration,
        devices: HashMap<DeviceId, mpsc::UnboundedSender<DeviceCommand>>,
        control: mpsc::UnboundedReceiver<PollControl>,
        events: EventBus,
    ) -> Self {
        let first = Instant::now() + interval;
        let due = devices.keys().map(|id| (id.clone(), Some(first))).collect();

        Self {
            client,
            interval,
            devices,
            due,
            control,
            events,
            verbose: false,
        }
    }

    /// Logs every poll at info level instead of debug.
    pub(crate) fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Runs until every control sender, strong or upgraded, has been dropped.
    pub(crate) async fn run(mut self) {
        tracing::debug!(
            devices = self.devices.len(),
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "Poll scheduler started"
        );

        loop {
            let deadline = self.next_deadline();
            let sleep = sleep_until(deadline.unwrap_or_else(Instant::now));

            tokio::select! {
                message = self.control.recv() => match message {
                    Some(message) => self.handle_control(message),
                    None => break,
                },
                () = sleep, if deadline.is_some() => self.poll_due().await,
            }
        }

        tracing::debug!("Poll scheduler stopped");
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.due.values().flatten().min().copied()
    }

    fn handle_control(&mut self, message: PollControl) {
        match message {
            PollControl::Suspend(id) => {
                if let Some(due) = self.due.get_mut(&id) {
                    tracing::trace!(device_id = %id, "Polling suspended");
                    *due = None;
                }
            }
            PollControl::Resume(id) => {
                if let Some(due) = self.due.get_mut(&id) {
                    tracing::trace!(device_id = %id, "Polling resumed");
                    *due = Some(Instant::now() + self.interval);
                }
            }
        }
    }

    async fn poll_due(&mut self) {
        let now = Instant::now();
        let ids: Vec<DeviceId> = self
            .due
            .iter()
            .filter(|(_, due)| due.is_some_and(|due| due <= now))
            .map(|(id, _)| id.clone())
            .collect();

        if ids.is_empty() {
            return;
        }

        if self.verbose {
            tracing::info!(devices = ?ids, "Polling device states");
        } else {
            tracing::debug!(devices = ids.len(), "Polling device states");
        }
        let fetched_at = Instant::now();
        match self.client.fetch_state(&ids).await {
            Ok(statuses) => self.route(&ids, statuses, fetched_at),
            Err(e) => tracing::warn!(error = %e, "Error polling device states"),
        }

        let next = Instant::now() + self.interval;
        for id in &ids {
            // Suspended devices are rescheduled by their resume
            if let Some(due) = self.due.get_mut(id).filter(|due| due.is_some()) {
                *due = Some(next);
            }
        }
    }

    fn route(&mut self, requested: &[DeviceId], statuses: Vec<DeviceStatus>, fetched_at: Instant) {
        let mut missing: BTreeSet<&DeviceId> = requested.iter().collect();

        for status in statuses {
            missing.remove(&status.id);

            let Some(device) = self.devices.get(&status.id) else {
                tracing::debug!(device_id = %status.id, "Ignoring status of untracked device");
                continue;
            };

            let id = status.id.clone();
            if device
                .send(DeviceCommand::Snapshot { status, fetched_at })
                .is_err()
            {
                tracing::debug!(device_id = %id, "Device task stopped, no longer polling it");
                self.devices.remove(&id);
                self.due.remove(&id);
            }
        }

        for id in missing {
            tracing::warn!(device_id = %id, "Device not found in poll response");
            self.events.publish(DeviceEvent::device_missing(id.clone()));
        }
    }
}

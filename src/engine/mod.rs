// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synchronization between polled state and user writes.
//!
//! Each device is owned by one task that processes its
//! commands one at a time, in arrival order. Poll results and writes both go
//! through that queue, so they never interleave within a device.
//!
//! A single [`PollScheduler`] task owns the poll timer. It keeps a due time
//! per device, fetches every due device in one batch, and routes each
//! snapshot to the owning task. A device suspends its own polling while one
//! of its writes is in flight; other devices keep being polled.
//!
//! Suspension starts when the device task dequeues the write, not when
//! `request_set` is called. A poll sent in between is not lost: its snapshot
//! queues behind the write and is dropped if it was fetched before the write
//! resolved.

mod device_task;
mod poll_scheduler;

pub(crate) use device_task::{DeviceCommand, DeviceHandles, spawn_device};
pub(crate) use poll_scheduler::{PollControl, PollScheduler};

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for device state changes.
//!
//! This module provides a callback-based subscription system for receiving
//! notifications when a device's state changes.
//!
//! # Overview
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`CallbackRegistry`] - Per-device registry that stores and dispatches callbacks
//! - [`Subscribable`] - Trait for types that support callback subscriptions
//!
//! For a registry-wide stream of events, see
//! [`DeviceRegistry::subscribe`](crate::manager::DeviceRegistry::subscribe).

mod callback;
mod subscribable;

pub use callback::{CallbackRegistry, SubscriptionId};
pub use subscribable::Subscribable;

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for device state subscriptions.
//!
//! This module provides the core types for managing subscription callbacks:
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::StateDelta;
use crate::types::AttributeValue;

/// Unique identifier for a subscription.
///
/// This ID is returned when creating a subscription and can be used to
/// unsubscribe later. IDs are unique within a device's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type StateChangedCallback = Arc<dyn Fn(&StateDelta) + Send + Sync>;

type AttributeChangedCallback = Arc<dyn Fn(&str, AttributeValue) + Send + Sync>;

type AqiChangedCallback = Arc<dyn Fn(u16) + Send + Sync>;

/// Registry for managing device subscription callbacks.
///
/// Each device owns one registry. The device task dispatches every non-empty
/// delta to it right after the merge, so callbacks of one device observe
/// changes in merge order.
///
/// # Thread Safety
///
/// The registry uses `parking_lot::RwLock` and can be shared between the
/// device task and any number of handles. Callbacks run on the device task
/// and must not block.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    state_changed_callbacks: RwLock<HashMap<SubscriptionId, StateChangedCallback>>,
    attribute_callbacks: RwLock<HashMap<SubscriptionId, AttributeChangedCallback>>,
    aqi_callbacks: RwLock<HashMap<SubscriptionId, AqiChangedCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state_changed_callbacks: RwLock::new(HashMap::new()),
            attribute_callbacks: RwLock::new(HashMap::new()),
            aqi_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback receiving every non-empty delta.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateDelta) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback called once per changed attribute.
    pub fn on_attribute_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, AttributeValue) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.attribute_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for AQI changes.
    pub fn on_aqi_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.aqi_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state_changed_callbacks.write().remove(&id).is_some()
            || self.attribute_callbacks.write().remove(&id).is_some()
            || self.aqi_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.state_changed_callbacks.write().clear();
        self.attribute_callbacks.write().clear();
        self.aqi_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatches a delta to the registered callbacks.
    ///
    /// Empty deltas are ignored. Callbacks are called synchronously, in
    /// arbitrary order within each kind.
    pub fn dispatch(&self, delta: &StateDelta) {
        if delta.is_empty() {
            return;
        }

        for callback in self.state_changed_callbacks.read().values() {
            callback(delta);
        }

        {
            let callbacks = self.attribute_callbacks.read();
            for (name, value) in &delta.state {
                for callback in callbacks.values() {
                    callback(name, *value);
                }
            }
        }

        if let Some(aqi) = delta.aqi {
            for callback in self.aqi_callbacks.read().values() {
                callback(aqi);
            }
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.state_changed_callbacks.read().len()
            + self.attribute_callbacks.read().len()
            + self.aqi_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that publish state changes.

use crate::state::StateDelta;
use crate::subscription::SubscriptionId;
use crate::types::AttributeValue;

/// Trait for types that support callback subscriptions.
///
/// Implemented by [`Device`](crate::manager::Device). Callbacks are invoked
/// only for merges that changed something.
///
/// # Examples
///
/// ```no_run
/// use blueair_lib::manager::Device;
/// use blueair_lib::subscription::Subscribable;
///
/// fn watch(device: &Device) {
///     let sub_id = device.on_state_changed(|delta| {
///         println!("changed: {:?}", delta.keys().collect::<Vec<_>>());
///     });
///
///     device.on_aqi_changed(|aqi| println!("AQI is now {aqi}"));
///
///     device.unsubscribe(sub_id);
/// }
/// ```
pub trait Subscribable {
    /// Subscribes to every non-empty change delta.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateDelta) + Send + Sync + 'static;

    /// Subscribes to attribute changes.
    ///
    /// The callback receives the attribute name and its new value, once per
    /// changed attribute.
    fn on_attribute_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, AttributeValue) + Send + Sync + 'static;

    /// Subscribes to changes of the derived AQI.
    fn on_aqi_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(u16) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

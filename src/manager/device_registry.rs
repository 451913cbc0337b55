// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of mirrored devices.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::engine::{PollControl, PollScheduler, spawn_device};
use crate::error::{Error, Result};
use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::protocol::RemoteClient;
use crate::state::{DeviceState, StateDelta};
use crate::types::AttributeValue;

use super::device_config::PlatformConfig;
use super::managed_device::Device;

/// The set of devices mirrored from one BlueAir account.
///
/// [`start`](Self::start) logs in, fetches the configured devices once,
/// creates a [`Device`] for every one that exists in the cloud and starts
/// polling them. Cloning the registry is cheap; polling stops once the last
/// clone is dropped.
///
/// # Examples
///
/// ```no_run
/// use blueair_lib::event::DeviceEvent;
/// use blueair_lib::manager::{DeviceConfig, DeviceRegistry, PlatformConfig};
///
/// #[tokio::main]
/// async fn main() -> blueair_lib::Result<()> {
///     let config = PlatformConfig::new("me@example.com", "secret", "account-uuid")
///         .with_device(DeviceConfig::new("device-uuid").with_name("Bedroom"));
///
///     let registry = DeviceRegistry::connect(config).await?;
///
///     let mut events = registry.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             if let DeviceEvent::StateChanged { device_id, delta, .. } = event {
///                 println!("{device_id}: {:?}", delta.keys().collect::<Vec<_>>());
///             }
///         }
///     });
///
///     for device in registry.devices() {
///         device.request_set("standby", false).await?;
///     }
///
///     Ok(())
/// }
/// ```
pub struct DeviceRegistry<C> {
    inner: Arc<RegistryInner<C>>,
}

struct RegistryInner<C> {
    client: Arc<C>,
    config: PlatformConfig,
    devices: BTreeMap<DeviceId, Device>,
    event_bus: EventBus,
    /// Keeps the poll scheduler alive; device tasks only hold weak senders.
    _scheduler: mpsc::UnboundedSender<PollControl>,
}

impl<C> Clone for DeviceRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: RemoteClient> DeviceRegistry<C> {
    /// Starts mirroring the configured devices.
    ///
    /// Configured devices missing from the initial fetch are logged and
    /// skipped. The configured name of a device takes precedence over the
    /// name registered in the cloud.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or if the login or
    /// the initial fetch fails.
    pub async fn start(client: C, config: PlatformConfig) -> Result<Self> {
        Self::start_with_events(client, config, EventBus::new()).await
    }

    /// Starts mirroring the configured devices, publishing to `event_bus`.
    ///
    /// Subscribing to the bus beforehand makes the
    /// [`DeviceAdded`](DeviceEvent::DeviceAdded) events of the initial fetch
    /// observable.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub async fn start_with_events(
        client: C,
        config: PlatformConfig,
        event_bus: EventBus,
    ) -> Result<Self> {
        config.validate()?;

        let client = Arc::new(client);
        client.login().await?;

        let ids = config.device_ids();
        tracing::debug!(devices = ids.len(), "Getting initial device states");
        let statuses = client.fetch_state(&ids).await?;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let mut devices = BTreeMap::new();

        for status in statuses {
            let Some(device_config) = config.device(&status.id) else {
                tracing::error!(device_id = %status.id, "Device configuration not found");
                continue;
            };

            let state = match DeviceState::new(status.state, status.sensor_data) {
                Ok(state) => state,
                Err(e) => {
                    tracing::error!(device_id = %status.id, error = %e, "Invalid initial state");
                    continue;
                }
            };

            let name = if device_config.name.is_empty() {
                status.name
            } else {
                device_config.name.clone()
            };

            let handles = spawn_device(
                status.id.clone(),
                state,
                Arc::clone(&client),
                event_bus.clone(),
                control_tx.downgrade(),
            );

            tracing::info!(device_id = %status.id, name = %name, "Adding device");
            event_bus.publish(DeviceEvent::device_added(status.id.clone(), name.clone()));
            devices.insert(
                status.id.clone(),
                Device::new(status.id, name, device_config.clone(), handles),
            );
        }

        for id in ids.iter().filter(|id| !devices.contains_key(*id)) {
            tracing::warn!(device_id = %id, "Device not found in cloud response");
        }

        let routes: HashMap<_, _> = devices
            .iter()
            .map(|(id, device)| (id.clone(), device.command_sender()))
            .collect();
        let scheduler = PollScheduler::new(
            Arc::clone(&client),
            config.polling_interval(),
            routes,
            control_rx,
            event_bus.clone(),
        )
        .with_verbose(config.verbose_logging);
        tokio::spawn(scheduler.run());

        Ok(Self {
            inner: Arc::new(RegistryInner {
                client,
                config,
                devices,
                event_bus,
                _scheduler: control_tx,
            }),
        })
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Subscribes to events of every device in the registry.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.event_bus.subscribe()
    }

    /// Returns the number of active event subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.event_bus.subscriber_count()
    }

    // =========================================================================
    // Devices
    // =========================================================================

    /// Returns the device with the given identifier.
    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.inner.devices.get(id)
    }

    /// Returns the device with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no such device is mirrored.
    pub fn get(&self, id: &DeviceId) -> Result<&Device> {
        self.device(id)
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))
    }

    /// Iterates over every device, ordered by identifier.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.inner.devices.values()
    }

    /// Returns the identifiers of every device.
    #[must_use]
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.inner.devices.keys().cloned().collect()
    }

    /// Returns the number of mirrored devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.devices.len()
    }

    /// Returns `true` if no device is mirrored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.devices.is_empty()
    }

    /// Returns the confirmed state of a device.
    #[must_use]
    pub fn read(&self, id: &DeviceId) -> Option<DeviceState> {
        self.device(id).map(Device::read)
    }

    /// Sets an attribute of a device, see [`Device::request_set`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] for an unknown device, or any error
    /// of [`Device::request_set`].
    pub async fn request_set(
        &self,
        id: &DeviceId,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<StateDelta> {
        self.get(id)?.request_set(attribute, value).await
    }

    /// Returns the remote client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.inner.client
    }

    /// Returns the configuration the registry was started with.
    #[must_use]
    pub fn config(&self) -> &PlatformConfig {
        &self.inner.config
    }
}

#[cfg(feature = "http")]
impl DeviceRegistry<crate::protocol::BlueAirClient> {
    /// Creates a [`BlueAirClient`](crate::protocol::BlueAirClient) from the
    /// configuration and starts mirroring.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start), or if the HTTP client cannot be built.
    pub async fn connect(config: PlatformConfig) -> Result<Self> {
        let client = config.client_config().into_client()?;
        Self::start(client, config).await
    }
}

impl<C> std::fmt::Debug for DeviceRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.inner.devices)
            .field("event_bus", &self.inner.event_bus)
            .finish_non_exhaustive()
    }
}

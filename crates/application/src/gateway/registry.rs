use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use domain::FleetEvent;
use domain::connection::{ConnectionFactory, GatewayConnection};
use domain::error::ConfigurationError;
use domain::fleet::{self, FleetAggregate, RegistrySnapshot};
use domain::gateway::{DeviceConfig, DeviceStatus, GatewayId};

use super::StatusStore;
use super::poller::{GatewayPoller, PollerContext, PollerSettings};
use crate::stream::{DEFAULT_QUEUE_CAPACITY, StreamHub, SubscriptionHandle};

const SHUTDOWN_REASON: &str = "gateway registry shut down";

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    pub poller: PollerSettings,
    /// Per-subscriber stream queue capacity
    pub queue_capacity: usize,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            poller: PollerSettings::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Owns every configured gateway: one poller task each, the shared status
/// store and the stream hub fed by the pollers.
pub struct GatewayRegistry {
    store: Arc<StatusStore>,
    hub: Arc<StreamHub>,
    pollers: Mutex<Vec<(GatewayId, JoinHandle<Option<Box<dyn GatewayConnection>>>)>>,
    cancel: CancellationToken,
    /// Bound on each connection close during shutdown
    close_timeout: Duration,
}

impl GatewayRegistry {
    /// Validate the configuration, create one connection per gateway and
    /// start polling. Any configuration error aborts before a task is spawned.
    ///
    /// Must be called from within a tokio runtime.
    pub fn initialize(
        configs: Vec<DeviceConfig>,
        factory: Arc<dyn ConnectionFactory>,
        options: RegistryOptions,
    ) -> Result<Self, ConfigurationError> {
        let mut seen = HashSet::new();
        for config in &configs {
            config.validate()?;
            if !seen.insert(config.id.clone()) {
                return Err(ConfigurationError::DuplicateGatewayId(config.id.to_string()));
            }
        }

        let configs: Vec<Arc<DeviceConfig>> = configs.into_iter().map(Arc::new).collect();
        let mut connections = Vec::with_capacity(configs.len());
        for config in &configs {
            connections.push(factory.create(config)?);
        }

        let store = Arc::new(StatusStore::new(configs.iter().cloned()));
        let hub = Arc::new(StreamHub::new(
            options.queue_capacity,
            fleet::compute(&store.snapshot()),
        ));
        let cancel = CancellationToken::new();
        let ctx = PollerContext {
            store: store.clone(),
            hub: hub.clone(),
            factory,
            settings: options.poller.clone(),
        };

        let mut pollers = Vec::with_capacity(configs.len());
        for (config, connection) in configs.into_iter().zip(connections) {
            let id = config.id.clone();
            let poller =
                GatewayPoller::new(config, Some(connection), ctx.clone(), cancel.child_token());
            pollers.push((id, tokio::spawn(poller.run())));
        }

        if pollers.is_empty() {
            warn!("No gateways configured");
        } else {
            info!(count = pollers.len(), "Gateway registry started");
        }

        Ok(Self {
            store,
            hub,
            pollers: Mutex::new(pollers),
            cancel,
            close_timeout: options.poller.request_timeout,
        })
    }

    /// Latest status of one gateway
    pub fn get(&self, id: &str) -> Option<Arc<DeviceStatus>> {
        self.store.get(id)
    }

    /// Latest status of every gateway, in configuration order
    pub fn get_all(&self) -> RegistrySnapshot {
        self.store.snapshot()
    }

    /// Atomically swap one gateway's status. Pollers commit through this path;
    /// anything else calling it races with the owning poller.
    pub fn replace(&self, status: DeviceStatus) -> Arc<DeviceStatus> {
        self.store.replace(status)
    }

    /// Fleet aggregate over the current statuses
    pub fn aggregate(&self) -> FleetAggregate {
        fleet::compute(&self.store.snapshot())
    }

    pub fn ids(&self) -> &[GatewayId] {
        self.store.ids()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn hub(&self) -> &Arc<StreamHub> {
        &self.hub
    }

    pub fn subscribe(&self) -> (SubscriptionHandle, mpsc::Receiver<FleetEvent>) {
        self.hub.subscribe()
    }

    /// Stop every poller, close their connections and publish the fleet as
    /// offline. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let pollers: Vec<_> = self.pollers.lock().await.drain(..).collect();
        if pollers.is_empty() {
            return;
        }
        info!(count = pollers.len(), "Stopping gateway pollers");

        for (id, handle) in pollers {
            match handle.await {
                Ok(Some(mut connection)) => {
                    let closed = tokio::time::timeout(self.close_timeout, connection.close()).await;
                    match closed {
                        Ok(()) => info!(
                            gateway_id = %id,
                            backend = connection.backend(),
                            "Connection closed"
                        ),
                        Err(_) => warn!(
                            gateway_id = %id,
                            timeout_ms = %self.close_timeout.as_millis(),
                            "Connection close timed out, dropping it"
                        ),
                    }
                }
                Ok(None) => {}
                Err(e) => error!(gateway_id = %id, error = %e, "Poller task failed"),
            }
        }

        self.store.mark_all_offline(SHUTDOWN_REASON);
        self.hub.publish_aggregate(self.aggregate());
        info!("Gateway registry shut down");
    }
}

impl Drop for GatewayRegistry {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

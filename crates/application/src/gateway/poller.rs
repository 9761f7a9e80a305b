use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior, error::Elapsed};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use domain::connection::{ConnectionFactory, ConnectionState, GatewayConnection};
use domain::error::{ConfigurationError, ConnectionError, FetchError, PartialFetchError};
use domain::fleet;
use domain::gateway::{DeviceConfig, DeviceStatus, Snapshot};

use super::StatusStore;
use crate::stream::StreamHub;

/// Timing knobs shared by all pollers
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Upper bound for every single external call
    pub request_timeout: Duration,
    /// Maximum random delay before the first poll, capped by the poll interval
    pub startup_jitter: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            startup_jitter: Duration::from_secs(2),
        }
    }
}

/// Shared collaborators handed to every poller
#[derive(Clone)]
pub struct PollerContext {
    pub store: Arc<StatusStore>,
    pub hub: Arc<StreamHub>,
    pub factory: Arc<dyn ConnectionFactory>,
    pub settings: PollerSettings,
}

#[derive(Debug, Error)]
enum CycleError {
    #[error(transparent)]
    Create(#[from] ConfigurationError),

    #[error(transparent)]
    Connect(#[from] ConnectionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl CycleError {
    fn is_fatal(&self) -> bool {
        match self {
            Self::Create(_) | Self::Connect(_) => true,
            Self::Fetch(e) => e.is_fatal(),
        }
    }
}

/// Poll loop of a single gateway. Owns the gateway's connection exclusively.
///
/// Each cycle either commits an online status built from the required read
/// plus whichever optional reads succeeded, or an offline status with no data.
pub struct GatewayPoller {
    config: Arc<DeviceConfig>,
    connection: Option<Box<dyn GatewayConnection>>,
    state: ConnectionState,
    ctx: PollerContext,
    cancel: CancellationToken,
}

impl GatewayPoller {
    pub fn new(
        config: Arc<DeviceConfig>,
        connection: Option<Box<dyn GatewayConnection>>,
        ctx: PollerContext,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            connection,
            state: ConnectionState::Disconnected,
            ctx,
            cancel,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    /// Poll on a fixed interval until cancelled. Returns the open connection,
    /// if any, so that the owner can close it.
    pub async fn run(mut self) -> Option<Box<dyn GatewayConnection>> {
        let interval = self.config.poll_interval();
        let delay = self.startup_delay(interval);

        info!(
            gateway_id = %self.config.id,
            interval_ms = %interval.as_millis(),
            jitter_ms = %delay.as_millis(),
            "Starting poller"
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + delay, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if self.poll_once().await.is_none() {
                break;
            }
        }

        info!(gateway_id = %self.config.id, "Poller stopped");
        self.connection.take()
    }

    /// Run one full cycle and commit its result.
    ///
    /// Returns `None` when cancelled mid-cycle; nothing is committed then.
    pub async fn poll_once(&mut self) -> Option<Arc<DeviceStatus>> {
        let mut connection = match self.connection.take() {
            Some(connection) => connection,
            None => match self.ctx.factory.create(&self.config) {
                Ok(connection) => connection,
                Err(e) => return Some(self.commit_failure(CycleError::Create(e))),
            },
        };

        match self.run_cycle(connection.as_mut()).await {
            None => {
                self.connection = Some(connection);
                None
            }
            Some(Ok(snapshot)) => {
                self.connection = Some(connection);
                let status = DeviceStatus::online(self.config.clone(), snapshot, Utc::now());
                debug!(gateway_id = %self.config.id, "Committed snapshot");
                Some(self.commit(status))
            }
            Some(Err(error)) => {
                if error.is_fatal() {
                    self.close(connection).await;
                    self.transition(self.state.to_failed());
                } else {
                    self.connection = Some(connection);
                }
                Some(self.commit_failure(error))
            }
        }
    }

    async fn run_cycle(
        &mut self,
        connection: &mut dyn GatewayConnection,
    ) -> Option<Result<Snapshot, CycleError>> {
        if self.state.needs_connect() {
            if let Err(e) = self.connect(connection).await? {
                return Some(Err(e.into()));
            }
        }

        let aggregates = match self.guarded(connection.fetch_required()).await? {
            Ok(Ok(flow)) => flow,
            Ok(Err(e)) => return Some(Err(e.into())),
            Err(_) => {
                let timeout_ms = self.timeout_ms();
                return Some(Err(FetchError::Timeout { timeout_ms }.into()));
            }
        };

        let mut snapshot = Snapshot::new(aggregates);
        snapshot.vitals = self.optional("vitals", connection.fetch_vitals()).await?;
        snapshot.strings = self.optional("strings", connection.fetch_strings()).await?;
        snapshot.alerts = self.optional("alerts", connection.fetch_alerts()).await?;
        snapshot.temperatures = self
            .optional("temperatures", connection.fetch_temperatures())
            .await?;
        snapshot.system_status = self
            .optional("system_status", connection.fetch_system_status())
            .await?;

        Some(Ok(snapshot))
    }

    async fn connect(
        &mut self,
        connection: &mut dyn GatewayConnection,
    ) -> Option<Result<(), ConnectionError>> {
        let connecting = match self.state.to_connecting() {
            Ok(state) => state,
            Err(reason) => return Some(Err(ConnectionError::Network(reason.to_string()))),
        };
        self.transition(connecting);
        let result = match self.guarded(connection.connect()).await {
            Some(result) => result,
            None => {
                self.transition(self.state.to_disconnected());
                return None;
            }
        };

        match result {
            Ok(Ok(())) => {
                match self.state.to_connected() {
                    Ok(connected) => self.transition(connected),
                    Err(reason) => {
                        return Some(Err(ConnectionError::Network(reason.to_string())));
                    }
                }
                info!(gateway_id = %self.config.id, backend = connection.backend(), "Connected");
                Some(Ok(()))
            }
            Ok(Err(e)) => {
                self.transition(self.state.to_failed());
                Some(Err(e))
            }
            Err(_) => {
                self.transition(self.state.to_failed());
                Some(Err(ConnectionError::Timeout {
                    timeout_ms: self.timeout_ms(),
                }))
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(
                gateway_id = %self.config.id,
                from = ?self.state,
                to = ?next,
                "Connection state changed"
            );
            self.state = next;
        }
    }

    /// Close a session, giving up after the request timeout.
    async fn close(&self, mut connection: Box<dyn GatewayConnection>) {
        info!(gateway_id = %self.config.id, backend = connection.backend(), "Closing connection");
        let timeout = self.ctx.settings.request_timeout;
        if tokio::time::timeout(timeout, connection.close()).await.is_err() {
            warn!(
                gateway_id = %self.config.id,
                timeout_ms = self.timeout_ms(),
                "Connection close timed out, dropping it"
            );
        }
    }

    /// Optional read: any failure only leaves the field empty.
    async fn optional<T>(
        &self,
        field: &'static str,
        read: impl Future<Output = Result<T, PartialFetchError>>,
    ) -> Option<Option<T>> {
        match self.guarded(read).await? {
            Ok(Ok(value)) => Some(Some(value)),
            Ok(Err(e)) => {
                debug!(gateway_id = %self.config.id, field, error = %e, "Optional read failed");
                Some(None)
            }
            Err(_) => {
                debug!(gateway_id = %self.config.id, field, "Optional read timed out");
                Some(None)
            }
        }
    }

    /// Run one external call under the request timeout, honouring
    /// cancellation before, during, and right after it. `None` = cancelled.
    async fn guarded<F: Future>(&self, call: F) -> Option<Result<F::Output, Elapsed>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            result = tokio::time::timeout(self.ctx.settings.request_timeout, call) => result,
        };
        if self.cancel.is_cancelled() {
            return None;
        }
        Some(result)
    }

    fn commit_failure(&self, error: CycleError) -> Arc<DeviceStatus> {
        warn!(gateway_id = %self.config.id, error = %error, "Poll failed, marking offline");
        let previous = self
            .ctx
            .store
            .get(self.config.id.as_str())
            .unwrap_or_else(|| Arc::new(DeviceStatus::initial(self.config.clone())));
        self.commit(DeviceStatus::offline(&previous, error.to_string()))
    }

    fn commit(&self, status: DeviceStatus) -> Arc<DeviceStatus> {
        let committed = self.ctx.store.replace(status);
        let store = &self.ctx.store;
        self.ctx
            .hub
            .publish_commit(committed.clone(), || fleet::compute(&store.snapshot()));
        committed
    }

    fn startup_delay(&self, interval: Duration) -> Duration {
        let max = self.ctx.settings.startup_jitter.min(interval);
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.ctx.settings.request_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

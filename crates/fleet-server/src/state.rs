use std::sync::Arc;
use std::time::Duration;

use application::GatewayRegistry;
use tokio_util::sync::CancellationToken;

/// Shared by every handler
pub struct AppState {
    pub registry: Arc<GatewayRegistry>,
    /// Interval between SSE keep-alive comments
    pub keep_alive: Duration,
    /// Cancelled when the server begins shutting down; ends open streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(registry: Arc<GatewayRegistry>, keep_alive: Duration) -> Self {
        Self {
            registry,
            keep_alive,
            shutdown: CancellationToken::new(),
        }
    }
}

pub mod api;
pub mod error;
pub mod legacy;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use application::{GatewayRegistry, RegistryOptions};
use application::gateway::PollerSettings;
use domain::error::ConfigurationError;
use infrastructure::{DriverFactory, ServerConfig};
use state::AppState;

/// Registry options derived from the loaded configuration
pub fn registry_options(config: &ServerConfig) -> RegistryOptions {
    RegistryOptions {
        poller: PollerSettings {
            request_timeout: config.polling.request_timeout(),
            startup_jitter: config.polling.startup_jitter(),
        },
        queue_capacity: config.stream.queue_capacity,
    }
}

/// Validate the configured gateways and start polling them.
pub fn start_registry(config: &ServerConfig) -> Result<Arc<GatewayRegistry>, ConfigurationError> {
    let registry = GatewayRegistry::initialize(
        config.gateways.clone(),
        Arc::new(DriverFactory::new()),
        registry_options(config),
    )?;
    Ok(Arc::new(registry))
}

pub fn setup_app_state(registry: Arc<GatewayRegistry>, keep_alive: Duration) -> Arc<AppState> {
    Arc::new(AppState::new(registry, keep_alive))
}

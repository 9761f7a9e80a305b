use super::GatewayConnection;
use crate::error::ConfigurationError;
use crate::gateway::DeviceConfig;

/// Builds the connection adapter for a gateway from its transport settings.
///
/// Creation must not perform I/O; sessions are opened by `connect()`.
pub trait ConnectionFactory: Send + Sync {
    fn create(&self, config: &DeviceConfig)
    -> Result<Box<dyn GatewayConnection>, ConfigurationError>;
}

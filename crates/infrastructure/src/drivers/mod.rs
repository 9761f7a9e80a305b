mod simulator;

pub use simulator::{OPTIONAL_READS, SimulatorConfig, SimulatorConnection};

use domain::connection::{ConnectionFactory, GatewayConnection};
use domain::error::ConfigurationError;
use domain::gateway::{DeviceConfig, TransportKind};
use tracing::debug;

/// Creates the connection backend matching a gateway's transport kind.
///
/// Only the simulator ships with this build; the networked protocols are
/// rejected at startup.
#[derive(Debug, Default, Clone, Copy)]
pub struct DriverFactory;

impl DriverFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ConnectionFactory for DriverFactory {
    fn create(
        &self,
        config: &DeviceConfig,
    ) -> Result<Box<dyn GatewayConnection>, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidTransport {
            gateway_id: config.id.to_string(),
            reason,
        };

        match config.transport.kind {
            TransportKind::Simulator => {
                let params = serde_json::Value::Object(config.transport.params.clone());
                let sim_config: SimulatorConfig = serde_json::from_value(params)
                    .map_err(|e| invalid(format!("Invalid simulator config: {}", e)))?;
                sim_config.validate().map_err(invalid)?;
                debug!(gateway_id = %config.id, "Creating simulator connection");
                Ok(Box::new(SimulatorConnection::new(sim_config)) as Box<dyn GatewayConnection>)
            }
            kind @ (TransportKind::Local | TransportKind::Cloud | TransportKind::FleetApi) => {
                Err(invalid(format!(
                    "transport '{}' is not available in this build",
                    kind.as_str()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::gateway::{GatewayId, TransportConfig};
    use serde_json::json;
    use std::time::Duration;

    fn device(transport: TransportConfig) -> DeviceConfig {
        DeviceConfig::new(
            GatewayId::new("sim-1").unwrap(),
            "Sim",
            transport,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_create_simulator_with_defaults() {
        let driver = DriverFactory::new()
            .create(&device(TransportConfig::new(TransportKind::Simulator)))
            .unwrap();
        assert_eq!(driver.backend(), "simulator");
    }

    #[test]
    fn test_create_simulator_with_params() {
        let transport = TransportConfig::new(TransportKind::Simulator)
            .with_param("capacity_wh", json!(27000))
            .with_param("fail_optional", json!(["vitals"]))
            .with_param("latency_ms", json!(20));

        assert!(DriverFactory::new().create(&device(transport)).is_ok());
    }

    #[test]
    fn test_invalid_simulator_config() {
        let transport =
            TransportConfig::new(TransportKind::Simulator).with_param("capacity_wh", json!("big"));

        let err = DriverFactory::new().create(&device(transport)).err().unwrap();
        assert!(matches!(err, ConfigurationError::InvalidTransport { .. }));
    }

    #[test]
    fn test_unknown_simulator_param_is_rejected() {
        let transport =
            TransportConfig::new(TransportKind::Simulator).with_param("colour", json!("blue"));

        assert!(DriverFactory::new().create(&device(transport)).is_err());
    }

    #[test]
    fn test_network_transports_unavailable() {
        for kind in [TransportKind::Local, TransportKind::Cloud, TransportKind::FleetApi] {
            let err = DriverFactory::new()
                .create(&device(TransportConfig::new(kind)))
                .err()
                .unwrap();
            assert!(err.to_string().contains(kind.as_str()));
        }
    }
}

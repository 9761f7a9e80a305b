use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::GatewayId;
use crate::error::ConfigurationError;

/// Backend family used to reach a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Locally-signed binary protocol on the LAN
    Local,
    /// Vendor cloud session
    Cloud,
    /// OAuth-based fleet protocol
    FleetApi,
    /// Synthetic gateway, no network
    Simulator,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
            Self::FleetApi => "fleet_api",
            Self::Simulator => "simulator",
        }
    }
}

/// Transport selection: the backend kind plus its backend-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub kind: TransportKind,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl TransportConfig {
    pub fn new(kind: TransportKind) -> Self {
        Self {
            kind,
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

fn default_poll_interval_ms() -> u64 {
    5000
}

/// Static description of one monitored gateway. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: GatewayId,
    #[serde(default)]
    pub name: String,
    pub transport: TransportConfig,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl DeviceConfig {
    pub fn new(
        id: GatewayId,
        name: impl Into<String>,
        transport: TransportConfig,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            transport,
            poll_interval_ms: u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Display name, falling back to the id when none was configured.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigurationError::InvalidPollInterval(
                self.id.to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_config_from_json() {
        let config: DeviceConfig = serde_json::from_value(json!({
            "id": "garage",
            "name": "Garage Powerwall",
            "transport": { "kind": "local", "host": "10.0.0.5", "password": "secret" },
            "poll_interval_ms": 2000
        }))
        .unwrap();

        assert_eq!(config.id.as_str(), "garage");
        assert_eq!(config.transport.kind, TransportKind::Local);
        assert_eq!(config.transport.params["host"], json!("10.0.0.5"));
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_defaults() {
        let config: DeviceConfig = serde_json::from_value(json!({
            "id": "cabin",
            "transport": { "kind": "simulator" }
        }))
        .unwrap();

        assert_eq!(config.display_name(), "cabin");
        assert_eq!(config.poll_interval_ms, 5000);
        assert!(config.transport.params.is_empty());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = DeviceConfig::new(
            GatewayId::new("x").unwrap(),
            "",
            TransportConfig::new(TransportKind::Simulator),
            Duration::ZERO,
        );
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::InvalidPollInterval("x".into()))
        );
    }

    #[test]
    fn test_transport_kind_names() {
        assert_eq!(TransportKind::FleetApi.as_str(), "fleet_api");
        let kind: TransportKind = serde_json::from_value(json!("cloud")).unwrap();
        assert_eq!(kind, TransportKind::Cloud);
    }
}

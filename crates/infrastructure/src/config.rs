use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use domain::gateway::DeviceConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8675
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PollingConfig {
    /// Bound on every single gateway request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Upper bound of the random delay before a gateway's first poll
    #[serde(default = "default_startup_jitter_ms")]
    pub startup_jitter_ms: u64,
}

impl PollingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn startup_jitter(&self) -> Duration {
        Duration::from_millis(self.startup_jitter_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            startup_jitter_ms: default_startup_jitter_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    5000
}
fn default_startup_jitter_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StreamConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl StreamConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

fn default_queue_capacity() -> usize {
    16
}
fn default_keep_alive_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub gateways: Vec<DeviceConfig>,
}

impl ServerConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::load_with_run_mode(config_dir, &run_mode)
    }

    pub fn load_with_run_mode(config_dir: &str, run_mode: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Base settings, required so we never start with an empty fleet by accident
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            // Per-environment overlay, e.g. config/production.toml
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. FLEET__SERVER__PORT=9000)
            .add_source(Environment::with_prefix("FLEET").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::gateway::TransportKind;
    use std::path::PathBuf;

    fn config_dir(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("fleet-config-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for (file, contents) in files {
            std::fs::write(dir.join(file), contents).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_applies_defaults() {
        let dir = config_dir(
            "defaults",
            &[(
                "default.toml",
                r#"
                [[gateways]]
                id = "home"
                transport = { kind = "simulator" }
                "#,
            )],
        );

        let config = ServerConfig::load_with_run_mode(dir.to_str().unwrap(), "test").unwrap();

        assert_eq!(config.server, HttpConfig::default());
        assert_eq!(config.polling.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.stream.queue_capacity, 16);
        assert_eq!(config.gateways.len(), 1);
        let gateway = &config.gateways[0];
        assert_eq!(gateway.id.as_str(), "home");
        assert_eq!(gateway.display_name(), "home");
        assert_eq!(gateway.transport.kind, TransportKind::Simulator);
        assert_eq!(gateway.poll_interval(), Duration::from_millis(5000));
    }

    #[test]
    fn test_run_mode_overlay_wins() {
        let dir = config_dir(
            "overlay",
            &[
                (
                    "default.toml",
                    r#"
                    [server]
                    port = 8675

                    [[gateways]]
                    id = "cabin"
                    name = "Cabin"
                    poll_interval_ms = 10000
                    transport = { kind = "simulator", capacity_wh = 27000, fail_optional = ["alerts"] }
                    "#,
                ),
                ("staging.toml", "[server]\nport = 9001\n"),
            ],
        );

        let config = ServerConfig::load_with_run_mode(dir.to_str().unwrap(), "staging").unwrap();

        assert_eq!(config.server.port, 9001);
        let gateway = &config.gateways[0];
        assert_eq!(gateway.display_name(), "Cabin");
        assert_eq!(gateway.poll_interval_ms, 10000);
        assert!(gateway.transport.params.contains_key("capacity_wh"));
        assert!(gateway.transport.params.contains_key("fail_optional"));
    }

    #[test]
    fn test_missing_default_file_is_an_error() {
        let dir = config_dir("missing", &[]);
        assert!(ServerConfig::load_with_run_mode(dir.to_str().unwrap(), "test").is_err());
    }

    #[test]
    fn test_invalid_gateway_id_is_rejected() {
        let dir = config_dir(
            "invalid-id",
            &[(
                "default.toml",
                r#"
                [[gateways]]
                id = "has space"
                transport = { kind = "simulator" }
                "#,
            )],
        );

        assert!(ServerConfig::load_with_run_mode(dir.to_str().unwrap(), "test").is_err());
    }
}

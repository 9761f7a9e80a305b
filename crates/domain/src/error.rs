use thiserror::Error;

/// Startup errors. Any of these aborts registry initialization.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Invalid gateway ID: {0}")]
    InvalidGatewayId(String),

    #[error("Duplicate gateway ID: {0}")]
    DuplicateGatewayId(String),

    #[error("Invalid poll interval for gateway {0}: must be greater than zero")]
    InvalidPollInterval(String),

    #[error("Invalid transport configuration for gateway {gateway_id}: {reason}")]
    InvalidTransport { gateway_id: String, reason: String },
}

/// Session establishment failures (authentication, network).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection attempt timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Failure of the required power-flow read. Takes the device offline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Not connected: {0}")]
    NotConnected(#[from] ConnectionError),
}

impl FetchError {
    /// Whether the session must be torn down and re-created next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::SessionExpired(_) | Self::NotConnected(_)
        )
    }
}

/// Failure of one optional enrichment read. Only nulls that field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartialFetchError {
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Not supported by this gateway")]
    Unsupported,

    #[error("Read failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_fetch_errors() {
        assert!(FetchError::SessionExpired("token".into()).is_fatal());
        assert!(FetchError::Transport("reset".into()).is_fatal());
        assert!(
            FetchError::NotConnected(ConnectionError::Network("refused".into())).is_fatal()
        );
        assert!(!FetchError::Timeout { timeout_ms: 500 }.is_fatal());
        assert!(!FetchError::Malformed("bad json".into()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = FetchError::Timeout { timeout_ms: 5000 };
        assert_eq!(err.to_string(), "Request timed out after 5000ms");

        let err = ConfigurationError::DuplicateGatewayId("home".into());
        assert_eq!(err.to_string(), "Duplicate gateway ID: home");
    }
}

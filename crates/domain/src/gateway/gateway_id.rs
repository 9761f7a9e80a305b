use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

const MAX_LEN: usize = 64;

/// Stable identifier of a monitored gateway.
///
/// Rules:
/// - Must be non-empty
/// - ASCII alphanumeric, underscore, and hyphen only (it is used as a URL path segment)
/// - Max length 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GatewayId(String);

impl GatewayId {
    /// Create a new GatewayId with validation
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigurationError> {
        let id = id.into();

        if id.is_empty() {
            return Err(ConfigurationError::InvalidGatewayId(
                "Gateway ID cannot be empty".to_string(),
            ));
        }

        if id.len() > MAX_LEN {
            return Err(ConfigurationError::InvalidGatewayId(format!(
                "Gateway ID too long: {} chars (max {MAX_LEN})",
                id.len()
            )));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigurationError::InvalidGatewayId(format!(
                "Gateway ID {id} must contain only alphanumeric, underscore, and hyphen"
            )));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GatewayId {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GatewayId> for String {
    fn from(id: GatewayId) -> Self {
        id.0
    }
}

impl std::borrow::Borrow<str> for GatewayId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GatewayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

use serde::{Deserialize, Serialize};

/// Session state of a poller's connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No session; the next cycle will open one
    #[default]
    Disconnected,
    /// `connect()` in progress
    Connecting,
    /// Session established and usable
    Connected,
    /// Last attempt failed; the session is closed and retried next cycle
    Failed,
}

impl ConnectionState {
    /// Whether a cycle has to (re)establish the session before reading
    pub fn needs_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn to_connecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::Disconnected | Self::Failed => Ok(Self::Connecting),
            _ => Err("Can only connect from Disconnected or Failed state"),
        }
    }

    pub fn to_connected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting => Ok(Self::Connected),
            _ => Err("Can only complete connection from Connecting state"),
        }
    }

    pub fn to_failed(&self) -> Self {
        Self::Failed
    }

    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }
}

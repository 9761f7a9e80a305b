use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer, ser::SerializeStruct};

use super::{DeviceConfig, GatewayId, PowerFlow, Snapshot};

/// Latest published state of one gateway.
///
/// Always replaced wholesale, never mutated in place once published. The
/// constructors uphold `online == false => snapshot == None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatus {
    #[serde(rename = "gateway", serialize_with = "serialize_config")]
    pub config: Arc<DeviceConfig>,
    pub online: bool,
    pub snapshot: Option<Snapshot>,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub consecutive_failures: u32,
}

impl DeviceStatus {
    /// Status of a gateway that has not been polled yet
    pub fn initial(config: Arc<DeviceConfig>) -> Self {
        Self {
            config,
            online: false,
            snapshot: None,
            last_updated: None,
            error: None,
            consecutive_failures: 0,
        }
    }

    /// Result of a successful poll
    pub fn online(config: Arc<DeviceConfig>, snapshot: Snapshot, at: DateTime<Utc>) -> Self {
        Self {
            config,
            online: true,
            snapshot: Some(snapshot),
            last_updated: Some(at),
            error: None,
            consecutive_failures: 0,
        }
    }

    /// Offline successor of `previous`. No data survives; `last_updated`
    /// keeps the time of the last successful poll.
    pub fn offline(previous: &DeviceStatus, error: impl Into<String>) -> Self {
        Self {
            config: previous.config.clone(),
            online: false,
            snapshot: None,
            last_updated: previous.last_updated,
            error: Some(error.into()),
            consecutive_failures: previous.consecutive_failures.saturating_add(1),
        }
    }

    pub fn id(&self) -> &GatewayId {
        &self.config.id
    }

    /// Power flow that counts towards fleet figures: only an online gateway
    /// with a snapshot has one.
    pub fn current_flow(&self) -> Option<&PowerFlow> {
        self.snapshot
            .as_ref()
            .filter(|_| self.online)
            .map(|snapshot| &snapshot.aggregates)
    }
}

fn serialize_config<S: Serializer>(
    config: &Arc<DeviceConfig>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    // Transport parameters may hold credentials; only the kind is exposed.
    let mut state = serializer.serialize_struct("Gateway", 4)?;
    state.serialize_field("id", &config.id)?;
    state.serialize_field("name", config.display_name())?;
    state.serialize_field("transport", &config.transport.kind)?;
    state.serialize_field("poll_interval_ms", &config.poll_interval_ms)?;
    state.end()
}

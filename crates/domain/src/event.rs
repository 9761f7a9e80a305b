use std::sync::Arc;

use serde::Serialize;

use crate::fleet::FleetAggregate;
use crate::gateway::DeviceStatus;

/// Message pushed to stream subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum FleetEvent {
    /// Fleet aggregate recomputed after a poll commit
    AggregateUpdated(Arc<FleetAggregate>),
    /// One gateway's status was replaced
    GatewayUpdated(Arc<DeviceStatus>),
}

impl FleetEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AggregateUpdated(_) => "aggregate",
            Self::GatewayUpdated(_) => "gateway",
        }
    }

    pub fn as_aggregate(&self) -> Option<&FleetAggregate> {
        match self {
            Self::AggregateUpdated(aggregate) => Some(aggregate),
            Self::GatewayUpdated(_) => None,
        }
    }
}

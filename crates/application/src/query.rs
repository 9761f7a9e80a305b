//! Read-side lookups used by the HTTP layer.

use std::sync::Arc;

use thiserror::Error;

use domain::fleet::FleetAggregate;
use domain::gateway::DeviceStatus;

use crate::gateway::GatewayRegistry;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("No gateways configured")]
    NoGateways,

    #[error("Unknown gateway: {0}")]
    UnknownGateway(String),
}

impl GatewayRegistry {
    /// Status of the given gateway
    pub fn status(&self, id: &str) -> Result<Arc<DeviceStatus>, QueryError> {
        if self.is_empty() {
            return Err(QueryError::NoGateways);
        }
        self.get(id)
            .ok_or_else(|| QueryError::UnknownGateway(id.to_string()))
    }

    /// Status of the first configured gateway
    pub fn default_status(&self) -> Result<Arc<DeviceStatus>, QueryError> {
        let id = self.ids().first().ok_or(QueryError::NoGateways)?;
        self.status(id.as_str())
    }

    /// Explicit gateway when one is named, the default gateway otherwise.
    pub fn resolve(&self, id: Option<&str>) -> Result<Arc<DeviceStatus>, QueryError> {
        match id {
            Some(id) => self.status(id),
            None => self.default_status(),
        }
    }

    pub fn fleet_aggregate(&self) -> Result<FleetAggregate, QueryError> {
        if self.is_empty() {
            return Err(QueryError::NoGateways);
        }
        Ok(self.aggregate())
    }
}

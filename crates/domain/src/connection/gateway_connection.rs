use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{ConnectionError, FetchError, PartialFetchError};
use crate::gateway::{PowerFlow, StringReading, SystemStatus};

/// Authenticated read access to one gateway, whatever the backend.
///
/// The required read and the optional enrichment reads carry distinct error
/// types: a `FetchError` takes the device offline, a `PartialFetchError` only
/// nulls the matching snapshot field.
#[async_trait]
pub trait GatewayConnection: Send + Sync {
    /// Establish or validate the session
    async fn connect(&mut self) -> Result<(), ConnectionError>;

    /// Mandatory power-flow reading
    async fn fetch_required(&mut self) -> Result<PowerFlow, FetchError>;

    async fn fetch_vitals(&mut self) -> Result<serde_json::Value, PartialFetchError>;

    async fn fetch_strings(
        &mut self,
    ) -> Result<BTreeMap<String, StringReading>, PartialFetchError>;

    async fn fetch_alerts(&mut self) -> Result<Vec<String>, PartialFetchError>;

    async fn fetch_temperatures(&mut self) -> Result<BTreeMap<String, f64>, PartialFetchError>;

    async fn fetch_system_status(&mut self) -> Result<SystemStatus, PartialFetchError>;

    /// Release transport resources. Must be idempotent.
    async fn close(&mut self);

    /// Backend identifier, for logging only
    fn backend(&self) -> &str;
}

//! Domain layer - gateway telemetry model, fleet aggregation, and the
//! connection capability every backend implements.
//!
//! Principles:
//! - No runtime or transport dependencies
//! - Invariants enforced by constructors, not by callers
//! - Pure functions where possible (aggregation, legacy views)

pub mod connection;
pub mod error;
pub mod event;
pub mod fleet;
pub mod gateway;

pub use connection::{ConnectionFactory, ConnectionState, GatewayConnection};
pub use error::{ConfigurationError, ConnectionError, FetchError, PartialFetchError};
pub use event::FleetEvent;
pub use fleet::{FleetAggregate, RegistrySnapshot};
pub use gateway::{DeviceConfig, DeviceStatus, GatewayId, PowerFlow, Snapshot};

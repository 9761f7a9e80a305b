mod config;
mod gateway_id;
mod snapshot;
mod status;

pub use config::{DeviceConfig, TransportConfig, TransportKind};
pub use gateway_id::GatewayId;
pub use snapshot::{GridStatus, PowerFlow, Snapshot, StringReading, SystemStatus};
pub use status::DeviceStatus;

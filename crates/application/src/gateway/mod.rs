pub mod poller;
pub mod registry;
mod store;

pub use poller::{GatewayPoller, PollerContext, PollerSettings};
pub use registry::{GatewayRegistry, RegistryOptions};
pub use store::StatusStore;

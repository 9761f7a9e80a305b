mod aggregate;
pub mod legacy;

pub use aggregate::{FleetAggregate, FleetPower, FleetSoe, RegistrySnapshot, compute};

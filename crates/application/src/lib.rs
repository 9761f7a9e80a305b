//! Application layer - gateway polling, status cache and update streaming

pub mod gateway;
pub mod query;
pub mod stream;

pub use gateway::{GatewayRegistry, RegistryOptions};
pub use query::QueryError;
pub use stream::{StreamHub, SubscriptionHandle};

//! Infrastructure layer - configuration loading and gateway connection backends

pub mod config;
pub mod drivers;

pub use config::ServerConfig;
pub use drivers::DriverFactory;

mod connection_state;
mod factory;
mod gateway_connection;

pub use connection_state::ConnectionState;
pub use factory::ConnectionFactory;
pub use gateway_connection::GatewayConnection;

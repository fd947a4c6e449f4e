pub mod connection;

pub use connection::{Gateway, GatewayConfig, GatewayError, connect};

pub mod config;
pub mod database_error;
pub mod driven;
pub mod driver;

pub use config::{ConfigError, DatabaseConfig, PaymentGatewayKind, ServerConfig};

//! Outnet Domain Layer
pub mod address_family;
pub mod config;
pub mod errors;
pub mod query_outcome;

pub use address_family::AddressFamily;
pub use config::{CliOverrides, Config, ConfigError, LoggingConfig, OutgoingConfig, UpstreamConfig};
pub use errors::DomainError;
pub use query_outcome::QueryOutcome;

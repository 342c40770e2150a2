pub mod errors;
pub mod logging;
pub mod outgoing;
pub mod root;
pub mod upstream;

pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use outgoing::OutgoingConfig;
pub use root::{CliOverrides, Config, MAX_QUERY_TIMEOUT};
pub use upstream::UpstreamConfig;

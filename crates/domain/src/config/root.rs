use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::outgoing::OutgoingConfig;
use super::upstream::UpstreamConfig;

const LOCAL_CONFIG_PATH: &str = "outnet.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/outnet/config.toml";

/// Upper bound on `outgoing.query_timeout`, in seconds.
pub const MAX_QUERY_TIMEOUT: u64 = 3600;

/// Main configuration structure for outnet
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Outgoing port pool and query defaults
    #[serde(default)]
    pub outgoing: OutgoingConfig,

    /// Upstream servers used by the query command
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. outnet.toml in current directory
    /// 3. /etc/outnet/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if let Some(found) = Self::get_config_path() {
            Self::from_file(&found)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    /// Load configuration from a specific file
    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply command-line overrides to configuration
    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(num_ports) = overrides.num_ports {
            self.outgoing.num_ports = num_ports;
        }
        if let Some(port_base) = overrides.port_base {
            self.outgoing.port_base = Some(port_base);
        }
        if let Some(timeout) = overrides.query_timeout {
            self.outgoing.query_timeout = timeout;
        }
        if !overrides.servers.is_empty() {
            self.upstream.servers = overrides.servers;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let outgoing = &self.outgoing;

        if !outgoing.do_ip4 && !outgoing.do_ip6 {
            return Err(ConfigError::Validation(
                "At least one of do_ip4 / do_ip6 must be enabled".to_string(),
            ));
        }

        if outgoing.num_ports == 0 {
            return Err(ConfigError::Validation(
                "num_ports must be at least 1".to_string(),
            ));
        }

        if outgoing.buffer_size < 512 {
            return Err(ConfigError::Validation(format!(
                "buffer_size {} is below the 512 byte DNS minimum",
                outgoing.buffer_size
            )));
        }

        if outgoing.query_timeout == 0 {
            return Err(ConfigError::Validation(
                "query_timeout must be at least 1 second".to_string(),
            ));
        }

        if outgoing.query_timeout > MAX_QUERY_TIMEOUT {
            return Err(ConfigError::Validation(format!(
                "query_timeout {} exceeds the {} second maximum",
                outgoing.query_timeout, MAX_QUERY_TIMEOUT
            )));
        }

        for interface in &outgoing.interfaces {
            if interface.parse::<IpAddr>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "Interface '{}' is not an IP address literal",
                    interface
                )));
            }
        }

        if let Err(bad) = self.upstream.socket_addrs() {
            return Err(ConfigError::Validation(format!(
                "Upstream server '{}' is not an ip:port literal",
                bad
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, toml_string).map_err(|e| ConfigError::FileWrite {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        if std::path::Path::new(LOCAL_CONFIG_PATH).exists() {
            Some(LOCAL_CONFIG_PATH.to_string())
        } else if std::path::Path::new(SYSTEM_CONFIG_PATH).exists() {
            Some(SYSTEM_CONFIG_PATH.to_string())
        } else {
            None
        }
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub num_ports: Option<usize>,
    pub port_base: Option<u16>,
    pub query_timeout: Option<u64>,
    pub servers: Vec<String>,
}

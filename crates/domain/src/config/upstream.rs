use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Servers queried by the `query` command when none is given on the
    /// command line, as `ip:port` literals.
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
        }
    }
}

impl UpstreamConfig {
    /// Parses every configured server; the first malformed entry is
    /// returned as the error.
    pub fn socket_addrs(&self) -> Result<Vec<SocketAddr>, String> {
        self.servers
            .iter()
            .map(|s| s.parse::<SocketAddr>().map_err(|_| s.clone()))
            .collect()
    }
}

fn default_servers() -> Vec<String> {
    vec!["9.9.9.9:53".to_string()]
}

use crate::address_family::AddressFamily;
use serde::{Deserialize, Serialize};

/// Settings of the outgoing query engine: the port pool it opens at
/// startup and the defaults used for every query it sends.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutgoingConfig {
    /// Number of UDP ports opened per interface and family.
    #[serde(default = "default_num_ports")]
    pub num_ports: usize,

    /// Literal IPv4/IPv6 addresses to bind outgoing ports on. Empty means
    /// the wildcard address of every enabled family.
    #[serde(default)]
    pub interfaces: Vec<String>,

    #[serde(default = "default_true")]
    pub do_ip4: bool,

    #[serde(default = "default_true")]
    pub do_ip6: bool,

    /// First port of a fixed range per interface. Absent means every socket
    /// is bound to an OS-chosen port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_base: Option<u16>,

    /// Size of the receive buffer shared by every outgoing socket.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Seconds to wait for a reply.
    #[serde(default = "default_query_timeout")]
    pub query_timeout: u64,
}

impl Default for OutgoingConfig {
    fn default() -> Self {
        Self {
            num_ports: default_num_ports(),
            interfaces: Vec::new(),
            do_ip4: true,
            do_ip6: true,
            port_base: None,
            buffer_size: default_buffer_size(),
            query_timeout: default_query_timeout(),
        }
    }
}

impl OutgoingConfig {
    pub fn family_enabled(&self, family: AddressFamily) -> bool {
        match family {
            AddressFamily::Inet => self.do_ip4,
            AddressFamily::Inet6 => self.do_ip6,
        }
    }

    /// Number of sockets the port pool must open for `family`.
    ///
    /// Without interfaces every enabled family gets `num_ports`; with
    /// interfaces, `num_ports` is added once per interface of that family.
    pub fn target_ports(&self, family: AddressFamily) -> usize {
        if !self.family_enabled(family) {
            return 0;
        }
        if self.interfaces.is_empty() {
            return self.num_ports;
        }
        self.interfaces
            .iter()
            .filter(|ifname| AddressFamily::of_interface(ifname) == family)
            .count()
            * self.num_ports
    }
}

fn default_num_ports() -> usize {
    16
}

fn default_buffer_size() -> usize {
    65552
}

fn default_query_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

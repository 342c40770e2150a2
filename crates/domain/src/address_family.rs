use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Address family of an outgoing socket or a peer address.
///
/// Variants are declared in the numeric order of the platform family
/// constants so that the derived `Ord` matches comparing `AF_INET` with
/// `AF_INET6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl AddressFamily {
    pub fn of(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => Self::Inet,
            SocketAddr::V6(_) => Self::Inet6,
        }
    }

    /// Classifies an interface string the way the outgoing configuration
    /// does: anything containing a colon is an IPv6 literal.
    pub fn of_interface(interface: &str) -> Self {
        if interface.contains(':') {
            Self::Inet6
        } else {
            Self::Inet
        }
    }

    /// Size of the platform socket address record for this family
    /// (`sockaddr_in` / `sockaddr_in6`).
    pub fn record_len(self) -> usize {
        match self {
            Self::Inet => 16,
            Self::Inet6 => 28,
        }
    }

    pub fn unspecified(self) -> IpAddr {
        match self {
            Self::Inet => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Self::Inet6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    pub fn matches(self, ip: &IpAddr) -> bool {
        matches!(
            (self, ip),
            (Self::Inet, IpAddr::V4(_)) | (Self::Inet6, IpAddr::V6(_))
        )
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inet => write!(f, "ip4"),
            Self::Inet6 => write!(f, "ip6"),
        }
    }
}

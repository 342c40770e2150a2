//! Pool of pre-bound outgoing UDP sockets, one array per address family.
//!
//! Every socket is opened at startup; the pool never changes afterwards.
//! Queries pick one of the sockets of their destination's family at random,
//! so a forged reply has to guess the source port as well as the ID.

use super::resolve::InterfaceResolver;
use crate::reactor::{Reactor, SocketId};
use outnet_domain::{AddressFamily, DomainError, OutgoingConfig};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
pub struct PortPool {
    udp4: Vec<SocketId>,
    udp6: Vec<SocketId>,
}

impl PortPool {
    /// Opens `num_ports` sockets per interface and enabled family.
    ///
    /// Individual bind failures are skipped. Construction fails, closing
    /// whatever was opened, when any family ends up short of its target.
    pub fn open<R: Reactor + ?Sized>(
        reactor: &mut R,
        resolver: &dyn InterfaceResolver,
        config: &OutgoingConfig,
    ) -> Result<Self, DomainError> {
        let mut pool = Self {
            udp4: Vec::with_capacity(config.target_ports(AddressFamily::Inet)),
            udp6: Vec::with_capacity(config.target_ports(AddressFamily::Inet6)),
        };

        if config.interfaces.is_empty() {
            // IPv6 first, in case IPv4 cannot be opened afterwards.
            for family in [AddressFamily::Inet6, AddressFamily::Inet] {
                if config.family_enabled(family) {
                    let opened = make_udp_range(
                        reactor,
                        resolver,
                        None,
                        config.num_ports,
                        family,
                        config.port_base,
                    );
                    pool.sockets_mut(family).extend(opened);
                }
            }
        } else {
            for interface in &config.interfaces {
                let family = AddressFamily::of_interface(interface);
                if !config.family_enabled(family) {
                    continue;
                }
                let opened = make_udp_range(
                    reactor,
                    resolver,
                    Some(interface),
                    config.num_ports,
                    family,
                    config.port_base,
                );
                pool.sockets_mut(family).extend(opened);
            }
        }

        for family in [AddressFamily::Inet6, AddressFamily::Inet] {
            let wanted = config.target_ports(family);
            let opened = pool.count(family);
            if opened != wanted {
                error!(
                    family = %family,
                    opened,
                    wanted,
                    interfaces = config.interfaces.len(),
                    "Could not open all outgoing ports"
                );
                pool.close(reactor);
                return Err(DomainError::PortsUnavailable {
                    family,
                    opened,
                    wanted,
                });
            }
        }

        info!(
            ip4 = pool.udp4.len(),
            ip6 = pool.udp6.len(),
            "Outgoing port pool ready"
        );
        Ok(pool)
    }

    pub fn count(&self, family: AddressFamily) -> usize {
        self.sockets(family).len()
    }

    pub fn get(&self, family: AddressFamily, index: usize) -> Option<SocketId> {
        self.sockets(family).get(index).copied()
    }

    pub fn sockets(&self, family: AddressFamily) -> &[SocketId] {
        match family {
            AddressFamily::Inet => &self.udp4,
            AddressFamily::Inet6 => &self.udp6,
        }
    }

    pub fn contains(&self, socket: SocketId) -> bool {
        self.udp4.contains(&socket) || self.udp6.contains(&socket)
    }

    pub fn is_empty(&self) -> bool {
        self.udp4.is_empty() && self.udp6.is_empty()
    }

    /// Closes every socket through the reactor and leaves the pool empty.
    pub fn close<R: Reactor + ?Sized>(&mut self, reactor: &mut R) {
        for socket in self.udp4.drain(..).chain(self.udp6.drain(..)) {
            reactor.close_udp(socket);
        }
    }

    fn sockets_mut(&mut self, family: AddressFamily) -> &mut Vec<SocketId> {
        match family {
            AddressFamily::Inet => &mut self.udp4,
            AddressFamily::Inet6 => &mut self.udp6,
        }
    }
}

/// Tries `num_ports` binds on one interface and returns the sockets that
/// opened. With a base port every attempt uses the next port, whether the
/// previous attempt succeeded or not, so the covered range stays fixed.
fn make_udp_range<R: Reactor + ?Sized>(
    reactor: &mut R,
    resolver: &dyn InterfaceResolver,
    interface: Option<&str>,
    num_ports: usize,
    family: AddressFamily,
    port_base: Option<u16>,
) -> Vec<SocketId> {
    let mut opened = Vec::with_capacity(num_ports);
    let ifname = interface.unwrap_or("default");

    for attempt in 0..num_ports {
        let port = match port_base {
            None => None,
            Some(base) => match u16::try_from(usize::from(base) + attempt) {
                Ok(port) => Some(port),
                Err(_) => {
                    warn!(interface = ifname, base, attempt, "Port range runs past 65535");
                    continue;
                }
            },
        };

        let bind = match resolver.resolve(interface, family, port) {
            Ok(bind) => bind,
            Err(e) => {
                warn!(interface = ifname, port = ?port, error = %e, "Cannot resolve outgoing interface");
                continue;
            }
        };

        match reactor.open_udp(bind) {
            Ok(socket) => {
                debug!(interface = ifname, socket = %socket, bind = %bind, "Bound outgoing port");
                opened.push(socket);
            }
            Err(e) => {
                warn!(interface = ifname, bind = %bind, error = %e, "Cannot bind outgoing port");
            }
        }
    }

    opened
}

use outnet_domain::AddressFamily;
use std::io;
use std::net::{IpAddr, SocketAddr};

/// Turns an outgoing interface setting into a bind address.
pub trait InterfaceResolver {
    /// `interface` is `None` for "any address of this family"; `port` is
    /// `None` to let the operating system pick one.
    fn resolve(
        &self,
        interface: Option<&str>,
        family: AddressFamily,
        port: Option<u16>,
    ) -> io::Result<SocketAddr>;
}

/// Passive, numeric-host-only resolution: interface names are never looked
/// up, only IP literals are accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumericHostResolver;

impl InterfaceResolver for NumericHostResolver {
    fn resolve(
        &self,
        interface: Option<&str>,
        family: AddressFamily,
        port: Option<u16>,
    ) -> io::Result<SocketAddr> {
        let ip = match interface {
            None => family.unspecified(),
            Some(literal) => literal.parse::<IpAddr>().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("'{}' is not a numeric host address", literal),
                )
            })?,
        };

        if !family.matches(&ip) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("address {} is not of family {}", ip, family),
            ));
        }

        Ok(SocketAddr::new(ip, port.unwrap_or(0)))
    }
}

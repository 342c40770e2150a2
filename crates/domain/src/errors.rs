use crate::address_family::AddressFamily;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Could not open all outgoing {family} ports: opened {opened} of {wanted}")]
    PortsUnavailable {
        family: AddressFamily,
        opened: usize,
        wanted: usize,
    },

    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("Failed to encode DNS message: {0}")]
    MessageEncoding(String),

    #[error("Invalid DNS response: {0}")]
    InvalidResponse(String),
}

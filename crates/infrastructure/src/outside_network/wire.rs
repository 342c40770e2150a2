//! The only bytes of a DNS message this engine touches: the 16-bit
//! transaction ID at offset 0 (RFC 1035 §4.1.1).

pub const ID_LEN: usize = 2;

#[inline]
pub fn read_id(packet: &[u8]) -> Option<u16> {
    match packet {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

#[inline]
pub fn set_id(packet: &mut [u8], id: u16) {
    if let Some(header) = packet.get_mut(..ID_LEN) {
        header.copy_from_slice(&id.to_be_bytes());
    }
}

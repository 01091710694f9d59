//! Nonce-based acknowledgement.
//!
//! Reliable and ping datagrams carry a two-byte nonce right after the tag. The
//! receiver answers with an acknowledgement echoing that nonce. The echo is
//! stateless: nothing records which nonces were actually sent, so any nonce a
//! peer presents is acknowledged and there is no retransmission of our own
//! reliable sends.

use crate::buffer::require_len;
use crate::error::Result;
use crate::wire::{TAG_ACKNOWLEDGEMENT, TAG_PING, TAG_RELIABLE};

/// Minimum length of a datagram carrying a nonce: tag + 2 bytes.
pub const NONCE_DATAGRAM_LEN: usize = 3;

/// Trailing byte of an acknowledgement: every earlier datagram received.
pub const ACK_MASK_ALL: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; 2]);

impl Nonce {
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Nonce(bytes)
    }

    pub fn from_value(value: u16) -> Self {
        Nonce(value.to_le_bytes())
    }

    /// Reads the nonce at bytes 1–2 of a reliable, ping or hello datagram.
    pub fn from_datagram(datagram: &[u8]) -> Result<Self> {
        require_len(datagram, NONCE_DATAGRAM_LEN)?;
        Ok(Nonce([datagram[1], datagram[2]]))
    }

    pub fn bytes(self) -> [u8; 2] {
        self.0
    }

    pub fn value(self) -> u16 {
        u16::from_le_bytes(self.0)
    }
}

pub fn encode_ack(nonce: Nonce) -> Vec<u8> {
    let [n0, n1] = nonce.bytes();
    vec![TAG_ACKNOWLEDGEMENT, n0, n1, ACK_MASK_ALL]
}

pub fn encode_ping(nonce: Nonce) -> Vec<u8> {
    let [n0, n1] = nonce.bytes();
    vec![TAG_PING, n0, n1]
}

/// Frames nested messages as a reliable datagram.
pub fn encode_reliable(nonce: Nonce, messages: &[u8]) -> Vec<u8> {
    let [n0, n1] = nonce.bytes();
    let mut out = Vec::with_capacity(NONCE_DATAGRAM_LEN + messages.len());
    out.extend_from_slice(&[TAG_RELIABLE, n0, n1]);
    out.extend_from_slice(messages);
    out
}

/// Builds the acknowledgement for `datagram`, or an empty reply when it is
/// too short to carry a nonce.
pub fn build_ack(datagram: &[u8]) -> Vec<u8> {
    match Nonce::from_datagram(datagram) {
        Ok(nonce) => encode_ack(nonce),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_echoes_nonce() {
        let reply = build_ack(&[TAG_PING, 0x05, 0x00]);
        assert_eq!(reply, vec![TAG_ACKNOWLEDGEMENT, 0x05, 0x00, ACK_MASK_ALL]);
        assert_eq!(Nonce::from_datagram(&reply).unwrap().value(), 5);
    }

    #[test]
    fn test_ack_for_every_nonce() {
        for value in [0u16, 1, 0x00ff, 0xff00, 0x1234, u16::MAX] {
            let nonce = Nonce::from_value(value);
            let datagram = encode_reliable(nonce, &[0xde, 0xad]);
            let reply = build_ack(&datagram);
            assert_eq!(&reply[1..3], &nonce.bytes());
        }
    }

    #[test]
    fn test_short_datagrams_get_no_ack() {
        assert!(build_ack(&[]).is_empty());
        assert!(build_ack(&[TAG_RELIABLE]).is_empty());
        assert!(build_ack(&[TAG_RELIABLE, 0x01]).is_empty());
    }

    #[test]
    fn test_nonce_is_little_endian() {
        let nonce = Nonce::from_bytes([0x34, 0x12]);
        assert_eq!(nonce.value(), 0x1234);
        assert_eq!(Nonce::from_value(0x1234), nonce);
    }

    #[test]
    fn test_encode_ping() {
        assert_eq!(encode_ping(Nonce::from_value(5)), vec![TAG_PING, 0x05, 0x00]);
    }
}

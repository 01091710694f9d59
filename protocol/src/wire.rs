//! Datagram kinds, keyed by the first byte of every datagram.

use std::fmt;

pub const TAG_HELLO: u8 = 0x00;
pub const TAG_ACKNOWLEDGEMENT: u8 = 0x01;
pub const TAG_PING: u8 = 0x02;
pub const TAG_RELIABLE: u8 = 0x03;
pub const TAG_UNRELIABLE: u8 = 0x04;
pub const TAG_FRAGMENT: u8 = 0x05;
pub const TAG_DISCONNECT: u8 = 0x09;

/// Closed set of datagram kinds understood by the server.
///
/// `Unknown` covers every tag byte not listed above. Datagrams classified as
/// `Unknown` are dropped before any decoding happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Hello,
    Acknowledgement,
    Ping,
    Reliable,
    Unreliable,
    Fragment,
    Disconnect,
    Unknown,
}

impl WireType {
    pub fn classify(first_byte: u8) -> Self {
        match first_byte {
            TAG_HELLO => WireType::Hello,
            TAG_ACKNOWLEDGEMENT => WireType::Acknowledgement,
            TAG_PING => WireType::Ping,
            TAG_RELIABLE => WireType::Reliable,
            TAG_UNRELIABLE => WireType::Unreliable,
            TAG_FRAGMENT => WireType::Fragment,
            TAG_DISCONNECT => WireType::Disconnect,
            _ => WireType::Unknown,
        }
    }

    /// Classifies a whole datagram; empty input is `Unknown`.
    pub fn of(datagram: &[u8]) -> Self {
        datagram
            .first()
            .map_or(WireType::Unknown, |&b| Self::classify(b))
    }

    pub fn tag(self) -> Option<u8> {
        match self {
            WireType::Hello => Some(TAG_HELLO),
            WireType::Acknowledgement => Some(TAG_ACKNOWLEDGEMENT),
            WireType::Ping => Some(TAG_PING),
            WireType::Reliable => Some(TAG_RELIABLE),
            WireType::Unreliable => Some(TAG_UNRELIABLE),
            WireType::Fragment => Some(TAG_FRAGMENT),
            WireType::Disconnect => Some(TAG_DISCONNECT),
            WireType::Unknown => None,
        }
    }

    /// Bytes in front of the nested messages for this kind of datagram.
    pub fn header_len(self) -> Option<usize> {
        match self {
            WireType::Reliable => Some(3),
            WireType::Unreliable => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Hello => "hello",
            WireType::Acknowledgement => "ack",
            WireType::Ping => "ping",
            WireType::Reliable => "reliable",
            WireType::Unreliable => "unreliable",
            WireType::Fragment => "fragment",
            WireType::Disconnect => "disconnect",
            WireType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

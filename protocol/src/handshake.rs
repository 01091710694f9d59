//! Hello handshake.
//!
//! Hello layout:
//!
//! ```text
//! 0      tag (0x00)
//! 1..3   nonce
//! 3      hazel version
//! 4..8   client version, i32 little-endian
//! 8      name length
//! 9..    name, UTF-8
//! ```
//!
//! A hello is accepted by acknowledging its nonce. A client whose version the
//! server does not accept is sent a disconnect carrying a reason code instead.

use crate::ack::{encode_ack, Nonce};
use crate::buffer::{read_i32_le, require_len};
use crate::error::{ProtocolError, Result};
use crate::wire::{TAG_DISCONNECT, TAG_HELLO};
use log::debug;

pub const HELLO_MIN_LEN: usize = 9;

/// Player names longer than this cannot be length-prefixed with one byte.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Disconnect flag meaning "a reason message follows".
const DISCONNECT_HAS_REASON: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DisconnectReason {
    ExitGame = 0,
    GameFull = 1,
    GameStarted = 2,
    GameNotFound = 3,
    IncorrectVersion = 5,
    Banned = 6,
    Kicked = 7,
    Custom = 8,
    ServerError = 14,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub nonce: Nonce,
    pub hazel_version: u8,
    pub client_version: i32,
    pub name: String,
}

impl Hello {
    pub fn decode(datagram: &[u8]) -> Result<Self> {
        require_len(datagram, HELLO_MIN_LEN)?;
        if datagram[0] != TAG_HELLO {
            return Err(ProtocolError::UnexpectedTag(datagram[0]));
        }

        let nonce = Nonce::from_datagram(datagram)?;
        let hazel_version = datagram[3];
        let client_version = read_i32_le(datagram, 4).ok_or(ProtocolError::TooShort {
            needed: 8,
            actual: datagram.len(),
        })?;

        let name_len = datagram[8] as usize;
        let name_bytes = datagram
            .get(HELLO_MIN_LEN..HELLO_MIN_LEN + name_len)
            .ok_or(ProtocolError::Truncated {
                declared: name_len,
                available: datagram.len() - HELLO_MIN_LEN,
            })?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| ProtocolError::InvalidUtf8)?
            .to_string();

        Ok(Hello {
            nonce,
            hazel_version,
            client_version,
            name,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let name = self.name.as_bytes();
        if name.len() > MAX_NAME_LEN {
            return Err(ProtocolError::FieldTooLong {
                len: name.len(),
                max: MAX_NAME_LEN,
            });
        }

        let [n0, n1] = self.nonce.bytes();
        let mut out = Vec::with_capacity(HELLO_MIN_LEN + name.len());
        out.extend_from_slice(&[TAG_HELLO, n0, n1, self.hazel_version]);
        out.extend_from_slice(&self.client_version.to_le_bytes());
        out.push(name.len() as u8);
        out.extend_from_slice(name);
        Ok(out)
    }
}

/// Which client versions may complete the handshake.
#[derive(Debug, Clone, Default)]
pub struct HandshakePolicy {
    /// Empty accepts every version.
    pub accepted_versions: Vec<i32>,
}

impl HandshakePolicy {
    pub fn accepts(&self, client_version: i32) -> bool {
        self.accepted_versions.is_empty() || self.accepted_versions.contains(&client_version)
    }
}

pub fn encode_disconnect(reason: DisconnectReason) -> Vec<u8> {
    // flag, 1-byte message (length 0x0001 LE, message tag 0), reason
    vec![
        TAG_DISCONNECT,
        DISCONNECT_HAS_REASON,
        0x01,
        0x00,
        0x00,
        reason as u8,
    ]
}

/// Decodes a hello and builds the reply: an acknowledgement of the hello's
/// nonce, a disconnect for rejected versions, or nothing for malformed input.
pub fn decode_hello(datagram: &[u8], policy: &HandshakePolicy) -> Vec<u8> {
    let hello = match Hello::decode(datagram) {
        Ok(hello) => hello,
        Err(e) => {
            debug!("Ignoring malformed hello: {}", e);
            return Vec::new();
        }
    };

    if !policy.accepts(hello.client_version) {
        debug!(
            "Rejecting {} with unsupported client version {}",
            hello.name, hello.client_version
        );
        return encode_disconnect(DisconnectReason::IncorrectVersion);
    }

    debug!(
        "Hello from {} (hazel {}, client {})",
        hello.name, hello.hazel_version, hello.client_version
    );
    encode_ack(hello.nonce)
}

//! Fragment datagrams.
//!
//! How the game client actually splits large messages has not been confirmed,
//! so fragment handling sits behind [`FragmentStage`]. The default stage
//! accepts and discards every fragment. [`FragmentAssembler`] is an opt-in
//! reassembly stage using this layout:
//!
//! ```text
//! 0      tag (0x05)
//! 1..3   fragment id, u16 little-endian
//! 3      part index (0-based)
//! 4      part count
//! 5..    payload
//! ```
//!
//! Parts are buffered per (peer, fragment id). When every part has arrived the
//! payloads are joined in index order and handed back to the caller, which
//! decodes the result as nested messages.

use crate::buffer::{read_u16_le, require_len};
use crate::error::{ProtocolError, Result};
use crate::wire::TAG_FRAGMENT;
use log::debug;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub const FRAGMENT_HEADER_LEN: usize = 5;

/// Upper bound on parts per message, so a forged count cannot reserve
/// unbounded memory.
pub const MAX_FRAGMENT_PARTS: u8 = 64;

pub const DEFAULT_FRAGMENT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_PENDING_SETS: usize = 256;

/// A stage that consumes fragment datagrams and may yield a complete message
/// body.
pub trait FragmentStage: Send {
    fn handle_fragment(
        &mut self,
        peer: SocketAddr,
        datagram: &[u8],
        now: Instant,
    ) -> Option<Vec<u8>>;
}

/// Accepts fragments without buffering them.
#[derive(Debug, Default)]
pub struct DiscardFragments;

impl FragmentStage for DiscardFragments {
    fn handle_fragment(
        &mut self,
        peer: SocketAddr,
        datagram: &[u8],
        _now: Instant,
    ) -> Option<Vec<u8>> {
        debug!("Discarding {}-byte fragment from {}", datagram.len(), peer);
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    pub id: u16,
    pub index: u8,
    pub count: u8,
}

impl FragmentHeader {
    pub fn decode(datagram: &[u8]) -> Result<Self> {
        require_len(datagram, FRAGMENT_HEADER_LEN)?;
        if datagram[0] != TAG_FRAGMENT {
            return Err(ProtocolError::UnexpectedTag(datagram[0]));
        }

        let id = read_u16_le(datagram, 1).unwrap_or_default();
        let index = datagram[3];
        let count = datagram[4];
        if count == 0 || count > MAX_FRAGMENT_PARTS || index >= count {
            return Err(ProtocolError::LengthMismatch {
                expected: count as usize,
                actual: index as usize,
            });
        }

        Ok(FragmentHeader { id, index, count })
    }

    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let [id0, id1] = self.id.to_le_bytes();
        let mut out = Vec::with_capacity(FRAGMENT_HEADER_LEN + payload.len());
        out.extend_from_slice(&[TAG_FRAGMENT, id0, id1, self.index, self.count]);
        out.extend_from_slice(payload);
        out
    }
}

struct PendingSet {
    parts: Vec<Option<Vec<u8>>>,
    received: usize,
    started: Instant,
}

impl PendingSet {
    fn new(count: u8, now: Instant) -> Self {
        Self {
            parts: vec![None; count as usize],
            received: 0,
            started: now,
        }
    }

    fn is_complete(&self) -> bool {
        self.received == self.parts.len()
    }

    fn join(self) -> Vec<u8> {
        self.parts.into_iter().flatten().flatten().collect()
    }
}

/// Reassembles fragment sets keyed by peer and fragment id.
pub struct FragmentAssembler {
    pending: HashMap<(SocketAddr, u16), PendingSet>,
    timeout: Duration,
    max_pending: usize,
}

impl Default for FragmentAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_FRAGMENT_TIMEOUT, DEFAULT_MAX_PENDING_SETS)
    }
}

impl FragmentAssembler {
    pub fn new(timeout: Duration, max_pending: usize) -> Self {
        Self {
            pending: HashMap::new(),
            timeout,
            max_pending,
        }
    }

    pub fn pending_sets(&self) -> usize {
        self.pending.len()
    }

    /// Drops sets that have been waiting longer than the timeout.
    pub fn expire(&mut self, now: Instant) -> usize {
        let timeout = self.timeout;
        let before = self.pending.len();
        self.pending
            .retain(|_, set| now.saturating_duration_since(set.started) <= timeout);
        before - self.pending.len()
    }

    pub fn accept(
        &mut self,
        peer: SocketAddr,
        datagram: &[u8],
        now: Instant,
    ) -> Result<Option<Vec<u8>>> {
        let expired = self.expire(now);
        if expired > 0 {
            debug!("Expired {} incomplete fragment sets", expired);
        }

        let header = FragmentHeader::decode(datagram)?;
        let payload = &datagram[FRAGMENT_HEADER_LEN..];
        let key = (peer, header.id);

        if !self.pending.contains_key(&key) && self.pending.len() >= self.max_pending {
            debug!("Fragment buffer full, dropping new set {} from {}", header.id, peer);
            return Ok(None);
        }

        let set = self
            .pending
            .entry(key)
            .or_insert_with(|| PendingSet::new(header.count, now));

        if set.parts.len() != header.count as usize {
            return Err(ProtocolError::LengthMismatch {
                expected: set.parts.len(),
                actual: header.count as usize,
            });
        }

        let slot = &mut set.parts[header.index as usize];
        if slot.is_none() {
            *slot = Some(payload.to_vec());
            set.received += 1;
        }

        if !set.is_complete() {
            return Ok(None);
        }

        Ok(self.pending.remove(&key).map(PendingSet::join))
    }
}

impl FragmentStage for FragmentAssembler {
    fn handle_fragment(
        &mut self,
        peer: SocketAddr,
        datagram: &[u8],
        now: Instant,
    ) -> Option<Vec<u8>> {
        match self.accept(peer, datagram, now) {
            Ok(message) => message,
            Err(e) => {
                debug!("Ignoring fragment from {}: {}", peer, e);
                None
            }
        }
    }
}

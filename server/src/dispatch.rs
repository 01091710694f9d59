//! Routing of received datagrams to the protocol codecs.
//!
//! The dispatcher is synchronous and never touches the socket: it turns one
//! received datagram into the ordered list of datagrams to send back.

use crate::config::ServerConfig;
use log::debug;
use protocol::buffer::hex;
use protocol::wire::TAG_UNRELIABLE;
use protocol::{
    build_ack, concat, decode_hello, handle_payload, DiscardFragments, FragmentAssembler,
    FragmentStage, HandshakePolicy, ListingSource, WireType,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// One received datagram, borrowed from the receive buffer for a single cycle.
#[derive(Debug, Clone, Copy)]
pub struct Datagram<'a> {
    pub peer: SocketAddr,
    pub payload: &'a [u8],
}

impl<'a> Datagram<'a> {
    pub fn new(peer: SocketAddr, payload: &'a [u8]) -> Self {
        Self { peer, payload }
    }
}

/// What to send back for one datagram, in send order. Never holds empty buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub wire_type: WireType,
    pub replies: Vec<Vec<u8>>,
}

impl Outcome {
    fn new(wire_type: WireType, replies: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            wire_type,
            replies: replies.into_iter().filter(|r| !r.is_empty()).collect(),
        }
    }

    fn none(wire_type: WireType) -> Self {
        Self::new(wire_type, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }
}

pub struct Dispatcher {
    handshake: HandshakePolicy,
    fragments: Box<dyn FragmentStage>,
    listings: Arc<dyn ListingSource>,
}

impl Dispatcher {
    pub fn new(
        handshake: HandshakePolicy,
        fragments: Box<dyn FragmentStage>,
        listings: Arc<dyn ListingSource>,
    ) -> Self {
        Self {
            handshake,
            fragments,
            listings,
        }
    }

    pub fn from_config(config: &ServerConfig, listings: Arc<dyn ListingSource>) -> Self {
        let fragments: Box<dyn FragmentStage> = if config.reassemble_fragments {
            Box::new(FragmentAssembler::new(
                config.fragment_timeout(),
                config.max_pending_fragment_sets,
            ))
        } else {
            Box::new(DiscardFragments)
        };

        let handshake = HandshakePolicy {
            accepted_versions: config.accepted_client_versions.clone(),
        };

        Self::new(handshake, fragments, listings)
    }

    pub fn dispatch(&mut self, datagram: Datagram<'_>, now: Instant) -> Outcome {
        let payload = datagram.payload;
        let wire_type = WireType::of(payload);

        match wire_type {
            WireType::Unknown => {
                if !payload.is_empty() {
                    debug!(
                        "Dropping datagram with unknown tag {:#04x} from {}",
                        payload[0], datagram.peer
                    );
                }
                Outcome::none(wire_type)
            }
            WireType::Hello => Outcome::new(wire_type, [decode_hello(payload, &self.handshake)]),
            WireType::Ping | WireType::Acknowledgement => {
                Outcome::new(wire_type, [build_ack(payload)])
            }
            WireType::Reliable => {
                let reply = handle_payload(payload, self.listings.as_ref());
                let ack = build_ack(payload);
                Outcome::new(wire_type, [ack, reply])
            }
            WireType::Unreliable => {
                Outcome::new(wire_type, [handle_payload(payload, self.listings.as_ref())])
            }
            WireType::Fragment => {
                let reply = self
                    .fragments
                    .handle_fragment(datagram.peer, payload, now)
                    .map(|body| {
                        debug!("Reassembled {}-byte message from {}", body.len(), datagram.peer);
                        handle_payload(&concat(&[TAG_UNRELIABLE], &body), self.listings.as_ref())
                    })
                    .unwrap_or_default();
                Outcome::new(wire_type, [reply])
            }
            WireType::Disconnect => {
                debug!("Peer {} disconnected: {}", datagram.peer, hex(&payload[1..]));
                Outcome::none(wire_type)
            }
        }
    }
}

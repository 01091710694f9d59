//! # Wire Protocol
//!
//! Encoders and decoders for the datagram protocol spoken by the game client.
//! Everything here is pure: functions take byte slices and return new buffers,
//! and nothing holds a socket.
//!
//! ## Datagram Kinds
//! The first byte of every datagram selects its kind ([`WireType`]). Unknown
//! tag bytes never reach a decoder.
//!
//! ## Reliability
//! Reliable and ping datagrams carry a two-byte [`Nonce`] answered by an
//! acknowledgement ([`build_ack`]). Acknowledgement is a stateless echo.
//!
//! ## Messages
//! Reliable and unreliable datagrams nest length-prefixed game messages
//! ([`game`]). The hello handshake ([`handshake`]) and fragment datagrams
//! ([`fragment`]) have their own layouts.
//!
//! Decoders return [`ProtocolError`] describing what was wrong; the server
//! turns every such error into "no reply".

pub mod ack;
pub mod buffer;
pub mod error;
pub mod fragment;
pub mod game;
pub mod game_code;
pub mod handshake;
pub mod wire;

pub use ack::{build_ack, encode_ack, encode_ping, Nonce};
pub use buffer::{concat, concat_all, is_zeroed, zero_fill};
pub use error::{ProtocolError, Result};
pub use fragment::{DiscardFragments, FragmentAssembler, FragmentHeader, FragmentStage};
pub use game::{
    decode_search_response, encode_empty_search_response, encode_search_response, handle_payload,
    GameListing, ImposterCount, Language, LanguageCode, ListingSource, MapSet, SearchCriteria,
};
pub use game_code::GameCode;
pub use handshake::{decode_hello, DisconnectReason, HandshakePolicy, Hello};
pub use wire::WireType;

//! # Hazel Probe Library
//!
//! Small client for checking a running server by hand. It builds the
//! datagrams a game client would send, waits for whatever comes back and
//! explains each reply.
//!
//! ## Module Organization
//!
//! - `network`: the [`Probe`] socket wrapper and request builders
//! - `report`: turning replies into readable lines

pub mod network;
pub mod report;

pub use network::Probe;
pub use report::{describe, parse_hex};

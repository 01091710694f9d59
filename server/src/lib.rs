//! # Hazel Matchmaking Server Library
//!
//! Server side of the Hazel reliable-UDP protocol: it answers pings and
//! reliable datagrams with acknowledgements, accepts or rejects hello
//! handshakes, and replies to game search requests with a listing.
//!
//! ## Architecture Design
//!
//! ### Single Worker Loop
//! One task owns the socket and a single reusable receive buffer. Every
//! datagram is dispatched, answered and forgotten before the next receive,
//! and the buffer is zeroed in between.
//!
//! ### Pure Codecs
//! All byte-level work lives in the `protocol` crate. The [`dispatch`] module
//! only routes a datagram to those codecs and collects the replies in send
//! order, so it never sees the socket.
//!
//! ## Module Organization
//!
//! - [`config`]: TOML-backed [`ServerConfig`] with validation
//! - [`dispatch`]: wire-type routing from one datagram to its replies
//! - [`events`]: optional event channel and running counters
//! - [`listing`]: listing sources used to answer searches
//! - [`network`]: the UDP [`Server`] and its stop handle
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::{PlaceholderListing, Server, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let server = Server::bind(&config, Arc::new(PlaceholderListing::default())).await?;
//!
//!     let handle = server.handle();
//!     let task = server.start();
//!
//!     tokio::signal::ctrl_c().await?;
//!     handle.stop();
//!     let stats = task.await??;
//!     println!("served {} datagrams", stats.received);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod listing;
pub mod network;

pub use config::ServerConfig;
pub use dispatch::{Datagram, Dispatcher, Outcome};
pub use error::{Result, ServerError};
pub use events::{ServerEvent, ServerStats};
pub use listing::{NoListings, PlaceholderListing};
pub use network::{ReceiveBuffer, Server, ServerHandle, ServerState};

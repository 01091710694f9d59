use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop the server from starting or keep it from running.
///
/// Malformed datagrams are never reported here; they are dropped inside the
/// dispatcher.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to create server directory {}: {source}", path.display())]
    RootDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

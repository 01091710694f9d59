//! Server configuration.
//!
//! Every field has a default, so a TOML file only needs the values it changes.
//! Command-line flags in the binary are applied on top of the file.

use crate::error::{Result, ServerError};
use protocol::fragment::MAX_FRAGMENT_PARTS;
use protocol::game::SEARCH_REQUEST_LEN;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 22023;

/// Largest inbound datagram in the baseline protocol.
pub const DEFAULT_BUFFER_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub max_players: usize,
    /// Size of the reusable receive buffer; longer datagrams are truncated.
    pub buffer_size: usize,
    /// Directory for server files, created at startup when missing.
    pub root_dir: PathBuf,
    /// Client versions allowed through the hello handshake. Empty allows all.
    pub accepted_client_versions: Vec<i32>,
    /// Buffer and reassemble fragment datagrams instead of discarding them.
    pub reassemble_fragments: bool,
    pub fragment_timeout_ms: u64,
    pub max_pending_fragment_sets: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_players: 10,
            buffer_size: DEFAULT_BUFFER_SIZE,
            root_dir: PathBuf::from("server"),
            accepted_client_versions: Vec::new(),
            reassemble_fragments: false,
            fragment_timeout_ms: 5000,
            max_pending_fragment_sets: 256,
        }
    }
}

impl ServerConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ServerError::Config(format!("failed to parse TOML: {e}")))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn fragment_timeout(&self) -> Duration {
        Duration::from_millis(self.fragment_timeout_ms)
    }

    /// Lists every problem with the configuration; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.buffer_size < SEARCH_REQUEST_LEN {
            errors.push(format!(
                "buffer_size {} is smaller than a search request ({} bytes)",
                self.buffer_size, SEARCH_REQUEST_LEN
            ));
        }
        if self.buffer_size > u16::MAX as usize {
            errors.push(format!(
                "buffer_size {} exceeds the largest UDP payload",
                self.buffer_size
            ));
        }
        if self.max_players == 0 {
            errors.push("max_players must be at least 1".to_string());
        }
        if self.reassemble_fragments {
            if self.fragment_timeout_ms == 0 {
                errors.push("fragment_timeout_ms must be positive".to_string());
            }
            if self.max_pending_fragment_sets == 0 {
                errors.push(format!(
                    "max_pending_fragment_sets must be positive (sets hold up to {} parts)",
                    MAX_FRAGMENT_PARTS
                ));
            }
        }

        errors
    }

    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServerError::Config(errors.join("; ")))
        }
    }
}

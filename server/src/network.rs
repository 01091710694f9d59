//! Server network layer: owns the UDP socket and runs the receive/reply loop

use crate::config::ServerConfig;
use crate::dispatch::{Datagram, Dispatcher, Outcome};
use crate::error::{Result, ServerError};
use crate::events::{EventSink, ServerEvent, ServerStats};
use log::{debug, error, info, warn};
use protocol::{is_zeroed, zero_fill, ListingSource, WireType};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Running,
    Stopped,
}

/// Cloneable handle for stopping a server from another task or thread.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    state: Arc<watch::Sender<ServerState>>,
}

impl ServerHandle {
    /// Requests shutdown. Safe to call any number of times.
    pub fn stop(&self) {
        self.state.send_if_modified(|state| {
            if *state == ServerState::Running {
                *state = ServerState::Stopped;
                true
            } else {
                false
            }
        });
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }
}

/// Fixed-size buffer reused for every receive.
pub struct ReceiveBuffer {
    bytes: Vec<u8>,
}

impl ReceiveBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn filled(&self, len: usize) -> &[u8] {
        &self.bytes[..len.min(self.bytes.len())]
    }

    /// Zeroes the whole buffer so a short datagram never sees bytes left over
    /// from an earlier peer.
    pub fn clear(&mut self) {
        zero_fill(&mut self.bytes);
    }

    pub fn is_zeroed(&self) -> bool {
        is_zeroed(&self.bytes)
    }
}

/// Single-worker UDP server. Consumed by [`Server::run`], so it runs at most once.
pub struct Server {
    socket: UdpSocket,
    local_addr: SocketAddr,
    buffer: ReceiveBuffer,
    dispatcher: Dispatcher,
    state: Arc<watch::Sender<ServerState>>,
    events: EventSink,
    stats: ServerStats,
}

impl Server {
    /// Validates the configuration, prepares the root directory and binds the socket.
    pub async fn bind(config: &ServerConfig, listings: Arc<dyn ListingSource>) -> Result<Self> {
        config.validate_strict()?;
        prepare_root_dir(&config.root_dir)?;

        let addr = config.bind_addr();
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;
        info!(
            "Server listening on {} (max {} players)",
            local_addr, config.max_players
        );

        let (state, _) = watch::channel(ServerState::Running);

        Ok(Server {
            socket,
            local_addr,
            buffer: ReceiveBuffer::new(config.buffer_size),
            dispatcher: Dispatcher::from_config(config, listings),
            state: Arc::new(state),
            events: EventSink::default(),
            stats: ServerStats::default(),
        })
    }

    pub fn with_events(mut self, tx: mpsc::UnboundedSender<ServerEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Spawns [`Server::run`] on the current runtime.
    pub fn start(self) -> JoinHandle<Result<ServerStats>> {
        tokio::spawn(self.run())
    }

    /// Receives and answers datagrams until stopped.
    ///
    /// Returns the final counters on a requested stop, or the transport error
    /// that ended the loop.
    pub async fn run(mut self) -> Result<ServerStats> {
        let mut shutdown = self.state.subscribe();
        info!("Server started successfully");

        let result = loop {
            if *shutdown.borrow_and_update() == ServerState::Stopped {
                break Ok(());
            }

            tokio::select! {
                biased;

                _ = shutdown.changed() => continue,

                received = self.socket.recv_from(self.buffer.as_mut_slice()) => match received {
                    Ok((len, peer)) => {
                        self.process(len, peer).await;
                    }
                    Err(e) => {
                        if *self.state.borrow() == ServerState::Stopped {
                            break Ok(());
                        }
                        error!("Error receiving datagram: {}", e);
                        break Err(ServerError::Transport(e));
                    }
                },
            }
        };

        self.state.send_replace(ServerState::Stopped);
        info!(
            "Server shutting down: {} received, {} dropped, {} replies sent, {} send failures",
            self.stats.received,
            self.stats.dropped,
            self.stats.replies_sent,
            self.stats.send_failures
        );
        self.events.emit(ServerEvent::Stopped { stats: self.stats });

        result.map(|()| self.stats)
    }

    /// Handles the `len` bytes currently in the receive buffer, then clears it.
    async fn process(&mut self, len: usize, peer: SocketAddr) -> Outcome {
        self.stats.received += 1;
        if len == self.buffer.capacity() {
            debug!("Datagram from {} filled the receive buffer and may be truncated", peer);
        }

        let outcome = self
            .dispatcher
            .dispatch(Datagram::new(peer, self.buffer.filled(len)), Instant::now());
        if outcome.wire_type == WireType::Unknown {
            self.stats.dropped += 1;
        }

        for reply in &outcome.replies {
            match self.socket.send_to(reply, peer).await {
                Ok(_) => {
                    self.stats.replies_sent += 1;
                    if WireType::of(reply) == WireType::Disconnect {
                        info!("Told {} to disconnect", peer);
                    }
                }
                Err(e) => {
                    self.stats.send_failures += 1;
                    warn!("Failed to send {}-byte reply to {}: {}", reply.len(), peer, e);
                }
            }
        }

        self.events.emit(ServerEvent::DatagramProcessed {
            peer,
            wire_type: outcome.wire_type,
            replies: outcome.replies.len(),
        });

        self.buffer.clear();
        outcome
    }
}

fn prepare_root_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(path).map_err(|source| ServerError::RootDir {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Created server directory {}", path.display());
    Ok(())
}

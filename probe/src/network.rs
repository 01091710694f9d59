use log::{debug, info};
use protocol::{encode_ping, Hello, ImposterCount, LanguageCode, MapSet, Nonce, SearchCriteria};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// A socket aimed at one server.
pub struct Probe {
    socket: UdpSocket,
    server_addr: SocketAddr,
    wait: Duration,
}

impl Probe {
    /// Binds an ephemeral local port of the same address family as `server_addr`.
    /// `wait` is how long to keep listening after the last reply.
    pub async fn new(server_addr: SocketAddr, wait: Duration) -> io::Result<Self> {
        let local: SocketAddr = if server_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        info!("Probe socket bound to {}", socket.local_addr()?);

        Ok(Probe {
            socket,
            server_addr,
            wait,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Sends one datagram and collects replies until `wait` passes without one.
    pub async fn exchange(&self, datagram: &[u8]) -> io::Result<Vec<Vec<u8>>> {
        self.socket.send_to(datagram, self.server_addr).await?;
        debug!("Sent {} bytes to {}", datagram.len(), self.server_addr);

        let mut replies = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match timeout(self.wait, self.socket.recv_from(&mut buf)).await {
                Ok(Ok((len, from))) => {
                    if from != self.server_addr {
                        debug!("Ignoring {} bytes from {}", len, from);
                        continue;
                    }
                    replies.push(buf[..len].to_vec());
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => break,
            }
        }

        Ok(replies)
    }
}

pub fn random_nonce() -> Nonce {
    Nonce::from_value(rand::random())
}

pub fn ping_request() -> Vec<u8> {
    encode_ping(random_nonce())
}

pub fn hello_request(name: &str, client_version: i32) -> protocol::Result<Vec<u8>> {
    Hello {
        nonce: random_nonce(),
        hazel_version: 0,
        client_version,
        name: name.to_string(),
    }
    .encode()
}

pub fn search_request(imposters: u8, maps: MapSet, language: LanguageCode) -> Vec<u8> {
    SearchCriteria {
        imposters: ImposterCount::from(imposters),
        maps,
        language,
    }
    .encode_request(random_nonce())
}

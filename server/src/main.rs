use clap::Parser;
use log::{error, info};
use server::{PlaceholderListing, Server, ServerConfig};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Hazel matchmaking server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// TOML configuration file; flags below override its values
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Address to bind to
    #[clap(short = 'H', long)]
    host: Option<IpAddr>,
    /// UDP port to listen on
    #[clap(short, long)]
    port: Option<u16>,
    /// Maximum players advertised per game
    #[clap(short, long)]
    max_players: Option<usize>,
    /// Directory for server files
    #[clap(long)]
    root_dir: Option<PathBuf>,
    /// Reassemble fragment datagrams instead of discarding them
    #[clap(long)]
    reassemble_fragments: bool,
    /// Client version accepted by the handshake (repeatable)
    #[clap(long = "accept-version")]
    accepted_versions: Vec<i32>,
}

impl Args {
    fn into_config(self) -> server::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max_players) = self.max_players {
            config.max_players = max_players;
        }
        if let Some(root_dir) = self.root_dir {
            config.root_dir = root_dir;
        }
        if self.reassemble_fragments {
            config.reassemble_fragments = true;
        }
        if !self.accepted_versions.is_empty() {
            config.accepted_client_versions = self.accepted_versions;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Args::parse().into_config()?;
    info!("Starting server on {}", config.bind_addr());
    info!("Set RUST_LOG=debug to trace every datagram");

    let server = Server::bind(&config, Arc::new(PlaceholderListing::default())).await?;
    let handle = server.handle();
    let mut server_task = server.start();

    let result = tokio::select! {
        result = &mut server_task => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.stop();
            server_task.await
        }
    };

    match result {
        Ok(Ok(stats)) => {
            info!("Server stopped after {} datagrams", stats.received);
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Server error: {}", e);
            Err(e.into())
        }
        Err(e) => {
            error!("Server task panicked: {}", e);
            Err(e.into())
        }
    }
}

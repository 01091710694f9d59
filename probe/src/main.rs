use clap::{Parser, Subcommand};
use log::info;
use probe::network::{hello_request, ping_request, search_request};
use probe::{describe, parse_hex, Probe};
use protocol::{GameCode, Language, LanguageCode, MapSet};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to probe
    #[arg(short = 's', long, default_value = "127.0.0.1:22023")]
    server: SocketAddr,

    /// How long to wait for more replies, in milliseconds
    #[arg(short = 'w', long, default_value = "1000")]
    wait_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a ping and expect an acknowledgement
    Ping,
    /// Send a hello handshake
    Hello {
        #[arg(short, long, default_value = "probe")]
        name: String,
        #[arg(short = 'v', long, default_value_t = 50516550)]
        client_version: i32,
    },
    /// Send a game search request
    Search {
        /// Imposter count to ask for, 0 for any
        #[arg(short, long, default_value_t = 0)]
        imposters: u8,
        /// Map bit mask (1 Skeld, 2 Mira HQ, 4 Polus)
        #[arg(short, long, default_value_t = 0x07)]
        maps: u8,
        /// Raw language code
        #[arg(short, long, default_value_t = Language::English.code())]
        language: u16,
    },
    /// Send arbitrary bytes given as hex
    Raw { bytes: String },
    /// Convert a game code between its letters and its hex id
    Code { code: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=debug for detailed logging");
    }

    let args = Args::parse();

    let datagram = match args.command {
        Command::Ping => ping_request(),
        Command::Hello {
            name,
            client_version,
        } => hello_request(&name, client_version)?,
        Command::Search {
            imposters,
            maps,
            language,
        } => search_request(
            imposters,
            MapSet::from_bits_retain(maps),
            LanguageCode(language),
        ),
        Command::Raw { bytes } => parse_hex(&bytes)?,
        Command::Code { code } => {
            print_game_code(&code)?;
            return Ok(());
        }
    };

    let probe = Probe::new(args.server, Duration::from_millis(args.wait_ms)).await?;
    info!("Probing {}", probe.server_addr());

    let replies = probe.exchange(&datagram).await?;
    if replies.is_empty() {
        println!("no reply within {}ms", args.wait_ms);
    }
    for (i, reply) in replies.iter().enumerate() {
        println!("reply {}: {}", i + 1, describe(reply));
    }

    Ok(())
}

fn print_game_code(code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let game_code = match parse_hex(code) {
        Ok(bytes) if bytes.len() == 4 => {
            GameCode::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
        }
        _ => code.parse::<GameCode>()?,
    };
    println!("{} = {}", game_code, protocol::buffer::hex(&game_code.bytes()));
    Ok(())
}

//! Performance benchmarks for the per-datagram codec paths

use protocol::{
    build_ack, encode_search_response, handle_payload, FragmentAssembler, FragmentHeader,
    GameCode, GameListing, ImposterCount, Language, ListingSource, MapSet, Nonce, SearchCriteria,
};
use server::{Datagram, Dispatcher, PlaceholderListing, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fake_game() -> GameListing {
    GameListing {
        game_id: GameCode::from_bytes([0xf9, 0x51, 0x13, 0x80]),
        name: "Fake Game".to_string(),
        imposters: 3,
        occupancy: [1, 2, 8],
    }
}

fn search_request() -> Vec<u8> {
    SearchCriteria {
        imposters: ImposterCount::Any,
        maps: MapSet::all(),
        language: Language::English.into(),
    }
    .encode_request(Nonce::from_value(2))
}

fn report(name: &str, iterations: u32, duration: Duration) {
    println!(
        "{}: {} iterations in {:?} ({:.2} ns/iter)",
        name,
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );
}

/// Benchmarks building acks for pings
#[test]
fn benchmark_build_ack() {
    let ping = [0x02, 0x05, 0x00];
    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = build_ack(&ping);
    }

    let duration = start.elapsed();
    report("Ack building", iterations, duration);

    // Should complete in under 500ms for 100k iterations
    assert!(duration.as_millis() < 500);
}

/// Benchmarks encoding the search response
#[test]
fn benchmark_search_response_encoding() {
    let listing = fake_game();
    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = encode_search_response(&listing);
    }

    let duration = start.elapsed();
    report("Search response encoding", iterations, duration);

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks the full search path from request bytes to response bytes
#[test]
fn benchmark_search_handling() {
    let request = search_request();
    let listings = PlaceholderListing::default();
    let source: &dyn ListingSource = &listings;
    let iterations = 50_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let reply = handle_payload(&request, source);
        assert!(!reply.is_empty());
    }

    let duration = start.elapsed();
    report("Search handling", iterations, duration);

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks game code text conversion
#[test]
fn benchmark_game_code_conversion() {
    let code = GameCode::from_bytes([0xf9, 0x51, 0x13, 0x80]);
    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let text = code.to_string();
        let parsed: GameCode = text.parse().unwrap();
        assert_eq!(parsed, code);
    }

    let duration = start.elapsed();
    report("Game code conversion", iterations, duration);

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks reassembling many small fragment sets
#[test]
fn benchmark_fragment_reassembly() {
    let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();
    let mut assembler = FragmentAssembler::new(Duration::from_secs(5), 256);
    let now = Instant::now();
    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let id = (i % u16::MAX as u32) as u16;
        for index in 0..4 {
            let part = FragmentHeader {
                id,
                index,
                count: 4,
            }
            .encode(&[index; 16]);
            let _ = assembler.accept(peer, &part, now);
        }
    }

    let duration = start.elapsed();
    report("Fragment reassembly (4 parts)", iterations, duration);

    assert_eq!(assembler.pending_sets(), 0);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks dispatching a mixed stream of datagrams
#[test]
fn benchmark_dispatch_mix() {
    let mut dispatcher = Dispatcher::from_config(
        &ServerConfig::default(),
        Arc::new(PlaceholderListing::default()),
    );
    let peer: SocketAddr = "127.0.0.1:5001".parse().unwrap();
    let search = search_request();
    let datagrams: [&[u8]; 4] = [&[0x02, 0x01, 0x00], &search, &[0xee], &[0x04]];

    let iterations = 25_000;
    let start = Instant::now();
    let mut replies = 0;

    for _ in 0..iterations {
        for payload in datagrams {
            replies += dispatcher
                .dispatch(Datagram::new(peer, payload), Instant::now())
                .replies
                .len();
        }
    }

    let duration = start.elapsed();
    report("Dispatch (4 datagrams)", iterations, duration);

    assert_eq!(replies, iterations as usize * 3);
    assert!(duration.as_millis() < 3000);
}

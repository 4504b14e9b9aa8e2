//! Network sink example
//!
//! Starts a small TCP collector on a local port, ships JSON log lines to it
//! through a [`NetworkSink`], then restarts the collector connection to show
//! the sink reconnecting in the background.
//!
//! Run with: cargo run --example network_sink

use rust_log_pipeline::prelude::*;
use std::io::{BufRead, BufReader};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Accept `connections` clients one after another and print what they send
fn run_collector(listener: TcpListener, connections: usize) {
    for n in 1..=connections {
        let Ok((stream, peer)) = listener.accept() else {
            return;
        };
        println!("   [collector] connection {} from {}", n, peer);
        for line in BufReader::new(stream).lines() {
            match line {
                Ok(line) if line == "bye" => break,
                Ok(line) => println!("   [collector] {}", line),
                Err(_) => break,
            }
        }
        println!("   [collector] connection {} closed", n);
    }
}

fn main() -> Result<()> {
    println!("=== Rust Log Pipeline - Network Sink Example ===\n");

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let address = listener.local_addr()?.to_string();
    let collector = thread::spawn(move || run_collector(listener, 2));

    let sink = Arc::new(NetworkSink::connect(
        "tcp",
        &address,
        SinkConfig::unbuffered(),
        NetworkConfig::default().with_retry_backoff(Duration::from_millis(100)),
    )?);

    let mut logger = Logger::builder()
        .name("network-demo")
        .label("host", "demo")
        .exporter(
            StandardExporter::builder()
                .name("collector")
                .encoder(JsonEncoder::new())
                .sink(sink.clone())
                .build(),
        )
        .build();

    println!("1. Shipping entries to {}:", address);
    logger.info("collector attached")?;
    logger.warn(Message::structured(
        "disk almost full",
        Fields::new().with_field("used_pct", 93),
    ))?;

    println!("\n2. Collector hangs up, the sink reconnects:");
    sink.write(b"bye\n")?;
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        // Writes fail until the background reconnect swaps in a new stream
        match logger.info("are you there?") {
            Ok(()) if !sink.is_disconnected() && sink.reconnects_started() > 0 => break,
            Ok(()) => {}
            Err(err) => println!("   write failed: {}", err),
        }
        thread::sleep(Duration::from_millis(50));
    }
    println!(
        "   reconnects started: {}, dial attempts: {}",
        sink.reconnects_started(),
        sink.dial_attempts()
    );

    let reconnected = sink.reconnects_started() > 0 && !sink.is_disconnected();
    if reconnected {
        logger.info("back online")?;
        sink.write(b"bye\n")?;
    }
    logger.close()?;

    if reconnected {
        let _ = collector.join();
    }
    println!("\n=== Example completed successfully! ===");

    Ok(())
}

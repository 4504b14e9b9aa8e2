//! Basic logger usage example
//!
//! Demonstrates the standard console logger, derived loggers with labels,
//! the formatting macros and the rate-limiting sampler.
//!
//! Run with: cargo run --example basic_usage

use rust_log_pipeline::prelude::*;
use rust_log_pipeline::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Log Pipeline - Basic Usage Example ===\n");

    // Stdout up to WARN, stderr for ERROR and FATAL
    let mut logger = Logger::standard()?;

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message (hidden, minimum level is INFO)")?;
    logger.info("This is an info message")?;
    logger.warn("This is a warning message")?;
    logger.error("This is an error message")?;
    logger.sync()?;

    println!("\n2. Formatting macros and structured messages:");
    let port = 8080;
    info!(logger, "Server listening on port {}", port)?;
    logger.info(Message::structured(
        "request served",
        Fields::new()
            .with_field("status", 200)
            .with_field("path", "/health"),
    ))?;
    logger.sync()?;

    println!("\n3. Derived logger with labels and a hook:");
    let served = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&served);
    let checkout = logger
        .derive()
        .name("checkout")
        .label("service", "checkout")
        .label("region", "eu-west-1")
        .hook(FnHook::new("count", move |_entry: &mut LogEntry| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }))
        .build();
    checkout.info("order placed")?;
    warn!(checkout, "payment retried {} times", 2)?;
    checkout.sync()?;
    println!("   hook saw {} entries", served.load(Ordering::Relaxed));

    println!("\n4. Rate-limited repeated messages:");
    let sampled = logger
        .derive()
        .sampler(RateLimitingSampler::new(
            SamplingConfig::default()
                .with_tick(Duration::from_secs(60))
                .with_first(3)
                .with_thereafter(0),
        )?)
        .build();
    for _ in 0..10 {
        sampled.info("cache miss for hot key")?;
    }
    sampled.sync()?;
    println!(
        "   logged {}, sampled out {}",
        sampled.metrics().total_logged(),
        sampled.metrics().sampled_out()
    );

    logger.close()?;
    println!("\n=== Example completed successfully! ===");

    Ok(())
}

//! Integration tests for the logging pipeline
//!
//! These tests verify:
//! - Level gating and per-exporter level spans
//! - Hook and exporter error propagation
//! - File sink durability after sync and close
//! - Sampling through a full logger
//! - Derived loggers sharing exporters
//! - Log injection prevention in the text encoder

use rust_log_pipeline::core::{
    EncoderConfig, FnHook, JsonEncoder, LevelSpan, LogEntry, LogLevel, Logger, LoggerError,
    Message, RateLimitingSampler, SamplingConfig, StandardExporter, TextEncoder,
};
use rust_log_pipeline::sinks::{self, SinkConfig};
use rust_log_pipeline::{info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn plain_text() -> TextEncoder {
    TextEncoder::with_config(EncoderConfig::new().with_time(false))
}

fn file_exporter(path: &Path, span: LevelSpan) -> StandardExporter {
    let sink = sinks::file(path).expect("Failed to open log file");
    StandardExporter::builder()
        .span(span)
        .encoder(plain_text())
        .sink(Arc::new(sink))
        .build()
}

#[test]
fn test_file_output_survives_close() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    let mut logger = Logger::builder()
        .name("app")
        .label("env", "test")
        .exporter(file_exporter(&log_file, LevelSpan::all()))
        .build();

    logger.info("first").unwrap();
    logger.warn("second").unwrap();

    // Buffered: nothing has reached the file yet
    assert_eq!(fs::read_to_string(&log_file).unwrap(), "");

    logger.close().expect("Failed to close logger");

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    assert_eq!(
        content,
        "env=test app [INFO] first\nenv=test app [WARN] second\n"
    );

    // Writes after close are rejected
    assert!(matches!(logger.info("late"), Err(LoggerError::SinkClosed)));
}

#[test]
fn test_sync_makes_output_visible() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("sync.log");

    let logger = Logger::builder()
        .exporter(file_exporter(&log_file, LevelSpan::all()))
        .build();

    for i in 0..100 {
        logger.info(format!("line {}", i)).unwrap();
    }
    logger.sync().expect("Failed to sync");

    let content = fs::read_to_string(&log_file).unwrap();
    assert_eq!(content.lines().count(), 100);
    assert!(content.ends_with("[INFO] line 99\n"));
}

#[test]
fn test_level_spans_route_entries() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let normal = temp_dir.path().join("normal.log");
    let errors = temp_dir.path().join("errors.log");

    let mut logger = Logger::builder()
        .min_level(LogLevel::Debug)
        .exporter(file_exporter(
            &normal,
            LevelSpan::new(LogLevel::Trace, LogLevel::Warn),
        ))
        .exporter(file_exporter(
            &errors,
            LevelSpan::new(LogLevel::Error, LogLevel::Fatal),
        ))
        .build();

    logger.trace("gated by logger").unwrap();
    logger.debug("debug").unwrap();
    logger.warn("warn").unwrap();
    logger.error("error").unwrap();
    logger.fatal("fatal").unwrap();
    logger.close().unwrap();

    assert_eq!(
        fs::read_to_string(&normal).unwrap(),
        "[DEBUG] debug\n[WARN] warn\n"
    );
    assert_eq!(
        fs::read_to_string(&errors).unwrap(),
        "[ERROR] error\n[FATAL] fatal\n"
    );
}

#[test]
fn test_hook_veto_reaches_caller() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("veto.log");

    let mut logger = Logger::builder()
        .hook(FnHook::new("no_secrets", |entry: &mut LogEntry| {
            if entry.message.text().contains("password") {
                return Err(LoggerError::hook("no_secrets", "message contains a secret"));
            }
            Ok(())
        }))
        .exporter(file_exporter(&log_file, LevelSpan::all()))
        .build();

    let err = logger.info("password=hunter2").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Hook 'no_secrets' failed: message contains a secret"
    );
    logger.info("clean").unwrap();
    logger.close().unwrap();

    assert_eq!(fs::read_to_string(&log_file).unwrap(), "[INFO] clean\n");
    assert_eq!(logger.metrics().hook_failures(), 1);
    assert_eq!(logger.metrics().total_logged(), 1);
}

#[test]
fn test_json_exporter_with_hook_fields() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.json");

    let sink = sinks::file_with_config(&log_file, SinkConfig::unbuffered()).unwrap();
    let logger = Logger::builder()
        .name("billing")
        .hook(FnHook::new("upper", |entry: &mut LogEntry| {
            entry.message = Message::from(entry.message.text().to_uppercase());
            Ok(())
        }))
        .exporter(
            StandardExporter::builder()
                .encoder(JsonEncoder::with_config(EncoderConfig::new().with_time(false)))
                .sink(Arc::new(sink))
                .build(),
        )
        .build();

    logger.error("invoice rejected").unwrap();

    let content = fs::read_to_string(&log_file).unwrap();
    let value: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
    assert_eq!(value["level"], "ERROR");
    assert_eq!(value["name"], "billing");
    assert_eq!(value["message"], "INVOICE REJECTED");
}

#[test]
fn test_sampler_bounds_repeated_messages() {
    let sampler = RateLimitingSampler::new(
        SamplingConfig::default()
            .with_first(5)
            .with_thereafter(10),
    )
    .unwrap();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("sampled.log");

    let mut logger = Logger::builder()
        .sampler(sampler)
        .exporter(file_exporter(&log_file, LevelSpan::all()))
        .build();

    for _ in 0..56 {
        logger.info("hot loop").unwrap();
    }
    for _ in 0..20 {
        logger.error("outside the sampled span").unwrap();
    }
    logger.close().unwrap();

    // 1 window-opening call, 5 burst, then counts 15, 25, 35, 45, 55
    let content = fs::read_to_string(&log_file).unwrap();
    assert_eq!(content.matches("hot loop").count(), 11);
    assert_eq!(content.matches("outside the sampled span").count(), 20);
    assert_eq!(logger.metrics().sampled_out(), 45);
}

#[test]
fn test_derived_logger_shares_exporters() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("derived.log");

    let base = Logger::builder()
        .name("app")
        .exporter(file_exporter(&log_file, LevelSpan::all()))
        .build();
    let child = base.derive().name("app.cache").label("tier", "l1").build();

    base.info("from base").unwrap();
    child.info("from child").unwrap();
    base.sync().unwrap();

    assert_eq!(child.exporter_count(), 1);
    assert_eq!(
        fs::read_to_string(&log_file).unwrap(),
        "app [INFO] from base\ntier=l1 app.cache [INFO] from child\n"
    );
}

#[test]
fn test_log_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("injection.log");

    let mut logger = Logger::builder()
        .exporter(file_exporter(&log_file, LevelSpan::all()))
        .build();

    let malicious = "User login\nERROR Fake error injected\r\nINFO Continuation";
    logger.info(malicious).unwrap();
    logger.close().unwrap();

    let content = fs::read_to_string(&log_file).unwrap();
    assert_eq!(content.lines().count(), 1, "Log should be a single line");
    assert!(content.contains("\\n"));
    assert!(content.contains("\\r"));
}

#[test]
fn test_macros_capture_module() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("macros.log");

    let mut logger = Logger::builder()
        .capture_source(true)
        .exporter(
            StandardExporter::builder()
                .encoder(JsonEncoder::with_config(EncoderConfig::new().with_time(false)))
                .sink(Arc::new(sinks::file(&log_file).unwrap()))
                .build(),
        )
        .build();

    info!(logger, "request {} served", 7).unwrap();
    warn!(logger, "slow request").unwrap();
    logger.close().unwrap();

    let content = fs::read_to_string(&log_file).unwrap();
    let first: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(first["message"], "request 7 served");
    assert!(first["source"]["file"]
        .as_str()
        .unwrap()
        .ends_with("integration_tests.rs"));
    assert_eq!(first["source"]["module"], "integration_tests");
}

#[test]
fn test_standard_logger_builds() {
    let logger = Logger::standard().expect("standard logger");
    assert_eq!(logger.min_level(), LogLevel::Info);
    assert_eq!(logger.exporter_count(), 2);
    assert!(!logger.accepts(LogLevel::Debug));
    assert!(logger.accepts(LogLevel::Error));
}

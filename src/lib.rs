//! # Rust Log Pipeline
//!
//! The output side of a structured logger: a fixed per-call pipeline that
//! filters, samples, decorates, encodes and writes log entries through
//! pluggable exporters and sinks.
//!
//! ## Features
//!
//! - **Low overhead**: filtered calls allocate nothing, entries and encode
//!   buffers are pooled
//! - **Rate limiting**: a lock-free sampler bounds repeated messages per tick
//! - **Buffered sinks**: file, console and network sinks batch writes and
//!   flush during sync without blocking other writers
//! - **Network reconnect**: a TCP or Unix socket sink redials in the
//!   background after the connection drops
//!
//! ## Example
//!
//! ```no_run
//! use rust_log_pipeline::prelude::*;
//!
//! let mut logger = Logger::standard().unwrap();
//! logger.info("service started").unwrap();
//! logger.close().unwrap();
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        Encoder, EncoderConfig, Exporter, FieldValue, Fields, FnHook, Hook, JsonEncoder, Label,
        Labels, LevelSpan, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerError, LoggerMetrics,
        Message, ObjectPool, RateLimitingSampler, Result, Sampler, SamplingConfig, Sink,
        StandardExporter, TextEncoder, TimestampFormat,
    };
    pub use crate::sinks;
    pub use crate::sinks::{BufferedSink, NetworkConfig, NetworkSink, SinkConfig};
}

pub use crate::core::{
    Exporter, Hook, LevelSpan, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerError,
    LoggerMetrics, Message, Result, Sampler, Sink, SourceLocation, StandardExporter,
};

//! Core pipeline types and traits

pub mod encoder;
pub mod error;
pub mod exporter;
pub mod hook;
pub mod label;
pub mod lock;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod message;
pub mod metrics;
pub mod pool;
pub mod sampler;
pub mod sink;
pub mod timestamp;

pub use encoder::{Encoder, EncoderConfig, JsonEncoder, TextEncoder};
pub use error::{LoggerError, Result};
pub use exporter::{buffer_pool, Exporter, StandardExporter, StandardExporterBuilder};
pub use hook::{FnHook, Hook};
pub use label::{Label, Labels};
pub use lock::{LockState, RawSuspendLock, SuspendMutex, SuspendMutexGuard, SuspendedGuard};
pub use log_entry::{LogEntry, SourceLocation};
pub use log_level::{LevelSpan, LogLevel};
pub use logger::{Logger, LoggerBuilder, DEFAULT_FLUSH_INTERVAL, MIN_FLUSH_INTERVAL};
pub use message::{FieldValue, Fields, Message};
pub use metrics::LoggerMetrics;
pub use pool::{ObjectPool, PoolMetrics, Pooled, DEFAULT_POOL_CAPACITY};
pub use sampler::{RateLimitingSampler, Sampler, SamplerMetrics, SamplingConfig};
pub use sink::{Destination, Sink};
pub use timestamp::TimestampFormat;

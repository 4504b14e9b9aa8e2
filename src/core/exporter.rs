//! Exporters pair an encoder with a sink
//!
//! The logger fans every kept entry out to its exporters in registration
//! order. Level filtering happens here, per exporter, so one logger can send
//! warnings to one place and errors to another.

use super::encoder::{Encoder, TextEncoder};
use super::error::Result;
use super::log_entry::LogEntry;
use super::log_level::LevelSpan;
use super::pool::ObjectPool;
use super::sink::Sink;
use std::fmt;
use std::sync::Arc;

/// Initial capacity of pooled encode buffers
pub const DEFAULT_BUFFER_CAPACITY: usize = 2048;

/// Buffers that grew past this are not returned to the pool
const MAX_POOLED_BUFFER: usize = 64 * 1024;

pub trait Exporter: Send + Sync {
    fn export(&self, entry: &LogEntry) -> Result<()>;

    fn sync(&self) -> Result<()>;

    fn close(&self) -> Result<()>;

    fn name(&self) -> &str {
        "exporter"
    }
}

/// Shared pool of encode buffers
pub fn buffer_pool(capacity: usize) -> Arc<ObjectPool<Vec<u8>>> {
    Arc::new(ObjectPool::with_factory(capacity, || {
        Vec::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }))
}

/// Level-filtered encoder + sink exporter
pub struct StandardExporter {
    name: String,
    span: LevelSpan,
    encoder: Arc<dyn Encoder>,
    sink: Option<Arc<dyn Sink>>,
    buffers: Arc<ObjectPool<Vec<u8>>>,
}

impl StandardExporter {
    pub fn builder() -> StandardExporterBuilder {
        StandardExporterBuilder::new()
    }

    pub fn span(&self) -> LevelSpan {
        self.span
    }

    pub fn sink(&self) -> Option<&Arc<dyn Sink>> {
        self.sink.as_ref()
    }
}

impl Exporter for StandardExporter {
    fn export(&self, entry: &LogEntry) -> Result<()> {
        if !self.span.contains(entry.level) {
            return Ok(());
        }
        let Some(sink) = &self.sink else {
            return Ok(());
        };

        let mut buf = self.buffers.get();
        buf.clear();
        self.encoder.encode(&mut buf, entry)?;

        let result = if buf.is_empty() {
            Ok(())
        } else {
            sink.write(&buf).map(|_| ())
        };

        if buf.capacity() > MAX_POOLED_BUFFER {
            drop(buf.into_inner());
        }
        result
    }

    fn sync(&self) -> Result<()> {
        match &self.sink {
            Some(sink) => sink.sync(),
            None => Ok(()),
        }
    }

    fn close(&self) -> Result<()> {
        match &self.sink {
            Some(sink) => sink.close(),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for StandardExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardExporter")
            .field("name", &self.name)
            .field("span", &self.span)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

/// Builder for [`StandardExporter`]
///
/// # Example
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let exporter = StandardExporter::builder()
///     .name("stderr")
///     .span(LevelSpan::new(LogLevel::Error, LogLevel::Fatal))
///     .encoder(JsonEncoder::new())
///     .sink(Arc::new(sinks::stderr()))
///     .build();
/// ```
pub struct StandardExporterBuilder {
    name: String,
    span: LevelSpan,
    encoder: Option<Arc<dyn Encoder>>,
    sink: Option<Arc<dyn Sink>>,
    buffers: Option<Arc<ObjectPool<Vec<u8>>>>,
}

impl StandardExporterBuilder {
    pub fn new() -> Self {
        Self {
            name: "standard".to_string(),
            span: LevelSpan::all(),
            encoder: None,
            sink: None,
            buffers: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn span(mut self, span: LevelSpan) -> Self {
        self.span = span;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn encoder<E: Encoder + 'static>(mut self, encoder: E) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shared_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Share an encode buffer pool with other exporters
    #[must_use = "builder methods return a new value"]
    pub fn buffer_pool(mut self, pool: Arc<ObjectPool<Vec<u8>>>) -> Self {
        self.buffers = Some(pool);
        self
    }

    pub fn build(self) -> StandardExporter {
        StandardExporter {
            name: self.name,
            span: self.span,
            encoder: self
                .encoder
                .unwrap_or_else(|| Arc::new(TextEncoder::new())),
            sink: self.sink,
            buffers: self
                .buffers
                .unwrap_or_else(|| buffer_pool(super::pool::DEFAULT_POOL_CAPACITY)),
        }
    }
}

impl Default for StandardExporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

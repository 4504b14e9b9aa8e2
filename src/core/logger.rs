//! Main logger implementation
//!
//! Each call runs the same sequence on the caller's thread:
//!
//! 1. level gate (nothing is allocated for a filtered call)
//! 2. no exporters, nothing to do
//! 3. take a pooled entry and fill it
//! 4. sampler, if any; a discarded entry is not an error
//! 5. source location, if capture is enabled
//! 6. hooks in registration order; the first error aborts the call
//! 7. exporters in registration order; the first error aborts the call
//! 8. return the entry to the pool
//!
//! A failed call leaves the logger fully usable for the next one.

use super::{
    encoder::TextEncoder,
    error::{LoggerError, Result},
    exporter::{buffer_pool, Exporter, StandardExporter},
    hook::Hook,
    label::{Label, Labels},
    log_entry::{LogEntry, SourceLocation},
    log_level::{LevelSpan, LogLevel},
    message::Message,
    metrics::LoggerMetrics,
    pool::{ObjectPool, DEFAULT_POOL_CAPACITY},
    sampler::{RateLimitingSampler, Sampler, SamplingConfig},
};
use crate::sinks;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shortest interval the background flusher runs at
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_micros(100);

/// Flush interval of [`Logger::standard`]
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

type Exporters = Arc<Vec<Arc<dyn Exporter>>>;

/// Background thread syncing every exporter on an interval
struct Flusher {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    fn spawn(exporters: Exporters, interval: Duration) -> Option<Self> {
        let interval = interval.max(MIN_FLUSH_INTERVAL);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let spawned = thread::Builder::new()
            .name("log-flusher".to_string())
            .spawn(move || loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        for (idx, exporter) in exporters.iter().enumerate() {
                            if let Err(e) = exporter.sync() {
                                eprintln!(
                                    "[LOGGER ERROR] Periodic sync of exporter #{} ({}) failed: {}",
                                    idx,
                                    exporter.name(),
                                    e
                                );
                            }
                        }
                    }
                    _ => break,
                }
            });

        match spawned {
            Ok(handle) => Some(Self {
                shutdown: Some(shutdown_tx),
                handle: Some(handle),
            }),
            Err(e) => {
                eprintln!("[LOGGER ERROR] Failed to start flush thread: {}", e);
                None
            }
        }
    }

    fn stop(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                eprintln!("[LOGGER ERROR] Flush thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct Logger {
    name: Arc<str>,
    min_level: LogLevel,
    labels: Arc<Labels>,
    sampler: Option<Arc<dyn Sampler>>,
    hooks: Vec<Arc<dyn Hook>>,
    exporters: Exporters,
    capture_source: bool,
    entries: Arc<ObjectPool<LogEntry>>,
    metrics: Arc<LoggerMetrics>,
    flusher: Option<Flusher>,
    closed: bool,
}

impl Logger {
    /// A logger with no exporters; every call is a no-op until built otherwise
    #[must_use]
    pub fn new() -> Self {
        LoggerBuilder::new().build()
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use rust_log_pipeline::prelude::*;
    /// use std::sync::Arc;
    ///
    /// let logger = Logger::builder()
    ///     .name("api")
    ///     .min_level(LogLevel::Debug)
    ///     .label("service", "checkout")
    ///     .exporter(
    ///         StandardExporter::builder()
    ///             .encoder(JsonEncoder::new())
    ///             .sink(Arc::new(sinks::discard()))
    ///             .build(),
    ///     )
    ///     .build();
    ///
    /// logger.info("ready").unwrap();
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Stdout for Trace..=Warn, stderr for Error..=Fatal, rate-limited,
    /// synced every second
    pub fn standard() -> Result<Self> {
        let buffers = buffer_pool(DEFAULT_POOL_CAPACITY);
        let encoder = Arc::new(TextEncoder::new().with_colors(true));

        let stdout = StandardExporter::builder()
            .name("stdout")
            .span(LevelSpan::new(LogLevel::Trace, LogLevel::Warn))
            .shared_encoder(encoder.clone())
            .sink(Arc::new(sinks::stdout()))
            .buffer_pool(Arc::clone(&buffers))
            .build();
        let stderr = StandardExporter::builder()
            .name("stderr")
            .span(LevelSpan::new(LogLevel::Error, LogLevel::Fatal))
            .shared_encoder(encoder)
            .sink(Arc::new(sinks::stderr()))
            .buffer_pool(buffers)
            .build();

        Ok(Logger::builder()
            .sampler(RateLimitingSampler::new(SamplingConfig::default())?)
            .exporter(stdout)
            .exporter(stderr)
            .flush_interval(DEFAULT_FLUSH_INTERVAL)
            .build())
    }

    /// Builder pre-filled with this logger's settings
    ///
    /// Hooks, exporters, sampler and entry pool are shared with this logger;
    /// name, level and labels are copied and can be changed freely. The
    /// derived logger does not start its own flush thread unless asked to.
    ///
    /// ```
    /// use rust_log_pipeline::prelude::*;
    ///
    /// let base = Logger::builder().name("app").label("region", "eu").build();
    /// let db = base.derive().name("app.db").label("component", "db").build();
    ///
    /// assert_eq!(db.name(), "app.db");
    /// assert_eq!(db.labels().len(), 2);
    /// assert_eq!(base.labels().len(), 1);
    /// ```
    #[must_use]
    pub fn derive(&self) -> LoggerBuilder {
        LoggerBuilder {
            name: self.name.to_string(),
            min_level: self.min_level,
            labels: self.labels.to_vec(),
            sampler: self.sampler.clone(),
            hooks: self.hooks.clone(),
            exporters: self.exporters.iter().cloned().collect(),
            capture_source: self.capture_source,
            entry_pool: Some(Arc::clone(&self.entries)),
            flush_interval: Duration::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn exporter_count(&self) -> usize {
        self.exporters.len()
    }

    /// Pipeline counters for this logger
    ///
    /// # Example
    ///
    /// ```
    /// use rust_log_pipeline::Logger;
    ///
    /// let logger = Logger::new();
    /// let metrics = logger.metrics();
    /// println!("Logged: {}", metrics.total_logged());
    /// println!("Sampled out: {}", metrics.sampled_out());
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn entry_pool(&self) -> &Arc<ObjectPool<LogEntry>> {
        &self.entries
    }

    /// Log `message` at `level`, recording the caller as the source location
    #[track_caller]
    #[inline]
    pub fn log(&self, level: LogLevel, message: impl Into<Message>) -> Result<()> {
        if !self.accepts(level) {
            return Ok(());
        }
        let location = SourceLocation::from_location(Location::caller());
        self.output(level, message.into(), location)
    }

    /// Log with an explicit source location; used by the logging macros
    #[inline]
    pub fn log_at(
        &self,
        level: LogLevel,
        message: impl Into<Message>,
        location: SourceLocation,
    ) -> Result<()> {
        if !self.accepts(level) {
            return Ok(());
        }
        self.output(level, message.into(), location)
    }

    /// Whether a call at `level` would do any work
    #[inline]
    pub fn accepts(&self, level: LogLevel) -> bool {
        self.min_level.enables(level) && !self.exporters.is_empty()
    }

    fn output(&self, level: LogLevel, message: Message, location: SourceLocation) -> Result<()> {
        let mut entry = self.entries.acquire();
        entry.reset(level, message, &self.name, &self.labels);

        if let Some(sampler) = &self.sampler {
            if !sampler.sample(&entry) {
                self.metrics.record_sampled_out();
                self.entries.release(entry);
                return Ok(());
            }
        }

        if self.capture_source {
            entry.source_location = Some(location);
        }

        for hook in &self.hooks {
            if let Err(e) = hook.print(&mut entry) {
                self.metrics.record_hook_failure();
                self.entries.release(entry);
                return Err(e);
            }
        }

        for exporter in self.exporters.iter() {
            if let Err(e) = exporter.export(&entry) {
                self.metrics.record_export_failure();
                self.entries.release(entry);
                return Err(e);
            }
        }

        self.metrics.record_logged();
        self.entries.release(entry);
        Ok(())
    }

    #[track_caller]
    #[inline]
    pub fn trace(&self, message: impl Into<Message>) -> Result<()> {
        self.log(LogLevel::Trace, message)
    }

    #[track_caller]
    #[inline]
    pub fn debug(&self, message: impl Into<Message>) -> Result<()> {
        self.log(LogLevel::Debug, message)
    }

    #[track_caller]
    #[inline]
    pub fn info(&self, message: impl Into<Message>) -> Result<()> {
        self.log(LogLevel::Info, message)
    }

    #[track_caller]
    #[inline]
    pub fn warn(&self, message: impl Into<Message>) -> Result<()> {
        self.log(LogLevel::Warn, message)
    }

    #[track_caller]
    #[inline]
    pub fn error(&self, message: impl Into<Message>) -> Result<()> {
        self.log(LogLevel::Error, message)
    }

    #[track_caller]
    #[inline]
    pub fn fatal(&self, message: impl Into<Message>) -> Result<()> {
        self.log(LogLevel::Fatal, message)
    }

    /// Sync every exporter in order
    ///
    /// All exporters are attempted; the first error is returned.
    pub fn sync(&self) -> Result<()> {
        let mut first_err = None;
        for exporter in self.exporters.iter() {
            if let Err(e) = exporter.sync() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Stop the flush thread, then close hooks and exporters in order
    ///
    /// Exporters are shared with derived loggers and are closed for them too.
    /// Everything is attempted; the first error is returned.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut flusher) = self.flusher.take() {
            flusher.stop();
        }
        self.closed = true;

        let mut first_err = None;
        for hook in &self.hooks {
            if let Err(e) = hook.close() {
                first_err.get_or_insert(e);
            }
        }
        for exporter in self.exporters.iter() {
            if let Err(e) = exporter.close() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Some(mut flusher) = self.flusher.take() {
            flusher.stop();
        }
        if self.closed {
            return;
        }

        // Exporters may have been closed through a derived logger
        match self.sync() {
            Ok(()) | Err(LoggerError::SinkClosed) => {}
            Err(e) => eprintln!("[LOGGER ERROR] Failed to sync during shutdown: {}", e),
        }

        let failed = self.metrics.failed_count();
        if failed > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger '{}' shutting down after {} failed calls (failure rate: {:.2}%)",
                self.name,
                failed,
                self.metrics.failure_rate()
            );
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("min_level", &self.min_level)
            .field("labels", &self.labels.as_text())
            .field("sampled", &self.sampler.is_some())
            .field("hooks", &self.hooks.len())
            .field("exporters", &self.exporters.len())
            .field("capture_source", &self.capture_source)
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
pub struct LoggerBuilder {
    name: String,
    min_level: LogLevel,
    labels: Vec<Label>,
    sampler: Option<Arc<dyn Sampler>>,
    hooks: Vec<Arc<dyn Hook>>,
    exporters: Vec<Arc<dyn Exporter>>,
    capture_source: bool,
    entry_pool: Option<Arc<ObjectPool<LogEntry>>>,
    flush_interval: Duration,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            name: String::new(),
            min_level: LogLevel::Info,
            labels: Vec::new(),
            sampler: None,
            hooks: Vec::new(),
            exporters: Vec::new(),
            capture_source: false,
            entry_pool: None,
            flush_interval: Duration::ZERO,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Add a label; a later label with the same key replaces the earlier one
    #[must_use = "builder methods return a new value"]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let label = Label::new(key, value);
        match self.labels.iter_mut().find(|l| l.key == label.key) {
            Some(existing) => existing.value = label.value,
            None => self.labels.push(label),
        }
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn clear_labels(mut self) -> Self {
        self.labels.clear();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sampler<S: Sampler + 'static>(mut self, sampler: S) -> Self {
        self.sampler = Some(Arc::new(sampler));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shared_sampler(mut self, sampler: Option<Arc<dyn Sampler>>) -> Self {
        self.sampler = sampler;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn hook<H: Hook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shared_hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn clear_hooks(mut self) -> Self {
        self.hooks.clear();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn exporter<E: Exporter + 'static>(mut self, exporter: E) -> Self {
        self.exporters.push(Arc::new(exporter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shared_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn clear_exporters(mut self) -> Self {
        self.exporters.clear();
        self
    }

    /// Record the caller's file and line on every kept entry
    #[must_use = "builder methods return a new value"]
    pub fn capture_source(mut self, enabled: bool) -> Self {
        self.capture_source = enabled;
        self
    }

    /// Share an entry pool with other loggers
    #[must_use = "builder methods return a new value"]
    pub fn entry_pool(mut self, pool: Arc<ObjectPool<LogEntry>>) -> Self {
        self.entry_pool = Some(pool);
        self
    }

    /// Sync all exporters from a background thread on this interval
    ///
    /// Zero disables the thread. Shorter intervals are raised to
    /// [`MIN_FLUSH_INTERVAL`].
    #[must_use = "builder methods return a new value"]
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Build the Logger
    pub fn build(self) -> Logger {
        let exporters: Exporters = Arc::new(self.exporters);
        let flusher = if self.flush_interval.is_zero() || exporters.is_empty() {
            None
        } else {
            Flusher::spawn(Arc::clone(&exporters), self.flush_interval)
        };

        Logger {
            name: Arc::from(self.name),
            min_level: self.min_level,
            labels: Arc::new(Labels::new(self.labels)),
            sampler: self.sampler,
            hooks: self.hooks,
            exporters,
            capture_source: self.capture_source,
            entries: self
                .entry_pool
                .unwrap_or_else(|| Arc::new(ObjectPool::new(DEFAULT_POOL_CAPACITY))),
            metrics: Arc::new(LoggerMetrics::new()),
            flusher,
            closed: false,
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

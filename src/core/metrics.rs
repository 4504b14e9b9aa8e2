//! Logger metrics for observability
//!
//! Counters for what happened to each call that made it past the level gate.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-logger pipeline counters
///
/// # Example
///
/// ```
/// use rust_log_pipeline::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_logged();
/// metrics.record_sampled_out();
///
/// assert_eq!(metrics.total_logged(), 1);
/// assert_eq!(metrics.sampled_out(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Entries that reached every exporter
    total_logged: AtomicU64,

    /// Entries discarded by the sampler
    sampled_out: AtomicU64,

    /// Calls aborted by a hook error
    hook_failures: AtomicU64,

    /// Calls aborted by an exporter error
    export_failures: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            total_logged: AtomicU64::new(0),
            sampled_out: AtomicU64::new(0),
            hook_failures: AtomicU64::new(0),
            export_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sampled_out(&self) -> u64 {
        self.sampled_out.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn hook_failures(&self) -> u64 {
        self.hook_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn export_failures(&self) -> u64 {
        self.export_failures.load(Ordering::Relaxed)
    }

    /// Calls that did not reach every exporter because of an error
    #[inline]
    pub fn failed_count(&self) -> u64 {
        self.hook_failures() + self.export_failures()
    }

    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sampled_out(&self) -> u64 {
        self.sampled_out.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_hook_failure(&self) -> u64 {
        self.hook_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_export_failure(&self) -> u64 {
        self.export_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Percentage (0.0 - 100.0) of calls lost to hook or exporter errors
    ///
    /// Sampled-out entries are not failures and are not counted.
    pub fn failure_rate(&self) -> f64 {
        let failed = self.failed_count() as f64;
        let total = self.total_logged() as f64 + failed;
        if total == 0.0 {
            0.0
        } else {
            (failed / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.total_logged.store(0, Ordering::Relaxed);
        self.sampled_out.store(0, Ordering::Relaxed);
        self.hook_failures.store(0, Ordering::Relaxed);
        self.export_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            total_logged: AtomicU64::new(self.total_logged()),
            sampled_out: AtomicU64::new(self.sampled_out()),
            hook_failures: AtomicU64::new(self.hook_failures()),
            export_failures: AtomicU64::new(self.export_failures()),
        }
    }
}

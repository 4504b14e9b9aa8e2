//! Rate-limiting sampler for repeated messages
//!
//! The sampler caps the cost of a message that is logged over and over: within
//! each tick the first `first` occurrences pass, after that only every
//! `thereafter`-th occurrence passes. State is a fixed array of atomic bucket
//! counters indexed by a hash of the message text, so memory is bounded and no
//! lock is taken on the hot path.
//!
//! Distinct messages hashing to the same bucket share a budget. Raising
//! `buckets` lowers the chance of one noisy message suppressing another.
//!
//! # Example
//!
//! ```
//! use rust_log_pipeline::prelude::*;
//!
//! let sampler = RateLimitingSampler::new(
//!     SamplingConfig::default().with_first(10).with_thereafter(50),
//! )
//! .unwrap();
//!
//! let entry = LogEntry::new(LogLevel::Info, "cache miss");
//! assert!(sampler.sample(&entry));
//! ```

use super::error::{LoggerError, Result};
use super::log_entry::LogEntry;
use super::log_level::{LevelSpan, LogLevel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

const FNV_OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

/// Decides whether an entry is kept
pub trait Sampler: Send + Sync {
    /// Returns `false` when the entry should be discarded
    fn sample(&self, entry: &LogEntry) -> bool;
}

/// Configuration for [`RateLimitingSampler`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Levels subject to sampling; entries outside always pass
    pub span: LevelSpan,

    /// Length of one counting window
    pub tick: Duration,

    /// Occurrences per tick that always pass
    pub first: u64,

    /// After `first`, every `thereafter`-th occurrence passes
    ///
    /// Zero drops every occurrence past `first` until the next tick.
    pub thereafter: u64,

    /// Number of bucket counters
    pub buckets: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            span: LevelSpan::new(LogLevel::Info, LogLevel::Warn),
            tick: Duration::from_secs(1),
            first: 100,
            thereafter: 100,
            buckets: 1024,
        }
    }
}

impl SamplingConfig {
    #[must_use]
    pub fn with_span(mut self, span: LevelSpan) -> Self {
        self.span = span;
        self
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[must_use]
    pub fn with_first(mut self, first: u64) -> Self {
        self.first = first;
        self
    }

    #[must_use]
    pub fn with_thereafter(mut self, thereafter: u64) -> Self {
        self.thereafter = thereafter;
        self
    }

    #[must_use]
    pub fn with_buckets(mut self, buckets: usize) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.buckets == 0 {
            return Err(LoggerError::config("sampler", "bucket count must be non-zero"));
        }
        if self.tick.is_zero() {
            return Err(LoggerError::config("sampler", "tick must be non-zero"));
        }
        if self.span.start > self.span.end {
            return Err(LoggerError::config(
                "sampler",
                format!("empty level span {}", self.span),
            ));
        }
        Ok(())
    }
}

/// Metrics for sampling observability
#[derive(Debug)]
pub struct SamplerMetrics {
    sampled_count: AtomicU64,
    dropped_count: AtomicU64,
}

impl SamplerMetrics {
    pub const fn new() -> Self {
        Self {
            sampled_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
        }
    }

    /// Entries that passed the sampler
    #[inline]
    pub fn sampled_count(&self) -> u64 {
        self.sampled_count.load(Ordering::Relaxed)
    }

    /// Entries the sampler discarded
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_count(&self) -> u64 {
        self.sampled_count() + self.dropped_count()
    }

    #[inline]
    fn record(&self, sampled: bool) {
        if sampled {
            self.sampled_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.dropped_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns 1.0 if nothing has been sampled yet
    pub fn effective_sample_rate(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            1.0
        } else {
            self.sampled_count() as f64 / total as f64
        }
    }

    pub fn reset(&self) {
        self.sampled_count.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
    }
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SamplerMetrics {
    fn clone(&self) -> Self {
        Self {
            sampled_count: AtomicU64::new(self.sampled_count()),
            dropped_count: AtomicU64::new(self.dropped_count()),
        }
    }
}

/// One hash bucket
#[derive(Debug, Default)]
struct SampleCounter {
    count: AtomicU64,
    next_reset_at: AtomicI64,
}

impl SampleCounter {
    /// Count one occurrence at `now` and return the post-increment value
    ///
    /// Returns `None` when the call opened a new tick window. Such a call
    /// always passes and is not counted.
    fn incr(&self, now: i64, tick: i64) -> Option<u64> {
        let reset_at = self.next_reset_at.load(Ordering::Acquire);
        if reset_at <= now {
            // Concurrent resets race here; only the winner rewinds the count.
            if self
                .next_reset_at
                .compare_exchange(
                    reset_at,
                    now.saturating_add(tick),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                let count = self.count.load(Ordering::Acquire);
                if count > 0 {
                    // Relative adjustment keeps increments racing with the reset.
                    self.count.fetch_sub(count - 1, Ordering::AcqRel);
                }
            }
            return None;
        }

        Some(self.count.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

/// Lock-free sampler bounding repeated messages per tick
pub struct RateLimitingSampler {
    config: SamplingConfig,
    tick_nanos: i64,
    counters: Box<[SampleCounter]>,
    metrics: SamplerMetrics,
}

impl RateLimitingSampler {
    pub fn new(config: SamplingConfig) -> Result<Self> {
        config.validate()?;

        let tick_nanos = i64::try_from(config.tick.as_nanos()).unwrap_or(i64::MAX);
        let counters = (0..config.buckets)
            .map(|_| SampleCounter::default())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            config,
            tick_nanos,
            counters,
            metrics: SamplerMetrics::new(),
        })
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SamplerMetrics {
        &self.metrics
    }

    fn bucket(&self, text: &str) -> &SampleCounter {
        let index = fnv1a64(text.as_bytes()) % self.counters.len() as u64;
        &self.counters[index as usize]
    }

    fn admits(&self, count: u64) -> bool {
        if count <= self.config.first {
            return true;
        }
        match self.config.thereafter {
            0 => false,
            thereafter => (count - self.config.first) % thereafter == 0,
        }
    }
}

impl Sampler for RateLimitingSampler {
    fn sample(&self, entry: &LogEntry) -> bool {
        if !self.config.span.contains(entry.level) {
            return true;
        }

        let Some(text) = entry.message.sample_text() else {
            return true;
        };

        let sampled = match self.bucket(text).incr(entry.unix_nanos(), self.tick_nanos) {
            None => true,
            Some(count) => self.admits(count),
        };

        self.metrics.record(sampled);
        sampled
    }
}

impl fmt::Debug for RateLimitingSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitingSampler")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// 64-bit FNV-1a hash
pub(crate) fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

//! Lock-free object pool for hot-path allocations
//!
//! Log entries and exporter byte buffers are recycled through an
//! [`ObjectPool`] so that a steady stream of log calls does not allocate.
//! The free list is a bounded lock-free ring; when it is empty a fresh value
//! is built by the pool's factory, and when it is full a released value is
//! simply dropped.
//!
//! # Reuse contract
//!
//! Values come back **dirty**: a reused value still holds whatever its
//! previous user left in it. Callers must overwrite every field they read.
//! [`ObjectPool::release`] takes the value by move, so a released value can
//! not be touched again by the code that released it.
//!
//! # Example
//!
//! ```
//! use rust_log_pipeline::core::ObjectPool;
//!
//! let pool: ObjectPool<Vec<u8>> = ObjectPool::new(16);
//!
//! let mut buffer = pool.get();
//! buffer.clear();
//! buffer.extend_from_slice(b"encoded entry");
//! // returned to the pool when `buffer` goes out of scope
//! ```

use crossbeam_queue::ArrayQueue;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of idle values a pool keeps around
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Metrics for pool monitoring
#[derive(Debug, Default)]
pub struct PoolMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    returns: AtomicU64,
    drops: AtomicU64,
}

impl PoolMetrics {
    pub const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            returns: AtomicU64::new(0),
            drops: AtomicU64::new(0),
        }
    }

    /// Values handed out from the free list
    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Values built fresh because the free list was empty
    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Values put back on the free list
    #[inline]
    pub fn returns(&self) -> u64 {
        self.returns.load(Ordering::Relaxed)
    }

    /// Values dropped because the free list was full
    #[inline]
    pub fn drops(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            1.0
        } else {
            hits as f64 / total as f64
        }
    }
}

pub struct ObjectPool<T> {
    queue: ArrayQueue<T>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    metrics: PoolMetrics,
}

impl<T: Default + 'static> ObjectPool<T> {
    /// Create a pool that keeps at most `capacity` idle values
    ///
    /// Fresh values are built with `T::default()`. A capacity of zero is
    /// raised to one.
    pub fn new(capacity: usize) -> Self {
        Self::with_factory(capacity, T::default)
    }
}

impl<T> ObjectPool<T> {
    pub fn with_factory<F>(capacity: usize, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            factory: Box::new(factory),
            metrics: PoolMetrics::new(),
        }
    }

    /// Fill the free list with up to `count` fresh values
    pub fn prefill(&self, count: usize) {
        for _ in 0..count {
            if self.queue.push((self.factory)()).is_err() {
                break;
            }
        }
    }

    /// Take a value out of the pool
    ///
    /// The value may be dirty; see the module documentation.
    #[inline]
    pub fn acquire(&self) -> T {
        match self.queue.pop() {
            Some(value) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                value
            }
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                (self.factory)()
            }
        }
    }

    /// Hand a value back to the pool
    #[inline]
    pub fn release(&self, value: T) {
        match self.queue.push(value) {
            Ok(()) => {
                self.metrics.returns.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.metrics.drops.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Take a value wrapped in a guard that releases it on drop
    #[inline]
    pub fn get(&self) -> Pooled<'_, T> {
        Pooled {
            pool: self,
            value: Some(self.acquire()),
        }
    }

    /// Number of idle values currently held
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}

impl<T: Default + 'static> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("available", &self.available())
            .field("capacity", &self.capacity())
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// A pooled value that returns to its pool when dropped
pub struct Pooled<'a, T> {
    pool: &'a ObjectPool<T>,
    value: Option<T>,
}

impl<T> Pooled<'_, T> {
    /// Detach the value from the pool
    pub fn into_inner(mut self) -> T {
        // `value` is only `None` after this call or inside `drop`
        match self.value.take() {
            Some(value) => value,
            None => unreachable!("pooled value already taken"),
        }
    }
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.value {
            Some(value) => value,
            None => unreachable!("pooled value already taken"),
        }
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable!("pooled value already taken"),
        }
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.release(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_acquire_builds_when_empty() {
        let pool: ObjectPool<Vec<u8>> = ObjectPool::new(4);
        let buffer = pool.acquire();
        assert!(buffer.is_empty());
        assert_eq!(pool.metrics().misses(), 1);
        assert_eq!(pool.metrics().hits(), 0);
    }

    #[test]
    fn test_released_values_are_reused_dirty() {
        let pool: ObjectPool<Vec<u8>> = ObjectPool::new(4);

        let mut buffer = pool.acquire();
        buffer.extend_from_slice(b"left over");
        pool.release(buffer);

        let reused = pool.acquire();
        assert_eq!(reused, b"left over");
        assert_eq!(pool.metrics().hits(), 1);
    }

    #[test]
    fn test_release_into_full_pool_drops() {
        let pool: ObjectPool<u32> = ObjectPool::new(1);
        pool.release(1);
        pool.release(2);

        assert_eq!(pool.available(), 1);
        assert_eq!(pool.metrics().returns(), 1);
        assert_eq!(pool.metrics().drops(), 1);
    }

    #[test]
    fn test_guard_returns_on_drop() {
        let pool = ObjectPool::with_factory(2, || String::with_capacity(64));
        {
            let mut text = pool.get();
            text.push_str("entry");
        }
        assert_eq!(pool.available(), 1);

        let detached = pool.get().into_inner();
        assert_eq!(detached, "entry");
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_default_pool() {
        let pool: ObjectPool<String> = ObjectPool::default();
        assert_eq!(pool.capacity(), DEFAULT_POOL_CAPACITY);
        assert!(pool.acquire().is_empty());
    }

    #[test]
    fn test_prefill() {
        let pool: ObjectPool<u64> = ObjectPool::new(8);
        pool.prefill(100);
        assert_eq!(pool.available(), 8);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool: Arc<ObjectPool<Vec<u8>>> = Arc::new(ObjectPool::new(16));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for i in 0..5_000 {
                        let mut buffer = pool.acquire();
                        buffer.clear();
                        buffer.push(worker);
                        buffer.push((i % 256) as u8);
                        assert_eq!(buffer.len(), 2);
                        pool.release(buffer);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker panicked");
        }

        let metrics = pool.metrics();
        assert_eq!(metrics.hits() + metrics.misses(), 40_000);
        assert_eq!(metrics.returns() + metrics.drops(), 40_000);
        assert!(pool.available() <= 16);
    }
}

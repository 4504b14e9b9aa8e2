//! Write-coalescing sink over any [`Destination`]
//!
//! Writes append to an in-memory cache under a spinning lock. When an append
//! would bring the cache to its capacity, the cache is flushed to the
//! destination first. `sync` and `close` hold the lock in suspended mode so
//! writers blocked behind a slow flush park instead of spinning.
//!
//! # Example
//!
//! ```
//! use rust_log_pipeline::core::Sink;
//! use rust_log_pipeline::sinks::{BufferedSink, SinkConfig};
//!
//! let sink = BufferedSink::new(Vec::<u8>::new(), SinkConfig::default().with_capacity(4096));
//! sink.write(b"hello\n").unwrap();
//! assert_eq!(sink.buffered_len().unwrap(), 6);
//! sink.sync().unwrap();
//! assert_eq!(sink.buffered_len().unwrap(), 0);
//! ```

use crate::core::error::{LoggerError, Result};
use crate::core::lock::SuspendMutex;
use crate::core::sink::{Destination, Sink};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::thread;

/// Smallest cache a sink will run with
pub const MIN_CAPACITY: usize = 1024;

/// Cache bytes per available CPU in the default configuration
pub const CAPACITY_PER_CPU: usize = 32 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Cache size in bytes; 0 writes straight through
    pub capacity: usize,

    /// Declare the sink single-writer or externally synchronized
    ///
    /// A lock-disabled sink never spins or parks; a call that finds another
    /// caller inside fails with [`LoggerError::SinkContended`].
    pub disable_lock: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        let cpus = thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            capacity: CAPACITY_PER_CPU * cpus,
            disable_lock: false,
        }
    }
}

impl SinkConfig {
    /// Pass-through configuration with no cache
    pub fn unbuffered() -> Self {
        Self {
            capacity: 0,
            disable_lock: false,
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_lock_disabled(mut self, disable_lock: bool) -> Self {
        self.disable_lock = disable_lock;
        self
    }

    /// Capacity the sink will actually use
    pub fn effective_capacity(&self) -> usize {
        match self.capacity {
            0 => 0,
            n => n.max(MIN_CAPACITY),
        }
    }
}

pub(super) struct SinkState<D> {
    cache: Option<Vec<u8>>,
    /// `None` once the sink is closed
    destination: Option<D>,
}

impl<D: Destination> SinkState<D> {
    fn destination(&mut self) -> Result<&mut D> {
        self.destination.as_mut().ok_or(LoggerError::SinkClosed)
    }

    fn write(&mut self, bytes: &[u8], capacity: usize) -> Result<usize> {
        let Self { cache, destination } = self;
        let destination = destination.as_mut().ok_or(LoggerError::SinkClosed)?;

        match cache {
            Some(cache) => {
                if cache.len() + bytes.len() >= capacity {
                    flush_cache(cache, destination)?;
                }
                cache.extend_from_slice(bytes);
            }
            None => destination.write_all(bytes)?,
        }
        Ok(bytes.len())
    }

    fn flush(&mut self) -> Result<()> {
        let Self { cache, destination } = self;
        let destination = destination.as_mut().ok_or(LoggerError::SinkClosed)?;

        if let Some(cache) = cache {
            flush_cache(cache, destination)?;
        }
        destination.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.flush()?;
        self.destination()?.sync_durable()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Err(err) = self.sync() {
            if matches!(err, LoggerError::SinkClosed) {
                return Err(err);
            }
            eprintln!("[LOGGER WARNING] Sync before close failed: {}", err);
        }

        let mut destination = self.destination.take().ok_or(LoggerError::SinkClosed)?;
        destination.shutdown()?;
        Ok(())
    }
}

/// Write the cache out; on failure keep the unwritten tail for the next flush
fn flush_cache<D: Write + ?Sized>(cache: &mut Vec<u8>, destination: &mut D) -> Result<()> {
    let mut written = 0;
    let result = loop {
        if written == cache.len() {
            break Ok(());
        }
        match destination.write(&cache[written..]) {
            Ok(0) => {
                break Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "destination accepted no bytes",
                ))
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => break Err(err),
        }
    };

    cache.drain(..written);
    result.map_err(LoggerError::from)
}

/// Buffered, lock-protected sink
pub struct BufferedSink<D: Destination> {
    pub(super) state: SuspendMutex<SinkState<D>>,
    capacity: usize,
    lock_disabled: bool,
}

impl<D: Destination> BufferedSink<D> {
    pub fn new(destination: D, config: SinkConfig) -> Self {
        let capacity = config.effective_capacity();
        let cache = (capacity > 0).then(|| Vec::with_capacity(capacity));

        Self {
            state: SuspendMutex::new(SinkState {
                cache,
                destination: Some(destination),
            }),
            capacity,
            lock_disabled: config.disable_lock,
        }
    }

    /// Cache capacity in bytes; 0 when writes pass straight through
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_lock_disabled(&self) -> bool {
        self.lock_disabled
    }

    /// Bytes accepted but not yet written to the destination
    pub fn buffered_len(&self) -> Result<usize> {
        self.with_state(|state| Ok(state.cache.as_ref().map_or(0, Vec::len)))
    }

    /// Swap in a new destination, returning the old one
    ///
    /// Cached bytes stay in the cache and go to the new destination on the
    /// next flush. This waits for the lock even on a lock-disabled sink: the
    /// swap comes from inside the library (reconnects), not from the caller
    /// that promised single-writer use.
    pub fn replace_destination(&self, destination: D) -> Result<D> {
        let mut state = self.state.lock_suspended();
        let old = state.destination.as_mut().ok_or(LoggerError::SinkClosed)?;
        Ok(std::mem::replace(old, destination))
    }

    /// Run `f` under the short-hold lock
    fn with_state<R>(&self, f: impl FnOnce(&mut SinkState<D>) -> Result<R>) -> Result<R> {
        if self.lock_disabled {
            let mut guard = self.state.try_lock().ok_or(LoggerError::SinkContended)?;
            return f(&mut *guard);
        }
        let mut guard = self.state.lock();
        f(&mut *guard)
    }

    /// Run `f` holding the lock in suspended mode
    fn with_suspended<R>(&self, f: impl FnOnce(&mut SinkState<D>) -> Result<R>) -> Result<R> {
        if self.lock_disabled {
            let mut guard = self.state.try_lock().ok_or(LoggerError::SinkContended)?;
            return f(&mut *guard);
        }
        let mut guard = self.state.lock_suspended();
        f(&mut *guard)
    }
}

impl<D: Destination> Sink for BufferedSink<D> {
    fn write(&self, bytes: &[u8]) -> Result<usize> {
        let capacity = self.capacity;
        self.with_state(|state| state.write(bytes, capacity))
    }

    fn sync(&self) -> Result<()> {
        self.with_suspended(SinkState::sync)
    }

    fn close(&self) -> Result<()> {
        self.with_suspended(SinkState::close)
    }
}

impl<D: Destination> Drop for BufferedSink<D> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.destination.is_none() {
            return;
        }
        // Best effort; the destination itself is released by its own Drop.
        if let Err(err) = state.flush() {
            eprintln!("[LOGGER ERROR] Failed to flush sink on drop: {}", err);
        }
    }
}

impl<D: Destination> fmt::Debug for BufferedSink<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedSink")
            .field("capacity", &self.capacity)
            .field("lock_disabled", &self.lock_disabled)
            .field("lock", &self.state.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// In-memory device that counts writes and can run out of budget
    #[derive(Clone, Default)]
    struct Device {
        data: Arc<Mutex<Vec<u8>>>,
        writes: Arc<AtomicUsize>,
        budget: Arc<Mutex<Option<usize>>>,
        synced: Arc<AtomicUsize>,
    }

    impl Device {
        fn contents(&self) -> Vec<u8> {
            self.data.lock().clone()
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn set_budget(&self, budget: Option<usize>) {
            *self.budget.lock() = budget;
        }
    }

    impl Write for Device {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut budget = self.budget.lock();
            let n = match *budget {
                Some(0) => return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device full")),
                Some(remaining) => {
                    let n = remaining.min(buf.len());
                    *budget = Some(remaining - n);
                    n
                }
                None => buf.len(),
            };
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.data.lock().extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Destination for Device {
        fn sync_durable(&mut self) -> io::Result<()> {
            self.synced.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(capacity: usize) -> SinkConfig {
        SinkConfig::default().with_capacity(capacity)
    }

    #[test]
    fn test_capacity_validation() {
        assert_eq!(config(0).effective_capacity(), 0);
        assert_eq!(config(1).effective_capacity(), MIN_CAPACITY);
        assert_eq!(config(1023).effective_capacity(), MIN_CAPACITY);
        assert_eq!(config(4096).effective_capacity(), 4096);

        let sink = BufferedSink::new(Device::default(), config(10));
        assert_eq!(sink.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn test_default_capacity_scales_with_cpus() {
        let capacity = SinkConfig::default().capacity;
        assert!(capacity >= CAPACITY_PER_CPU);
        assert_eq!(capacity % CAPACITY_PER_CPU, 0);
    }

    #[test]
    fn test_writes_below_capacity_stay_cached_until_sync() {
        let device = Device::default();
        let sink = BufferedSink::new(device.clone(), config(1024));

        for _ in 0..10 {
            assert_eq!(sink.write(&[b'a'; 50]).unwrap(), 50);
        }
        assert_eq!(device.writes(), 0);
        assert_eq!(sink.buffered_len().unwrap(), 500);

        sink.sync().unwrap();
        assert_eq!(device.contents(), vec![b'a'; 500]);
        assert_eq!(device.synced.load(Ordering::SeqCst), 1);
        assert_eq!(sink.buffered_len().unwrap(), 0);
    }

    #[test]
    fn test_reaching_capacity_flushes_before_append() {
        let device = Device::default();
        let sink = BufferedSink::new(device.clone(), config(1024));

        sink.write(&[b'a'; 1000]).unwrap();
        assert_eq!(device.writes(), 0);

        sink.write(&[b'b'; 24]).unwrap();
        assert_eq!(device.contents(), vec![b'a'; 1000]);
        assert_eq!(sink.buffered_len().unwrap(), 24);
    }

    #[test]
    fn test_unbuffered_writes_through() {
        let device = Device::default();
        let sink = BufferedSink::new(device.clone(), SinkConfig::unbuffered());

        sink.write(b"direct").unwrap();
        assert_eq!(device.contents(), b"direct");
        assert_eq!(sink.buffered_len().unwrap(), 0);
    }

    #[test]
    fn test_partial_flush_keeps_remainder() {
        let device = Device::default();
        let sink = BufferedSink::new(device.clone(), config(1024));

        let first: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        sink.write(&first).unwrap();

        device.set_budget(Some(300));
        let err = sink.write(&[b'z'; 100]).unwrap_err();
        assert!(err.is_connection_closed());

        // 300 bytes made it out; the rest is still cached, the new bytes are not
        assert_eq!(device.contents(), first[..300].to_vec());
        assert_eq!(sink.buffered_len().unwrap(), 700);

        device.set_budget(None);
        sink.sync().unwrap();
        assert_eq!(device.contents(), first);
    }

    #[test]
    fn test_close_flushes_everything_then_rejects_use() {
        let device = Device::default();
        let sink = BufferedSink::new(device.clone(), config(64 * 1024));

        for i in 0..100 {
            sink.write(format!("line {}\n", i).as_bytes()).unwrap();
        }
        sink.close().unwrap();

        let text = String::from_utf8(device.contents()).unwrap();
        assert_eq!(text.lines().count(), 100);
        assert!(text.ends_with("line 99\n"));

        assert!(matches!(sink.write(b"late"), Err(LoggerError::SinkClosed)));
        assert!(matches!(sink.sync(), Err(LoggerError::SinkClosed)));
        assert!(matches!(sink.close(), Err(LoggerError::SinkClosed)));
    }

    #[test]
    fn test_drop_flushes_cache() {
        let device = Device::default();
        {
            let sink = BufferedSink::new(device.clone(), config(4096));
            sink.write(b"pending").unwrap();
        }
        assert_eq!(device.contents(), b"pending");
    }

    #[test]
    fn test_lock_disabled_reports_contention() {
        let sink = BufferedSink::new(
            Device::default(),
            config(4096).with_lock_disabled(true),
        );
        assert!(sink.is_lock_disabled());
        sink.write(b"single writer").unwrap();

        let _held = sink.state.lock();
        assert!(matches!(sink.write(b"x"), Err(LoggerError::SinkContended)));
        assert!(matches!(sink.sync(), Err(LoggerError::SinkContended)));
    }

    #[test]
    fn test_replace_destination_keeps_cache() {
        let old = Device::default();
        let new = Device::default();
        let sink = BufferedSink::new(old.clone(), config(4096));

        sink.write(b"carried over").unwrap();
        let _previous = sink.replace_destination(new.clone()).unwrap();
        sink.sync().unwrap();

        assert!(old.contents().is_empty());
        assert_eq!(new.contents(), b"carried over");
    }

    #[test]
    fn test_replace_destination_waits_on_lock_disabled_sink() {
        let old = Device::default();
        let new = Device::default();
        let sink = BufferedSink::new(old.clone(), config(0).with_lock_disabled(true));

        let held = sink.state.lock();
        std::thread::scope(|scope| {
            let swap = scope.spawn(|| sink.replace_destination(new.clone()));
            std::thread::sleep(Duration::from_millis(50));
            assert!(!swap.is_finished());

            drop(held);
            assert!(swap.join().expect("swap panicked").is_ok());
        });

        sink.write(b"to new").unwrap();
        assert!(old.contents().is_empty());
        assert_eq!(new.contents(), b"to new");
    }

    #[test]
    fn test_concurrent_writers_lose_nothing() {
        let device = Device::default();
        let sink = Arc::new(BufferedSink::new(device.clone(), config(4096)));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        let line = format!("w{:02} {:06}\n", worker, i);
                        sink.write(line.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer panicked");
        }
        sink.close().unwrap();

        let text = String::from_utf8(device.contents()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8000);
        assert!(lines.iter().all(|line| line.len() == 10));
    }
}

//! Spin lock with a cooperative suspend mode
//!
//! Appending to a sink cache takes nanoseconds, so writers acquire the lock by
//! spinning on a compare-and-swap and never touch the scheduler in the common
//! case. Flushing and closing hold the lock for the duration of an IO call;
//! they take it in *suspended* mode instead, and contenders that notice a
//! suspended holder park on a condition variable until the holder resumes
//! them rather than burning CPU.
//!
//! Two layers are provided:
//!
//! - [`RawSuspendLock`]: the bare state machine (`try_lock`, `lock`, `unlock`,
//!   `lock_and_suspend`, `unlock_and_resume`).
//! - [`SuspendMutex<T>`]: owns the protected value and hands out RAII guards.
//!
//! There is no timeout or fairness: callers that need a bounded wait must
//! build it on top.
//!
//! # Example
//!
//! ```
//! use rust_log_pipeline::core::SuspendMutex;
//!
//! let cache = SuspendMutex::new(Vec::<u8>::new());
//!
//! cache.lock().extend_from_slice(b"hello");
//!
//! {
//!     // Slow work: other threads park instead of spinning
//!     let mut cache = cache.lock_suspended();
//!     cache.clear();
//! }
//!
//! assert!(cache.lock().is_empty());
//! ```

use parking_lot::{Condvar, Mutex};
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

const UNLOCKED: u8 = 0;
const LOCKED: u8 = 1;
const SUSPENDED: u8 = 2;

/// Failed attempts between two scheduler yields (or parks)
const YIELD_INTERVAL: u32 = 100;

/// Failed attempts after which every yield round also sleeps
const BACKOFF_THRESHOLD: u32 = 10_000;

const BACKOFF_SLEEP: Duration = Duration::from_millis(10);

/// Observable state of a [`RawSuspendLock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
    Suspended,
}

pub struct RawSuspendLock {
    state: AtomicU8,
    waiters: Mutex<()>,
    resumed: Condvar,
}

impl RawSuspendLock {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(UNLOCKED),
            waiters: Mutex::new(()),
            resumed: Condvar::new(),
        }
    }

    /// Take the lock if it is free, without waiting
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Block until the lock is acquired in plain mode
    #[inline]
    pub fn lock(&self) {
        if !self.try_lock() {
            self.acquire_slow(LOCKED);
        }
    }

    /// Release a lock taken with [`lock`](Self::lock) or [`try_lock`](Self::try_lock)
    ///
    /// A single store; parked waiters are not woken since they only park
    /// opposite a suspended holder.
    #[inline]
    pub fn unlock(&self) {
        debug_assert_eq!(self.state.load(Ordering::Relaxed), LOCKED);
        self.state.store(UNLOCKED, Ordering::Release);
    }

    /// Block until the lock is acquired in suspended mode
    pub fn lock_and_suspend(&self) {
        if self
            .state
            .compare_exchange(UNLOCKED, SUSPENDED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.acquire_slow(SUSPENDED);
        }
    }

    /// Release a suspended lock and wake every parked waiter
    pub fn unlock_and_resume(&self) {
        let _waiters = self.waiters.lock();

        if self
            .state
            .compare_exchange(SUSPENDED, UNLOCKED, Ordering::Release, Ordering::Relaxed)
            .is_ok()
        {
            self.resumed.notify_all();
        }
    }

    pub fn state(&self) -> LockState {
        match self.state.load(Ordering::Acquire) {
            UNLOCKED => LockState::Unlocked,
            LOCKED => LockState::Locked,
            _ => LockState::Suspended,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.state() != LockState::Unlocked
    }

    #[cold]
    fn acquire_slow(&self, target: u8) {
        let mut attempts: u32 = 1;

        loop {
            if self
                .state
                .compare_exchange_weak(UNLOCKED, target, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }

            attempts = attempts.saturating_add(1);

            if attempts % YIELD_INTERVAL != 0 {
                std::hint::spin_loop();
                continue;
            }

            if self.state.load(Ordering::Acquire) == SUSPENDED {
                self.park();
            } else {
                thread::yield_now();
            }

            if attempts >= BACKOFF_THRESHOLD {
                thread::sleep(BACKOFF_SLEEP);
            }
        }
    }

    /// Wait for the suspended holder to resume
    ///
    /// The state is re-checked under the waiter mutex, which
    /// `unlock_and_resume` also holds while releasing, so a wakeup cannot
    /// slip in between the check and the wait.
    fn park(&self) {
        let mut waiters = self.waiters.lock();

        if self.state.load(Ordering::Acquire) == SUSPENDED {
            self.resumed.wait(&mut waiters);
        }
    }
}

impl Default for RawSuspendLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawSuspendLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSuspendLock")
            .field("state", &self.state())
            .finish()
    }
}

/// A value protected by a [`RawSuspendLock`]
pub struct SuspendMutex<T> {
    raw: RawSuspendLock,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is serialized by `raw`; guards are the only way in.
unsafe impl<T: Send> Send for SuspendMutex<T> {}
unsafe impl<T: Send> Sync for SuspendMutex<T> {}

impl<T> SuspendMutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            raw: RawSuspendLock::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Spin until the lock is held; for short critical sections
    pub fn lock(&self) -> SuspendMutexGuard<'_, T> {
        self.raw.lock();
        SuspendMutexGuard { mutex: self }
    }

    pub fn try_lock(&self) -> Option<SuspendMutexGuard<'_, T>> {
        if self.raw.try_lock() {
            Some(SuspendMutexGuard { mutex: self })
        } else {
            None
        }
    }

    /// Acquire in suspended mode; for IO-bound critical sections
    pub fn lock_suspended(&self) -> SuspendedGuard<'_, T> {
        self.raw.lock_and_suspend();
        SuspendedGuard { mutex: self }
    }

    pub fn state(&self) -> LockState {
        self.raw.state()
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for SuspendMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for SuspendMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendMutex")
            .field("state", &self.raw.state())
            .finish_non_exhaustive()
    }
}

/// Guard for a plain (spinning) acquisition
pub struct SuspendMutexGuard<'a, T> {
    mutex: &'a SuspendMutex<T>,
}

impl<T> Deref for SuspendMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves the lock is held.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for SuspendMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves the lock is held exclusively.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for SuspendMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.raw.unlock();
    }
}

/// Guard for a suspended acquisition; dropping it resumes parked waiters
pub struct SuspendedGuard<'a, T> {
    mutex: &'a SuspendMutex<T>,
}

impl<T> Deref for SuspendedGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves the lock is held.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for SuspendedGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves the lock is held exclusively.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for SuspendedGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.raw.unlock_and_resume();
    }
}

//! Hooks run on every kept entry before it is exported

use super::{error::Result, log_entry::LogEntry};
use std::fmt;

/// Per-entry interceptor
///
/// Hooks run in registration order and may rewrite the entry in place.
/// Returning an error aborts the call: later hooks and every exporter are
/// skipped for that entry.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::core::{Hook, LogEntry, LogLevel, LoggerError, Result};
///
/// struct RejectFatal;
///
/// impl Hook for RejectFatal {
///     fn print(&self, entry: &mut LogEntry) -> Result<()> {
///         if entry.level == LogLevel::Fatal {
///             return Err(LoggerError::hook(self.name(), "fatal entries are disabled"));
///         }
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "reject_fatal"
///     }
/// }
/// ```
pub trait Hook: Send + Sync {
    fn print(&self, entry: &mut LogEntry) -> Result<()>;

    fn name(&self) -> &str {
        "hook"
    }

    /// Called once when the owning logger closes
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Adapts a closure into a [`Hook`]
pub struct FnHook<F> {
    name: String,
    func: F,
}

impl<F> FnHook<F>
where
    F: Fn(&mut LogEntry) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Hook for FnHook<F>
where
    F: Fn(&mut LogEntry) -> Result<()> + Send + Sync,
{
    fn print(&self, entry: &mut LogEntry) -> Result<()> {
        (self.func)(entry)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnHook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHook").field("name", &self.name).finish()
    }
}

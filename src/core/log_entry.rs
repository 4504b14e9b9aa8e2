//! Log entry structure
//!
//! Entries are recycled through an [`ObjectPool`](super::pool::ObjectPool).
//! A pooled entry comes back dirty: every field still holds whatever the
//! previous call left there, so [`LogEntry::reset`] (or overwriting each field)
//! must happen before the entry is read.

use super::label::Labels;
use super::log_level::LogLevel;
use super::message::Message;
use chrono::{DateTime, Utc};
use std::fmt;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

/// Call site of a log call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
    /// Enclosing module, when the call came through one of the log macros
    pub module_path: Option<&'static str>,
}

impl SourceLocation {
    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
            module_path: None,
        }
    }

    #[must_use]
    pub fn with_module_path(mut self, module_path: &'static str) -> Self {
        self.module_path = Some(module_path);
        self
    }

    /// File name without its directory
    pub fn file_name(&self) -> &str {
        Path::new(self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.file)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_name(), self.line)
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: Message,
    pub timestamp: DateTime<Utc>,
    /// Name of the logger that produced the entry
    pub name: Arc<str>,
    pub source_location: Option<SourceLocation>,
    pub labels: Arc<Labels>,
}

impl Default for LogEntry {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            message: Message::default(),
            timestamp: DateTime::<Utc>::default(),
            name: Arc::from(""),
            source_location: None,
            labels: Arc::new(Labels::empty()),
        }
    }
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<Message>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            ..Self::default()
        }
    }

    /// Overwrite every field of a (possibly dirty) pooled entry
    pub fn reset(
        &mut self,
        level: LogLevel,
        message: Message,
        name: &Arc<str>,
        labels: &Arc<Labels>,
    ) {
        self.level = level;
        self.message = message;
        self.timestamp = Utc::now();
        self.name = Arc::clone(name);
        self.source_location = None;
        self.labels = Arc::clone(labels);
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Arc::from(name);
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.source_location = Some(location);
        self
    }

    #[must_use]
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = Arc::new(labels);
        self
    }

    /// Timestamp as nanoseconds since the Unix epoch, saturating
    pub fn unix_nanos(&self) -> i64 {
        self.timestamp.timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::label::Label;

    #[test]
    fn test_reset_overwrites_dirty_entry() {
        let mut entry = LogEntry::new(LogLevel::Error, "old")
            .with_name("old-logger")
            .with_location(SourceLocation::from_location(Location::caller()));

        let name: Arc<str> = Arc::from("api");
        let labels = Arc::new(Labels::new(vec![Label::new("env", "test")]));
        entry.reset(LogLevel::Info, Message::from("new"), &name, &labels);

        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.message, Message::from("new"));
        assert_eq!(&*entry.name, "api");
        assert!(entry.source_location.is_none());
        assert_eq!(entry.labels.get("env"), Some("test"));
    }

    #[test]
    fn test_source_location_display() {
        let location = SourceLocation {
            file: "src/handlers/user.rs",
            line: 42,
            column: 9,
            module_path: None,
        }
        .with_module_path("app::handlers::user");

        assert_eq!(location.to_string(), "user.rs:42");
        assert_eq!(location.module_path, Some("app::handlers::user"));
    }

    #[test]
    fn test_unix_nanos() {
        let entry = LogEntry::default();
        assert_eq!(entry.unix_nanos(), 0);
    }
}

//! Timestamp rendering for encoders
//!
//! Encoders append timestamps straight into their output buffer, so the
//! formatting entry point is [`TimestampFormat::write_to`] rather than a
//! `String`-returning helper.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Timestamp format options
///
/// ```
/// use rust_log_pipeline::core::TimestampFormat;
/// use chrono::Utc;
///
/// let mut out = String::new();
/// TimestampFormat::Iso8601.write_to(&mut out, &Utc::now());
/// assert!(out.ends_with('Z'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,

    /// `2025-01-08T10:30:45.123456Z`
    Iso8601Micros,

    /// `2025-01-08T10:30:45.123456789Z`
    Iso8601Nanos,

    /// Seconds since the Unix epoch
    Unix,

    /// Milliseconds since the Unix epoch
    UnixMillis,

    /// Nanoseconds since the Unix epoch
    UnixNanos,

    /// Any strftime-compatible format string
    Custom(String),
}

impl TimestampFormat {
    /// Append the formatted timestamp to `out`
    pub fn write_to(&self, out: &mut String, datetime: &DateTime<Utc>) {
        match self {
            TimestampFormat::Iso8601 => {
                out.push_str(&datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            TimestampFormat::Iso8601Micros => {
                out.push_str(&datetime.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            TimestampFormat::Iso8601Nanos => {
                out.push_str(&datetime.to_rfc3339_opts(SecondsFormat::Nanos, true))
            }
            TimestampFormat::Unix => {
                let _ = write!(out, "{}", datetime.timestamp());
            }
            TimestampFormat::UnixMillis => {
                let _ = write!(out, "{}", datetime.timestamp_millis());
            }
            TimestampFormat::UnixNanos => {
                let _ = write!(out, "{}", datetime.timestamp_nanos_opt().unwrap_or(i64::MAX));
            }
            TimestampFormat::Custom(format_str) => {
                let _ = write!(out, "{}", datetime.format(format_str));
            }
        }
    }

    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        let mut out = String::with_capacity(32);
        self.write_to(&mut out, datetime);
        out
    }

    /// JSON form: numbers for the Unix formats, strings otherwise
    #[must_use]
    pub fn to_json_value(&self, datetime: &DateTime<Utc>) -> serde_json::Value {
        match self {
            TimestampFormat::Unix => datetime.timestamp().into(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().into(),
            TimestampFormat::UnixNanos => datetime.timestamp_nanos_opt().unwrap_or(i64::MAX).into(),
            _ => serde_json::Value::String(self.format(datetime)),
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TimestampFormat::Unix | TimestampFormat::UnixMillis | TimestampFormat::UnixNanos
        )
    }
}

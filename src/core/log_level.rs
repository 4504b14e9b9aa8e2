//! Log level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Whether a call at `level` passes a logger whose minimum is `self`
    #[inline]
    pub fn enables(&self, level: LogLevel) -> bool {
        *self <= level
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Trace => BrightBlack,
            LogLevel::Debug => Blue,
            LogLevel::Info => Green,
            LogLevel::Warn => Yellow,
            LogLevel::Error => Red,
            LogLevel::Fatal => BrightRed,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

/// Inclusive range of levels
///
/// Exporters only accept entries inside their span, and the rate-limiting
/// sampler only applies to entries inside its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSpan {
    pub start: LogLevel,
    pub end: LogLevel,
}

impl LevelSpan {
    pub const fn new(start: LogLevel, end: LogLevel) -> Self {
        Self { start, end }
    }

    /// Span covering every level
    pub const fn all() -> Self {
        Self::new(LogLevel::Trace, LogLevel::Fatal)
    }

    #[inline]
    pub fn contains(&self, level: LogLevel) -> bool {
        level >= self.start && level <= self.end
    }
}

impl Default for LevelSpan {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for LevelSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("Fatal".parse::<LogLevel>(), Ok(LogLevel::Fatal));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_enables() {
        assert!(LogLevel::Info.enables(LogLevel::Info));
        assert!(LogLevel::Info.enables(LogLevel::Error));
        assert!(!LogLevel::Info.enables(LogLevel::Debug));
    }

    #[test]
    fn test_span_contains_is_inclusive() {
        let span = LevelSpan::new(LogLevel::Info, LogLevel::Warn);
        assert!(!span.contains(LogLevel::Debug));
        assert!(span.contains(LogLevel::Info));
        assert!(span.contains(LogLevel::Warn));
        assert!(!span.contains(LogLevel::Error));
        assert_eq!(span.to_string(), "INFO..=WARN");
    }

    #[test]
    fn test_inverted_span_is_empty() {
        let span = LevelSpan::new(LogLevel::Error, LogLevel::Debug);
        assert!(LogLevel::ALL.iter().all(|level| !span.contains(*level)));
    }
}

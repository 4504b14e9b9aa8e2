//! Entry encoders
//!
//! An [`Encoder`] appends the bytes for one entry to a caller-provided buffer.
//! Two encoders ship with the crate:
//! - [`TextEncoder`]: `time file:line labels name [LEVEL] message`
//! - [`JsonEncoder`]: one JSON object per line

use super::error::Result;
use super::log_entry::LogEntry;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub trait Encoder: Send + Sync {
    /// Append the encoded form of `entry` to `buf`
    fn encode(&self, buf: &mut Vec<u8>, entry: &LogEntry) -> Result<()>;
}

/// Which parts of an entry an encoder writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub timestamp_format: TimestampFormat,
    pub include_time: bool,
    pub include_source: bool,
    pub include_labels: bool,
    pub include_name: bool,
    pub include_level: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            timestamp_format: TimestampFormat::default(),
            include_time: true,
            include_source: true,
            include_labels: true,
            include_name: true,
            include_level: true,
        }
    }
}

impl EncoderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_time(mut self, include: bool) -> Self {
        self.include_time = include;
        self
    }

    #[must_use]
    pub fn with_source(mut self, include: bool) -> Self {
        self.include_source = include;
        self
    }

    #[must_use]
    pub fn with_labels(mut self, include: bool) -> Self {
        self.include_labels = include;
        self
    }

    #[must_use]
    pub fn with_name(mut self, include: bool) -> Self {
        self.include_name = include;
        self
    }

    #[must_use]
    pub fn with_level(mut self, include: bool) -> Self {
        self.include_level = include;
        self
    }
}

/// Human-readable single-line encoder
#[derive(Debug, Clone, Default)]
pub struct TextEncoder {
    config: EncoderConfig,
    use_colors: bool,
}

impl TextEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EncoderConfig) -> Self {
        Self {
            config,
            use_colors: false,
        }
    }

    /// Colour the level tag; has no effect without the `console` feature
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn uses_colors(&self) -> bool {
        self.use_colors
    }

    #[cfg(feature = "console")]
    fn write_level(&self, line: &mut String, entry: &LogEntry) {
        use colored::Colorize;

        if self.use_colors {
            let _ = write!(
                line,
                "[{}]",
                entry.level.to_str().color(entry.level.color_code())
            );
        } else {
            let _ = write!(line, "[{}]", entry.level.to_str());
        }
    }

    #[cfg(not(feature = "console"))]
    fn write_level(&self, line: &mut String, entry: &LogEntry) {
        let _ = write!(line, "[{}]", entry.level.to_str());
    }
}

impl Encoder for TextEncoder {
    fn encode(&self, buf: &mut Vec<u8>, entry: &LogEntry) -> Result<()> {
        let mut line = String::with_capacity(128);

        if self.config.include_time {
            self.config.timestamp_format.write_to(&mut line, &entry.timestamp);
            line.push(' ');
        }
        if self.config.include_source {
            if let Some(location) = &entry.source_location {
                let _ = write!(line, "{} ", location);
            }
        }
        if self.config.include_labels && !entry.labels.is_empty() {
            line.push_str(entry.labels.as_text());
            line.push(' ');
        }
        if self.config.include_name && !entry.name.is_empty() {
            line.push_str(&entry.name);
            line.push(' ');
        }
        if self.config.include_level {
            self.write_level(&mut line, entry);
            line.push(' ');
        }

        let start = line.len();
        entry.message.write_text(&mut line);
        // One entry per line
        if line[start..].contains(['\n', '\r']) {
            let escaped = line[start..].replace('\n', "\\n").replace('\r', "\\r");
            line.truncate(start);
            line.push_str(&escaped);
        }
        line.push('\n');

        buf.extend_from_slice(line.as_bytes());
        Ok(())
    }
}

/// Newline-delimited JSON encoder
#[derive(Debug, Clone, Default)]
pub struct JsonEncoder {
    config: EncoderConfig,
}

impl JsonEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn to_value(&self, entry: &LogEntry) -> serde_json::Value {
        let mut object = serde_json::Map::new();

        if self.config.include_time {
            object.insert(
                "time".to_string(),
                self.config.timestamp_format.to_json_value(&entry.timestamp),
            );
        }
        if self.config.include_level {
            object.insert("level".to_string(), entry.level.to_str().into());
        }
        if self.config.include_name && !entry.name.is_empty() {
            object.insert("name".to_string(), serde_json::Value::from(&*entry.name));
        }
        if self.config.include_source {
            if let Some(location) = &entry.source_location {
                let mut source = serde_json::Map::new();
                source.insert("file".to_string(), location.file.into());
                source.insert("line".to_string(), location.line.into());
                if let Some(module_path) = location.module_path {
                    source.insert("module".to_string(), module_path.into());
                }
                object.insert("source".to_string(), serde_json::Value::Object(source));
            }
        }
        if self.config.include_labels && !entry.labels.is_empty() {
            object.insert(
                "labels".to_string(),
                serde_json::Value::Object(entry.labels.as_json().clone()),
            );
        }

        object.insert("message".to_string(), entry.message.to_json_value());
        if let Some(fields) = entry.message.fields() {
            if !fields.is_empty() {
                object.insert("fields".to_string(), fields.to_json_value());
            }
        }

        serde_json::Value::Object(object)
    }
}

impl Encoder for JsonEncoder {
    fn encode(&self, buf: &mut Vec<u8>, entry: &LogEntry) -> Result<()> {
        serde_json::to_writer(&mut *buf, &self.to_value(entry))?;
        buf.push(b'\n');
        Ok(())
    }
}

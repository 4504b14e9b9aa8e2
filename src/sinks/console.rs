//! Standard stream and discard sinks

use super::buffered::{BufferedSink, SinkConfig};
use crate::core::{Result, Sink};
use std::io::{self, Stderr, Stdout};

/// Buffered sink over standard output
pub fn stdout() -> BufferedSink<Stdout> {
    BufferedSink::new(io::stdout(), SinkConfig::default())
}

/// Buffered sink over standard error
pub fn stderr() -> BufferedSink<Stderr> {
    BufferedSink::new(io::stderr(), SinkConfig::default())
}

/// Sink that accepts and drops everything
///
/// There is no state to protect, so no lock is taken.
pub fn discard() -> DiscardSink {
    DiscardSink
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl Sink for DiscardSink {
    fn write(&self, bytes: &[u8]) -> Result<usize> {
        Ok(bytes.len())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

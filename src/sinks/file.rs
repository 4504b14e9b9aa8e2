//! File sink

use super::buffered::{BufferedSink, SinkConfig};
use crate::core::{LoggerError, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Buffered sink appending to `path`, created if missing
///
/// `sync` flushes the cache and calls `sync_all` on the file.
pub fn file(path: impl AsRef<Path>) -> Result<BufferedSink<File>> {
    file_with_config(path, SinkConfig::default())
}

pub fn file_with_config(path: impl AsRef<Path>, config: SinkConfig) -> Result<BufferedSink<File>> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| {
            LoggerError::io_operation(
                "opening log file",
                format!("{}: {}", path.display(), err),
                err,
            )
        })?;

    Ok(BufferedSink::new(file, config))
}

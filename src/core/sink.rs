//! Byte sink abstractions
//!
//! [`Sink`] is what exporters write encoded entries to. [`Destination`] is the
//! device underneath a buffered sink: anything implementing [`Write`], plus an
//! optional durable sync and an explicit shutdown.

use super::error::Result;
use std::fs::File;
use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};

/// Receiver of encoded log bytes
///
/// All methods take `&self`; implementations serialize access internally.
pub trait Sink: Send + Sync {
    /// Accept `bytes`, returning how many were taken
    fn write(&self, bytes: &[u8]) -> Result<usize>;

    /// Push everything accepted so far to the device
    fn sync(&self) -> Result<()>;

    /// Sync and release the device. Later calls fail with `SinkClosed`.
    fn close(&self) -> Result<()>;
}

/// A device a buffered sink writes through to
pub trait Destination: Write + Send {
    /// Make written bytes durable (e.g. `fsync`)
    fn sync_durable(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Release the device
    fn shutdown(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Destination for File {
    fn sync_durable(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl Destination for io::Stdout {}

impl Destination for io::Stderr {}

impl Destination for io::Sink {}

impl Destination for Vec<u8> {}

impl Destination for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        shutdown_stream(TcpStream::shutdown(self, Shutdown::Both))
    }
}

#[cfg(unix)]
impl Destination for std::os::unix::net::UnixStream {
    fn shutdown(&mut self) -> io::Result<()> {
        shutdown_stream(std::os::unix::net::UnixStream::shutdown(self, Shutdown::Both))
    }
}

impl<D: Destination + ?Sized> Destination for Box<D> {
    fn sync_durable(&mut self) -> io::Result<()> {
        (**self).sync_durable()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        (**self).shutdown()
    }
}

/// A peer that already went away is not a shutdown failure
pub(crate) fn shutdown_stream(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}

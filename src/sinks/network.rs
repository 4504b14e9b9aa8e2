//! Network sink with background reconnection
//!
//! A [`NetworkSink`] is a [`BufferedSink`] over a TCP or Unix stream. When a
//! write or sync fails because the stream is gone, the first caller to notice
//! starts a single reconnect thread; every other caller just gets its error.
//! The thread dials with a bounded timeout, waits between failed attempts,
//! and swaps the new connection in on success. Nothing is queued while
//! disconnected.
//!
//! # Example
//!
//! ```no_run
//! use rust_log_pipeline::sinks::{NetworkConfig, NetworkSink, SinkConfig};
//! use rust_log_pipeline::core::Sink;
//!
//! let sink = NetworkSink::connect(
//!     "tcp",
//!     "127.0.0.1:5170",
//!     SinkConfig::default(),
//!     NetworkConfig::default(),
//! )?;
//! sink.write(b"hello collector\n")?;
//! sink.close()?;
//! # Ok::<(), rust_log_pipeline::LoggerError>(())
//! ```

use super::buffered::{BufferedSink, SinkConfig};
use crate::core::error::{LoggerError, Result};
use crate::core::sink::{shutdown_stream, Destination, Sink};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::path::PathBuf;

pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Write timeout applied to every connection
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Upper bound for one connection attempt
    pub dial_timeout: Duration,

    /// Wait between failed reconnect attempts
    pub retry_backoff: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Where a network sink connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `host:port`
    Tcp(String),
    /// Filesystem path of a stream socket
    #[cfg(unix)]
    Unix(PathBuf),
}

impl Endpoint {
    /// Select an endpoint by protocol name: `"tcp"` or `"unix"`
    pub fn parse(protocol: &str, address: &str) -> Result<Self> {
        match protocol {
            "tcp" => Ok(Endpoint::Tcp(address.to_string())),
            #[cfg(unix)]
            "unix" => Ok(Endpoint::Unix(PathBuf::from(address))),
            other => Err(LoggerError::InvalidProtocol(other.to_string())),
        }
    }

    fn dial(&self, timeout: Duration) -> io::Result<Connection> {
        match self {
            Endpoint::Tcp(address) => {
                let mut last_err = None;
                for addr in address.to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            stream.set_nodelay(true)?;
                            stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                            return Ok(Connection::Tcp(stream));
                        }
                        Err(err) => last_err = Some(err),
                    }
                }
                Err(last_err.unwrap_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{} resolved to no addresses", address),
                    )
                }))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                // Local connects either succeed or fail immediately.
                let stream = UnixStream::connect(path)?;
                stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                Ok(Connection::Unix(stream))
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(address) => write!(f, "tcp://{}", address),
            #[cfg(unix)]
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// A live stream to the collector
#[derive(Debug)]
pub enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.flush(),
        }
    }
}

impl Destination for Connection {
    fn shutdown(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(stream) => shutdown_stream(TcpStream::shutdown(stream, Shutdown::Both)),
            #[cfg(unix)]
            Connection::Unix(stream) => shutdown_stream(UnixStream::shutdown(stream, Shutdown::Both)),
        }
    }
}

/// State shared with the reconnect thread
struct Shared {
    sink: BufferedSink<Connection>,
    endpoint: Endpoint,
    config: NetworkConfig,
    disconnected: AtomicBool,
    /// Disconnects when the sink closes
    shutdown: Receiver<()>,
    reconnects_started: AtomicU64,
    dial_attempts: AtomicU64,
}

impl Shared {
    fn reconnect(&self) {
        let mut reported = false;

        loop {
            if !matches!(self.shutdown.try_recv(), Err(TryRecvError::Empty)) {
                return;
            }

            self.dial_attempts.fetch_add(1, Ordering::Relaxed);
            match self.endpoint.dial(self.config.dial_timeout) {
                Ok(connection) => {
                    match self.sink.replace_destination(connection) {
                        Ok(mut old) => {
                            let _ = old.shutdown();
                            let _ = self.disconnected.compare_exchange(
                                true,
                                false,
                                Ordering::AcqRel,
                                Ordering::Acquire,
                            );
                            if reported {
                                eprintln!("[LOGGER WARNING] Reconnected to {}", self.endpoint);
                            }
                            return;
                        }
                        Err(LoggerError::SinkClosed) => return,
                        Err(err) => {
                            eprintln!(
                                "[LOGGER ERROR] Failed to swap in new connection to {}: {}",
                                self.endpoint, err
                            );
                            reported = true;
                        }
                    }
                }
                Err(err) => {
                    if !reported {
                        eprintln!(
                            "[LOGGER WARNING] Lost connection to {}, retrying every {:?}: {}",
                            self.endpoint, self.config.retry_backoff, err
                        );
                        reported = true;
                    }
                }
            }

            match self.shutdown.recv_timeout(self.config.retry_backoff) {
                Err(RecvTimeoutError::Timeout) => continue,
                _ => return,
            }
        }
    }
}

/// Buffered stream sink that reconnects on its own
pub struct NetworkSink {
    shared: Arc<Shared>,
    shutdown: Mutex<Option<Sender<()>>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkSink {
    /// Dial `address` over `protocol` (`"tcp"` or `"unix"`)
    ///
    /// The first connection is made synchronously; failing to establish it
    /// fails construction.
    pub fn connect(
        protocol: &str,
        address: &str,
        sink_config: SinkConfig,
        config: NetworkConfig,
    ) -> Result<Self> {
        let endpoint = Endpoint::parse(protocol, address)?;
        let connection = endpoint.dial(config.dial_timeout).map_err(|err| {
            LoggerError::io_operation("connecting", format!("{}: {}", endpoint, err), err)
        })?;

        Ok(Self::with_connection(endpoint, connection, sink_config, config))
    }

    pub fn tcp(address: &str) -> Result<Self> {
        Self::connect("tcp", address, SinkConfig::default(), NetworkConfig::default())
    }

    #[cfg(unix)]
    pub fn unix(path: &str) -> Result<Self> {
        Self::connect("unix", path, SinkConfig::default(), NetworkConfig::default())
    }

    fn with_connection(
        endpoint: Endpoint,
        connection: Connection,
        sink_config: SinkConfig,
        config: NetworkConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded(0);

        Self {
            shared: Arc::new(Shared {
                sink: BufferedSink::new(connection, sink_config),
                endpoint,
                config,
                disconnected: AtomicBool::new(false),
                shutdown: shutdown_rx,
                reconnects_started: AtomicU64::new(0),
                dial_attempts: AtomicU64::new(0),
            }),
            shutdown: Mutex::new(Some(shutdown_tx)),
            reconnect_task: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    pub fn is_disconnected(&self) -> bool {
        self.shared.disconnected.load(Ordering::Acquire)
    }

    /// Number of reconnect sequences started so far
    pub fn reconnects_started(&self) -> u64 {
        self.shared.reconnects_started.load(Ordering::Relaxed)
    }

    /// Number of dials made by reconnect sequences
    pub fn dial_attempts(&self) -> u64 {
        self.shared.dial_attempts.load(Ordering::Relaxed)
    }

    fn check<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_connection_closed() {
                self.on_connection_closed();
            }
        }
        result
    }

    /// Start a reconnect sequence unless one is already running
    fn on_connection_closed(&self) {
        if self
            .shared
            .disconnected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let mut task = self.reconnect_task.lock();
        if self.shutdown.lock().is_none() {
            return;
        }
        // The previous sequence finished before clearing the flag.
        if let Some(previous) = task.take() {
            let _ = previous.join();
        }

        self.shared.reconnects_started.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        match thread::Builder::new()
            .name("log-reconnect".to_string())
            .spawn(move || shared.reconnect())
        {
            Ok(handle) => *task = Some(handle),
            Err(err) => {
                eprintln!("[LOGGER ERROR] Failed to spawn reconnect thread: {}", err);
                self.shared.disconnected.store(false, Ordering::Release);
            }
        }
    }
}

impl Sink for NetworkSink {
    fn write(&self, bytes: &[u8]) -> Result<usize> {
        self.check(self.shared.sink.write(bytes))
    }

    fn sync(&self) -> Result<()> {
        self.check(self.shared.sink.sync())
    }

    /// Stop any reconnect in flight, then flush and close the connection
    fn close(&self) -> Result<()> {
        drop(self.shutdown.lock().take());

        if let Some(handle) = self.reconnect_task.lock().take() {
            if handle.join().is_err() {
                eprintln!("[LOGGER ERROR] Reconnect thread panicked");
            }
        }

        self.shared.sink.close()
    }
}

impl Drop for NetworkSink {
    fn drop(&mut self) {
        drop(self.shutdown.get_mut().take());
        if let Some(handle) = self.reconnect_task.get_mut().take() {
            let _ = handle.join();
        }
    }
}

impl fmt::Debug for NetworkSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkSink")
            .field("endpoint", &self.shared.endpoint)
            .field("disconnected", &self.is_disconnected())
            .field("sink", &self.shared.sink)
            .finish()
    }
}

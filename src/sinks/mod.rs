//! Sink implementations

pub mod buffered;
pub mod console;
pub mod file;
pub mod network;

pub use buffered::{BufferedSink, SinkConfig};
pub use console::{discard, stderr, stdout, DiscardSink};
pub use file::{file, file_with_config};
pub use network::{Connection, Endpoint, NetworkConfig, NetworkSink};

pub use crate::core::{Destination, Sink};

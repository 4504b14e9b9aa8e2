//! Error types for the logging pipeline

use std::io;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: io::Error,
    },

    /// Device error surfaced verbatim from a sink
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Unknown network destination selector
    #[error("Invalid network protocol: '{0}'")]
    InvalidProtocol(String),

    /// A hook vetoed the current entry
    #[error("Hook '{hook}' failed: {message}")]
    Hook { hook: String, message: String },

    /// An exporter failed to deliver the current entry
    #[error("Exporter '{exporter}' failed: {message}")]
    Export { exporter: String, message: String },

    /// The sink has already been closed
    #[error("Sink already closed")]
    SinkClosed,

    /// A lock-disabled sink observed a second concurrent writer
    #[error("Sink declared single-writer but was accessed concurrently")]
    SinkContended,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a hook error
    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Hook {
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Create an exporter error
    pub fn export(exporter: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Export {
            exporter: exporter.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// The underlying IO error, if this error wraps one
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            LoggerError::Io(err) => Some(err),
            LoggerError::IoOperation { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether this error means the stream behind a sink is gone
    ///
    /// Network sinks treat this family of errors as recoverable and start a
    /// reconnect in the background.
    pub fn is_connection_closed(&self) -> bool {
        self.io_error().is_some_and(|err| {
            matches!(
                err.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::WriteZero
            )
        })
    }
}

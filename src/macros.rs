//! Logging macros with `format!`-style arguments.
//!
//! The macros check the logger's level gate before formatting, so a filtered
//! call costs one comparison. Each call records the invocation site and the
//! enclosing module, which the logger keeps when source capture is enabled.
//! Every macro evaluates to the logger's `Result<()>`.
//!
//! Macro calls hand the sampler the rendered text, so `"user {}"` logged
//! with different arguments lands in different sampling buckets. To sample
//! by call shape instead, pass a [`Message::template`] to [`Logger::log`].
//!
//! [`Message::template`]: crate::core::Message::template
//! [`Logger::log`]: crate::core::Logger::log
//!
//! # Examples
//!
//! ```
//! use rust_log_pipeline::prelude::*;
//! use rust_log_pipeline::info;
//!
//! let logger = Logger::new();
//!
//! info!(logger, "Server started").unwrap();
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port).unwrap();
//! ```

/// Log a message at an explicit level.
///
/// # Examples
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let logger = Logger::new();
/// use rust_log_pipeline::log;
/// log!(logger, LogLevel::Info, "Simple message").unwrap();
/// log!(logger, LogLevel::Error, "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        match (&$logger, $level) {
            (logger, level) => {
                if logger.accepts(level) {
                    logger.log_at(
                        level,
                        ::std::format!($($arg)+),
                        $crate::core::SourceLocation::from_location(
                            ::std::panic::Location::caller(),
                        )
                        .with_module_path(::std::module_path!()),
                    )
                } else {
                    ::std::result::Result::Ok(())
                }
            }
        }
    };
}

/// Log a trace-level message.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let mut logger = Logger::new();
/// # logger.set_min_level(LogLevel::Trace);
/// use rust_log_pipeline::trace;
/// trace!(logger, "Entering function: calculate()").unwrap();
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let logger = Logger::new();
/// use rust_log_pipeline::info;
/// info!(logger, "Processing {} items", 100).unwrap();
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let logger = Logger::new();
/// use rust_log_pipeline::error;
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error").unwrap();
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}

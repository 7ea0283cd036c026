//! Error types for pacecast
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//!
//! Two propagation paths exist:
//! - State-machine violations (mutating a stopped engine) surface synchronously
//!   to the caller as `Error::InvalidState`.
//! - Sink dispatch failures are caught inside the pacing cycle and degraded to
//!   a `PacerEvent::DispatchError` event so one bad cycle never halts the stream.

use thiserror::Error;

/// Main error type for the pacecast engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration parsing or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid state for operation (e.g. mutating after stop)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Media sink dispatch errors
    #[error("Sink dispatch error: {0}")]
    Sink(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using pacecast Error
pub type Result<T> = std::result::Result<T, Error>;

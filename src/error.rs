//! Error types for the hlld client
//!
//! Provides a unified error type for all operations.

use std::fmt;
use std::io;

use thiserror::Error;

/// Result type alias using HlldError
pub type Result<T> = std::result::Result<T, HlldError>;

/// Negative but well-formed answers from the server.
///
/// These are per-command outcomes: they never affect sibling commands in
/// the same pipeline batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    /// `Set does not exist`
    SetNotExist,
    /// `Set already exists` / `Exists`
    SetExists,
    /// `Delete in progress`
    SetDeleted,
    /// `Set is not enabled` / `Set is not proxied. Close it first.`
    SetDisabled,
    /// `Client Error: ...`
    UnknownCommand,
    /// `Internal Error`
    InternalError,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceErrorKind::SetNotExist => "set does not exist",
            ServiceErrorKind::SetExists => "set already exists",
            ServiceErrorKind::SetDeleted => "set is being deleted",
            ServiceErrorKind::SetDisabled => "set is not enabled",
            ServiceErrorKind::UnknownCommand => "unknown command",
            ServiceErrorKind::InternalError => "internal server error",
        };
        f.write_str(name)
    }
}

/// Unified error type for client operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HlldError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// The response did not match the grammar expected for its command.
    /// Line boundaries can no longer be trusted.
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Server Errors
    // -------------------------------------------------------------------------
    #[error("Server error ({kind}): {message}")]
    Service {
        kind: ServiceErrorKind,
        message: String,
    },

    // -------------------------------------------------------------------------
    // Client-side Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The slot's result was already moved out of its batch results
    #[error("Result for slot {0} already taken")]
    ResultTaken(usize),
}

impl HlldError {
    pub(crate) fn service(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        HlldError::Service {
            kind,
            message: message.into(),
        }
    }

    /// Returns true when the error leaves the connection in an unknown state.
    ///
    /// A fatal error aborts the rest of an in-flight batch and closes the
    /// connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HlldError::Connection(_) | HlldError::Timeout(_) | HlldError::Protocol(_)
        )
    }

    /// The server-side error kind, if this is a service error.
    pub fn service_kind(&self) -> Option<ServiceErrorKind> {
        match self {
            HlldError::Service { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Same variant as `self`, reworded for a command that was never
    /// resolved because an earlier response in its batch failed.
    pub(crate) fn aborted(&self) -> Self {
        let reason = format!("aborted after earlier failure in batch ({})", self);
        match self {
            HlldError::Timeout(_) => HlldError::Timeout(reason),
            HlldError::Protocol(_) => HlldError::Protocol(reason),
            _ => HlldError::Connection(reason),
        }
    }
}

impl From<io::Error> for HlldError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            // Unix reports socket timeouts as WouldBlock, Windows as TimedOut
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                HlldError::Timeout(err.to_string())
            }
            _ => HlldError::Connection(err.to_string()),
        }
    }
}

//! Error types for rackwire
//!
//! Provides a unified error type for all operations.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using RackError
pub type Result<T> = std::result::Result<T, RackError>;

/// Unified error type for rackwire operations
#[derive(Debug, Error)]
pub enum RackError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    /// Connect, write or read failed at the socket level
    #[error("Connection error ({context}): {source}")]
    Connection {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {waited:?} waiting for a status frame")]
    Timeout { waited: Duration },

    /// Peer closed the connection mid-frame
    #[error("Short frame: peer closed after {received} of {expected} bytes")]
    ShortFrame { received: usize, expected: usize },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Malformed frame: got {len} bytes, expected {expected}")]
    MalformedFrame { len: usize, expected: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    #[error("Session busy: a request is already awaiting its response")]
    SessionBusy,

    #[error("Session closed")]
    SessionClosed,

    #[error("Session not connected")]
    NotConnected,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RackError {
    pub(crate) fn connection(context: &'static str, source: std::io::Error) -> Self {
        RackError::Connection { context, source }
    }

    /// True when the same request may simply be sent again.
    ///
    /// Only `Timeout` qualifies. A `ShortFrame` means the peer closed mid-frame
    /// and is a protocol violation for the caller to handle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RackError::Timeout { .. })
    }
}

impl From<serde_json::Error> for RackError {
    fn from(e: serde_json::Error) -> Self {
        RackError::Serialization(e.to_string())
    }
}

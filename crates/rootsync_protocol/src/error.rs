//! Error types for protocol parsing.

use std::io;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while parsing or computing protocol values.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A header value is not in the expected form.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The HTTP method string is not one this protocol uses.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// Reading a body to checksum it failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Creates an invalid header error.
    pub fn invalid_header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

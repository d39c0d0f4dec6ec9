//! Error types for the reference server.

use rootsync_protocol::Generation;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed request (bad JSON, bad header, checksum mismatch).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or unknown bearer token.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Signed URL rejected (expired or tampered).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// No route accepts this method.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// A blob already exists under this hash with different content.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Root write against a generation that is no longer current.
    #[error("wrong generation: current is {current}, request named {requested}")]
    WrongGeneration {
        /// Generation held by the server.
        current: Generation,
        /// Generation named by the request.
        requested: Generation,
    },

    /// Upload body larger than the configured maximum.
    #[error("payload too large: {size} bytes exceeds {max}")]
    PayloadTooLarge {
        /// Body size in bytes.
        size: u64,
        /// Configured maximum.
        max: u64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status code reported for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::AuthenticationFailed(_) => 401,
            ServerError::Forbidden(_) => 403,
            ServerError::NotFound(_) => 404,
            ServerError::MethodNotAllowed(_) => 405,
            ServerError::Conflict(_) => 409,
            ServerError::WrongGeneration { .. } => 412,
            ServerError::PayloadTooLarge { .. } => 413,
            ServerError::Internal(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::InvalidRequest(err.to_string())
    }
}

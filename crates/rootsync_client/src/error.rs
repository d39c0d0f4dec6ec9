//! Error taxonomy for transport and blob operations.

use rootsync_protocol::{ContentHash, Generation};
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors surfaced by the transport client and blob accessor.
///
/// Every variant is returned to the caller verbatim. Nothing in this crate
/// retries or recovers locally.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered 401; credentials must be refreshed.
    #[error("401 unauthorized")]
    Unauthorized,

    /// The server answered 409.
    #[error("409 conflict")]
    Conflict,

    /// The server answered 412: the supplied generation is no longer current.
    #[error("412 wrong generation")]
    WrongGeneration,

    /// The target resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("request failed with status {0}")]
    Status(u16),

    /// The request body could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(String),

    /// The response body could not be decoded into the requested shape.
    #[error("failed to decode response body: {0}")]
    Decode(String),

    /// Reading or rewinding a body failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The exchange failed below HTTP (connect, TLS, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// A URL could not be parsed or joined.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The root write echoed a different hash than the one submitted.
    #[error("root hash mismatch: submitted {expected}, server recorded {actual}")]
    RootHashMismatch {
        /// Hash the client submitted.
        expected: ContentHash,
        /// Hash the server echoed.
        actual: ContentHash,
    },

    /// The payload is larger than the upload grant allows.
    #[error("upload of {size} bytes exceeds the {max} byte limit")]
    UploadTooLarge {
        /// Payload size.
        size: u64,
        /// Limit from the upload grant.
        max: u64,
    },

    /// The root generation counter cannot advance past this value.
    #[error("generation {0} cannot advance")]
    GenerationExhausted(Generation),
}

impl TransportError {
    /// Maps a non-success HTTP status onto its error kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => TransportError::Unauthorized,
            409 => TransportError::Conflict,
            412 => TransportError::WrongGeneration,
            other => TransportError::Status(other),
        }
    }

    /// Returns the HTTP status behind this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Unauthorized => Some(401),
            TransportError::Conflict => Some(409),
            TransportError::WrongGeneration => Some(412),
            TransportError::Status(code) => Some(*code),
            _ => None,
        }
    }

    /// Returns true when the caller should re-read the root and retry.
    pub fn is_wrong_generation(&self) -> bool {
        matches!(self, TransportError::WrongGeneration)
    }

    /// Returns true for invariant violations that must never be retried blindly.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::RootHashMismatch { .. } | TransportError::GenerationExhausted(_)
        )
    }
}

impl From<url::ParseError> for TransportError {
    fn from(e: url::ParseError) -> Self {
        TransportError::InvalidUrl(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for code in [401u16, 409, 412, 404, 418, 500] {
            assert_eq!(TransportError::from_status(code).status(), Some(code));
        }
        assert!(matches!(
            TransportError::from_status(404),
            TransportError::Status(404)
        ));
        assert_eq!(TransportError::Network("reset".into()).status(), None);
    }

    #[test]
    fn classification_helpers() {
        assert!(TransportError::WrongGeneration.is_wrong_generation());
        assert!(!TransportError::Conflict.is_wrong_generation());

        let mismatch = TransportError::RootHashMismatch {
            expected: "a".into(),
            actual: "b".into(),
        };
        assert!(mismatch.is_fatal());
        assert!(!mismatch.is_wrong_generation());
        assert!(!TransportError::Status(500).is_fatal());
        assert!(TransportError::GenerationExhausted(Generation(u64::MAX)).is_fatal());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            TransportError::Status(418).to_string(),
            "request failed with status 418"
        );
        assert_eq!(
            TransportError::WrongGeneration.to_string(),
            "412 wrong generation"
        );
        let err = TransportError::UploadTooLarge { size: 10, max: 5 };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("5"));
    }
}

//! Core data-model types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of the `x-filename` header sent with root-index writes.
pub const ROOT_FILENAME: &str = "roothash";

/// Bearer credentials obtained by an external authenticator.
///
/// The pair is immutable once constructed. The transport holds it for its
/// whole lifetime and picks one of the two tokens per request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    /// Device-scoped bearer token.
    #[serde(rename = "devicetoken")]
    device_token: String,
    /// User-scoped bearer token.
    #[serde(rename = "usertoken")]
    user_token: String,
}

impl AuthTokens {
    /// Creates a token pair.
    pub fn new(device_token: impl Into<String>, user_token: impl Into<String>) -> Self {
        Self {
            device_token: device_token.into(),
            user_token: user_token.into(),
        }
    }

    /// Returns the device token.
    pub fn device_token(&self) -> &str {
        &self.device_token
    }

    /// Returns the user token.
    pub fn user_token(&self) -> &str {
        &self.user_token
    }
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("device_token", &"<redacted>")
            .field("user_token", &"<redacted>")
            .finish()
    }
}

/// Server-assigned version of the root index.
///
/// Generations only grow: every accepted root write yields a generation
/// strictly greater than the one it replaced. Generation zero means no root
/// has ever been written.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation of an account that has never written a root.
    pub const ZERO: Generation = Generation(0);

    /// Returns the raw counter value.
    pub fn value(self) -> u64 {
        self.0
    }

    /// Returns the generation that follows this one, or `None` once the
    /// counter is exhausted.
    #[must_use]
    pub fn next(self) -> Option<Generation> {
        self.0.checked_add(1).map(Generation)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Generation {
    fn from(value: u64) -> Self {
        Generation(value)
    }
}

/// Content identifier of a blob.
///
/// Hashes are opaque to this crate; they are computed by whoever produced
/// the blob and are only compared for equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wraps a hash string.
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Returns the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the empty hash (no root written yet).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentHash {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ContentHash {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_use_wire_field_names() {
        let tokens = AuthTokens::new("dev", "usr");
        let json = serde_json::to_string(&tokens).unwrap();
        assert_eq!(json, r#"{"devicetoken":"dev","usertoken":"usr"}"#);

        let parsed: AuthTokens = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.device_token(), "dev");
        assert_eq!(parsed.user_token(), "usr");
    }

    #[test]
    fn tokens_debug_is_redacted() {
        let tokens = AuthTokens::new("secret-device", "secret-user");
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn generation_ordering() {
        let g = Generation(41);
        assert!(g.next().unwrap() > g);
        assert_eq!(g.next(), Some(Generation(42)));
        assert_eq!(Generation(u64::MAX - 1).next(), Some(Generation(u64::MAX)));
        assert_eq!(Generation(u64::MAX).next(), None);
        assert_eq!(serde_json::to_string(&g).unwrap(), "41");
    }

    #[test]
    fn content_hash_is_transparent() {
        let hash = ContentHash::from("abc123");
        assert_eq!(serde_json::to_string(&hash).unwrap(), r#""abc123""#);
        assert_eq!(hash.to_string(), "abc123");
        assert!(ContentHash::default().is_empty());
    }
}

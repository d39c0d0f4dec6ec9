//! Server configuration.

use std::collections::HashSet;
use std::time::Duration;

/// Default lifetime of a signed blob URL.
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Default maximum upload size (100 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// Configuration for the reference server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL used when minting signed URLs.
    pub public_base_url: String,
    /// Accepted device tokens.
    pub device_tokens: HashSet<String>,
    /// Accepted user tokens.
    pub user_tokens: HashSet<String>,
    /// Secret key for signing blob URLs.
    pub signing_secret: Vec<u8>,
    /// Lifetime of a signed blob URL.
    pub url_ttl: Duration,
    /// Maximum accepted upload size in bytes.
    pub max_upload_size: u64,
    /// Whether uploads must carry an `x-content-hash` header.
    pub require_checksum: bool,
}

impl ServerConfig {
    /// Creates a configuration minting URLs under `public_base_url`.
    pub fn new(public_base_url: impl Into<String>) -> Self {
        let mut public_base_url = public_base_url.into();
        while public_base_url.ends_with('/') {
            public_base_url.pop();
        }
        Self {
            public_base_url,
            device_tokens: HashSet::new(),
            user_tokens: HashSet::new(),
            signing_secret: b"rootsync-dev-signing-secret".to_vec(),
            url_ttl: DEFAULT_URL_TTL,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            require_checksum: false,
        }
    }

    /// Accepts `token` as a device token.
    pub fn with_device_token(mut self, token: impl Into<String>) -> Self {
        self.device_tokens.insert(token.into());
        self
    }

    /// Accepts `token` as a user token.
    pub fn with_user_token(mut self, token: impl Into<String>) -> Self {
        self.user_tokens.insert(token.into());
        self
    }

    /// Sets the URL signing secret.
    pub fn with_signing_secret(mut self, secret: Vec<u8>) -> Self {
        self.signing_secret = secret;
        self
    }

    /// Sets the signed-URL lifetime.
    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    /// Sets the maximum upload size.
    pub fn with_max_upload_size(mut self, max: u64) -> Self {
        self.max_upload_size = max;
        self
    }

    /// Requires a checksum header on every upload.
    pub fn with_required_checksum(mut self, required: bool) -> Self {
        self.require_checksum = required;
        self
    }

    /// Returns true if any token is configured.
    ///
    /// With no tokens configured every bearer is accepted.
    pub fn requires_auth(&self) -> bool {
        !self.device_tokens.is_empty() || !self.user_tokens.is_empty()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:8080")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.url_ttl, DEFAULT_URL_TTL);
        assert_eq!(config.max_upload_size, 100 * 1024 * 1024);
        assert!(!config.requires_auth());
        assert!(!config.require_checksum);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("http://blobs.test/")
            .with_user_token("u1")
            .with_device_token("d1")
            .with_max_upload_size(16)
            .with_url_ttl(Duration::from_secs(5))
            .with_required_checksum(true);

        assert_eq!(config.public_base_url, "http://blobs.test");
        assert!(config.requires_auth());
        assert!(config.user_tokens.contains("u1"));
        assert!(config.device_tokens.contains("d1"));
        assert_eq!(config.max_upload_size, 16);
        assert!(config.require_checksum);
    }
}

//! Configuration for the transport client.

use crate::error::{TransportError, TransportResult};
use rootsync_protocol::ContentHash;
use std::time::Duration;
use url::Url;

/// Default overall timeout for a single exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Request/response bodies larger than this are not written to trace logs.
pub const DEFAULT_TRACE_BODY_LIMIT: usize = 300;

/// Locations of the backend endpoints.
///
/// Exact paths are deployment specific; [`Endpoints::from_base`] derives the
/// conventional layout from a single base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// GET / PUT / POST target for the root index.
    pub root: Url,
    /// POST target that issues signed upload URLs.
    pub upload_url: Url,
    /// POST target that issues signed download URLs.
    pub download_url: Url,
    /// Prefix for direct content access, `<blobs><hash>`.
    pub blobs: Url,
}

impl Endpoints {
    /// Creates endpoints from explicit URLs.
    pub fn new(root: Url, upload_url: Url, download_url: Url, mut blobs: Url) -> Self {
        if !blobs.path().ends_with('/') {
            let path = format!("{}/", blobs.path());
            blobs.set_path(&path);
        }
        Self {
            root,
            upload_url,
            download_url,
            blobs,
        }
    }

    /// Derives the default endpoint layout below `base`.
    pub fn from_base(base: &str) -> TransportResult<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self::new(
            base.join("sync/v3/root")?,
            base.join("signed-urls/uploads")?,
            base.join("signed-urls/downloads")?,
            base.join("sync/v3/files/")?,
        ))
    }

    /// Returns the direct content URL of a blob.
    ///
    /// The hash is appended as a single percent-encoded path segment, so it
    /// always lands directly below the `blobs` prefix.
    pub fn blob(&self, hash: &ContentHash) -> TransportResult<Url> {
        let unusable = || TransportError::InvalidUrl(format!("unusable blob hash {hash:?}"));
        // `.` and `..` are dropped by the segment writer instead of encoded.
        if matches!(hash.as_str(), "" | "." | "..") {
            return Err(unusable());
        }
        let mut url = self.blobs.clone();
        url.path_segments_mut()
            .map_err(|()| unusable())?
            .pop_if_empty()
            .push(hash.as_str());
        Ok(url)
    }
}

/// Configuration for [`crate::TransportClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend endpoints.
    pub endpoints: Endpoints,
    /// Overall timeout applied to every exchange.
    pub timeout: Duration,
    /// Value of the `user-agent` header.
    pub user_agent: String,
    /// Largest body written to trace logs.
    pub trace_body_limit: usize,
}

impl ClientConfig {
    /// Creates a configuration with default timeout and user agent.
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("rootsync/{}", env!("CARGO_PKG_VERSION")),
            trace_body_limit: DEFAULT_TRACE_BODY_LIMIT,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the largest body written to trace logs.
    pub fn with_trace_body_limit(mut self, limit: usize) -> Self {
        self.trace_body_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_from_base() {
        let endpoints = Endpoints::from_base("https://sync.example.com/api").unwrap();
        assert_eq!(
            endpoints.root.as_str(),
            "https://sync.example.com/api/sync/v3/root"
        );
        assert_eq!(
            endpoints.upload_url.as_str(),
            "https://sync.example.com/api/signed-urls/uploads"
        );
        assert_eq!(
            endpoints.download_url.as_str(),
            "https://sync.example.com/api/signed-urls/downloads"
        );
        assert_eq!(
            endpoints.blob(&"abc".into()).unwrap().as_str(),
            "https://sync.example.com/api/sync/v3/files/abc"
        );
    }

    #[test]
    fn blob_prefix_gets_trailing_slash() {
        let base = Url::parse("https://h.example/x").unwrap();
        let endpoints = Endpoints::new(
            base.clone(),
            base.clone(),
            base.clone(),
            Url::parse("https://h.example/files").unwrap(),
        );
        assert_eq!(
            endpoints.blob(&"h1".into()).unwrap().as_str(),
            "https://h.example/files/h1"
        );
    }

    #[test]
    fn blob_rejects_unaddressable_hashes() {
        let endpoints = Endpoints::from_base("https://h.example/").unwrap();
        assert!(endpoints.blob(&"".into()).is_err());
        assert!(endpoints.blob(&".".into()).is_err());
        assert!(endpoints.blob(&"..".into()).is_err());
    }

    #[test]
    fn blob_hash_stays_below_prefix() {
        let endpoints = Endpoints::from_base("http://backend.test/").unwrap();
        let prefix = "http://backend.test/sync/v3/files/";

        let url = endpoints.blob(&"sha256:abc".into()).unwrap();
        assert_eq!(url.as_str(), "http://backend.test/sync/v3/files/sha256:abc");

        for hash in ["%2e%2e", "%2E.", "../root", "a/b", "a?b", "a#b", "x/../../y"] {
            let url = endpoints.blob(&hash.into()).unwrap();
            assert!(
                url.as_str().starts_with(prefix),
                "{hash} escaped the prefix: {url}"
            );
            let segments: Vec<_> = url.path_segments().unwrap().collect();
            assert_eq!(segments.len(), 4, "{hash} was split: {url}");
            assert!(url.query().is_none() && url.fragment().is_none());
        }
        assert_eq!(
            endpoints.blob(&"a/b".into()).unwrap().as_str(),
            "http://backend.test/sync/v3/files/a%2Fb"
        );
    }

    #[test]
    fn invalid_base_url() {
        assert!(matches!(
            Endpoints::from_base("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn config_builder() {
        let config = ClientConfig::new(Endpoints::from_base("http://localhost/").unwrap())
            .with_timeout(Duration::from_secs(10))
            .with_user_agent("test-agent")
            .with_trace_body_limit(16);

        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.trace_body_limit, 16);
        assert_eq!(
            ClientConfig::new(config.endpoints.clone()).timeout,
            DEFAULT_TIMEOUT
        );
    }
}

//! Request authentication for the reference server.
//!
//! Two mechanisms are supported:
//! - Bearer tokens on the API routes, checked against the configured
//!   device and user token sets.
//! - Signed blob URLs, which carry their own authorization in the query
//!   string and need no bearer token.
//!
//! ## Signed URL Format
//!
//! `<base>/signed/<hash>?method=<VERB>&expires=<unix secs>&sig=<hex>`
//!
//! where `sig` is HMAC-SHA256 over `<VERB>|<hash>|<expires>`.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rootsync_protocol::{ContentHash, HeaderSet, Method};
use sha2::Sha256;
use std::collections::HashSet;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Validates bearer tokens on API routes.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    accepted: HashSet<String>,
}

impl TokenValidator {
    /// Creates a validator accepting the device and user tokens of `config`.
    pub fn new(config: &ServerConfig) -> Self {
        let accepted = config
            .device_tokens
            .iter()
            .chain(config.user_tokens.iter())
            .cloned()
            .collect();
        Self { accepted }
    }

    /// Checks the `authorization` header of a request.
    ///
    /// An empty token set disables the check.
    pub fn validate(&self, headers: &HeaderSet) -> ServerResult<()> {
        if self.accepted.is_empty() {
            return Ok(());
        }
        match headers.bearer_token() {
            None | Some("") => Err(ServerError::AuthenticationFailed(
                "missing bearer token".into(),
            )),
            Some(token) if self.accepted.contains(token) => Ok(()),
            Some(_) => Err(ServerError::AuthenticationFailed("unknown token".into())),
        }
    }
}

/// A signed URL together with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// Absolute URL.
    pub url: String,
    /// Instant after which the URL is rejected.
    pub expires: DateTime<Utc>,
}

/// Mints and verifies time-limited blob URLs.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
    ttl: Duration,
    base_url: String,
}

impl UrlSigner {
    /// Path prefix under which signed URLs are served.
    pub const PREFIX: &'static str = "/signed/";

    /// Creates a signer from the server configuration.
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            secret: config.signing_secret.clone(),
            ttl: config.url_ttl,
            base_url: config.public_base_url.clone(),
        }
    }

    /// Mints a URL granting `method` on `hash` until `now + ttl`.
    pub fn mint(
        &self,
        method: Method,
        hash: &ContentHash,
        now: DateTime<Utc>,
    ) -> ServerResult<SignedUrl> {
        let ttl = i64::try_from(self.ttl.as_secs())
            .map_err(|_| ServerError::Internal("url lifetime out of range".into()))?;
        let expires_at = now.timestamp().saturating_add(ttl);
        let expires = DateTime::<Utc>::from_timestamp(expires_at, 0)
            .ok_or_else(|| ServerError::Internal("url expiry out of range".into()))?;
        let sig = self.signature(method, hash, expires_at)?;
        let url = format!(
            "{}{}{}?method={}&expires={}&sig={}",
            self.base_url,
            Self::PREFIX,
            hash,
            method,
            expires_at,
            sig
        );
        Ok(SignedUrl { url, expires })
    }

    /// Verifies a signed URL's query parameters.
    ///
    /// Fails with [`ServerError::Forbidden`] when the URL is expired, was
    /// signed for another method or hash, or the signature does not match.
    pub fn verify(
        &self,
        method: Method,
        hash: &ContentHash,
        query: &SignedQuery,
        now: DateTime<Utc>,
    ) -> ServerResult<()> {
        if query.method != method {
            return Err(ServerError::Forbidden(format!(
                "url signed for {}, used for {}",
                query.method, method
            )));
        }
        if now.timestamp() >= query.expires {
            return Err(ServerError::Forbidden("url expired".into()));
        }
        let provided = hex::decode(&query.signature)
            .map_err(|_| ServerError::Forbidden("malformed signature".into()))?;
        let mut mac = self.mac()?;
        mac.update(Self::message(method, hash, query.expires).as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| ServerError::Forbidden("signature mismatch".into()))
    }

    fn signature(&self, method: Method, hash: &ContentHash, expires: i64) -> ServerResult<String> {
        let mut mac = self.mac()?;
        mac.update(Self::message(method, hash, expires).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn mac(&self) -> ServerResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServerError::Internal(format!("signing key: {e}")))
    }

    fn message(method: Method, hash: &ContentHash, expires: i64) -> String {
        format!("{method}|{hash}|{expires}")
    }
}

/// Authorization parameters carried in a signed URL's query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    /// Method the URL was signed for.
    pub method: Method,
    /// Expiry as Unix seconds.
    pub expires: i64,
    /// Hex-encoded signature.
    pub signature: String,
}

impl SignedQuery {
    /// Parses `method`, `expires` and `sig` from a raw query string.
    pub fn parse(query: &str) -> ServerResult<Self> {
        let mut method = None;
        let mut expires = None;
        let mut signature = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "method" => method = value.parse::<Method>().ok(),
                "expires" => expires = value.parse::<i64>().ok(),
                "sig" => signature = Some(value.into_owned()),
                _ => {}
            }
        }
        match (method, expires, signature) {
            (Some(method), Some(expires), Some(signature)) => Ok(Self {
                method,
                expires,
                signature,
            }),
            _ => Err(ServerError::Forbidden("incomplete signed url".into())),
        }
    }
}

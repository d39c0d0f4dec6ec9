//! Request handlers for the blob and root endpoints.

use crate::auth::{SignedQuery, TokenValidator, UrlSigner};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::{BlobStore, RootStore};
use chrono::{SecondsFormat, Utc};
use rootsync_protocol::{
    BlobUrlRequest, BlobUrlResponse, Checksum, ContentHash, HeaderName, HeaderSet, Method,
    RootIndexRecord, RootWriteRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Root index endpoint (GET read, PUT compare-and-swap, POST signed root URL).
pub const ROOT_PATH: &str = "/sync/v3/root";
/// Upload URL grant endpoint.
pub const UPLOAD_URL_PATH: &str = "/signed-urls/uploads";
/// Download URL grant endpoint.
pub const DOWNLOAD_URL_PATH: &str = "/signed-urls/downloads";
/// Direct blob content prefix.
pub const BLOB_PREFIX: &str = "/sync/v3/files/";

/// A fully buffered request as seen by the server.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    /// Verb.
    pub method: Method,
    /// Path plus optional query string.
    pub target: String,
    /// Request headers.
    pub headers: HeaderSet,
    /// Request body.
    pub body: Vec<u8>,
}

impl ServerRequest {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderSet::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds `authorization: Bearer <token>`.
    #[must_use]
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header(HeaderName::Authorization, format!("Bearer {token}"))
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body.
    pub fn with_json<T: Serialize>(self, value: &T) -> ServerResult<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|e| ServerError::Internal(format!("encode request: {e}")))?;
        Ok(self
            .with_header(HeaderName::ContentType, "application/json")
            .with_body(body))
    }

    /// Returns the path without the query string.
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    /// Returns the query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    /// Numeric status.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderSet,
    /// Response body.
    pub body: Vec<u8>,
}

impl ServerResponse {
    /// A JSON response.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                headers: HeaderSet::new().with(HeaderName::ContentType, "application/json"),
                body,
            },
            Err(e) => Self::error(&ServerError::Internal(format!("encode response: {e}"))),
        }
    }

    /// A binary response.
    pub fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: HeaderSet::new().with(HeaderName::ContentType, "application/octet-stream"),
            body,
        }
    }

    /// A response with no body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: HeaderSet::new(),
            body: Vec::new(),
        }
    }

    /// Maps an error to its status with a JSON `{"error": ...}` body.
    pub fn error(err: &ServerError) -> Self {
        let body = serde_json::json!({ "error": err.to_string() });
        Self {
            status: err.status_code(),
            headers: HeaderSet::new().with(HeaderName::ContentType, "application/json"),
            body: body.to_string().into_bytes(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes a JSON body.
    pub fn json_body<T: DeserializeOwned>(&self) -> ServerResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Shared state for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Root pointer.
    pub roots: RootStore,
    /// Blob contents.
    pub blobs: BlobStore,
    tokens: TokenValidator,
    signer: UrlSigner,
    base_path: String,
}

impl HandlerContext {
    /// Creates an empty context.
    pub fn new(config: ServerConfig) -> Self {
        let base_path = url::Url::parse(&config.public_base_url)
            .map(|u| u.path().trim_end_matches('/').to_string())
            .unwrap_or_default();
        Self {
            tokens: TokenValidator::new(&config),
            signer: UrlSigner::new(&config),
            roots: RootStore::new(),
            blobs: BlobStore::new(),
            base_path,
            config,
        }
    }
}

/// Handler for blob and root requests.
pub struct RequestHandler<'a> {
    context: &'a HandlerContext,
}

impl<'a> RequestHandler<'a> {
    /// Creates a handler over `context`.
    pub fn new(context: &'a HandlerContext) -> Self {
        Self { context }
    }

    /// Routes a request to its handler.
    pub fn dispatch(&self, request: &ServerRequest) -> ServerResult<ServerResponse> {
        let path = request.path();
        let path = path
            .strip_prefix(self.context.base_path.as_str())
            .unwrap_or(path);

        if let Some(hash) = path.strip_prefix(UrlSigner::PREFIX) {
            let hash = parse_hash(hash)?;
            return self.handle_signed(request, hash);
        }

        self.context.tokens.validate(&request.headers)?;

        match (request.method, path) {
            (Method::Get, ROOT_PATH) => Ok(ServerResponse::json(200, &self.handle_root_get())),
            (Method::Put, ROOT_PATH) => {
                let record = self.handle_root_put(&request.body)?;
                Ok(ServerResponse::json(200, &record))
            }
            (Method::Post, ROOT_PATH) => {
                Ok(ServerResponse::json(200, &self.handle_root_url(&request.body)?))
            }
            (Method::Post, UPLOAD_URL_PATH) => Ok(ServerResponse::json(
                200,
                &self.handle_blob_url(Method::Put, &request.body)?,
            )),
            (Method::Post, DOWNLOAD_URL_PATH) => Ok(ServerResponse::json(
                200,
                &self.handle_blob_url(Method::Get, &request.body)?,
            )),
            (_, ROOT_PATH | UPLOAD_URL_PATH | DOWNLOAD_URL_PATH) => {
                Err(ServerError::MethodNotAllowed(format!(
                    "{} {}",
                    request.method, path
                )))
            }
            (method, _) => match path.strip_prefix(BLOB_PREFIX) {
                Some(hash) => self.handle_blob(method, parse_hash(hash)?, request),
                None => Err(ServerError::NotFound(path.to_string())),
            },
        }
    }

    /// Returns the current root record.
    pub fn handle_root_get(&self) -> RootIndexRecord {
        let record = self.context.roots.current();
        info!(generation = %record.generation, hash = %record.hash, "root index read");
        record
    }

    /// Applies a root compare-and-swap.
    pub fn handle_root_put(&self, body: &[u8]) -> ServerResult<RootIndexRecord> {
        let request: RootWriteRequest = serde_json::from_slice(body)?;
        match self.context.roots.compare_and_swap(&request) {
            Ok(record) => {
                info!(
                    generation = %record.generation,
                    hash = %record.hash,
                    broadcast = request.broadcast,
                    "root index updated"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(requested = %request.generation, "root write rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Grants a signed upload URL for a new root blob.
    ///
    /// The grant is refused with 412 when the named generation is stale.
    pub fn handle_root_url(&self, body: &[u8]) -> ServerResult<BlobUrlResponse> {
        let request: RootWriteRequest = serde_json::from_slice(body)?;
        self.context.roots.check(request.generation)?;
        self.grant(Method::Put, request.hash)
    }

    /// Grants a signed URL for a blob.
    pub fn handle_blob_url(&self, expected: Method, body: &[u8]) -> ServerResult<BlobUrlResponse> {
        let request: BlobUrlRequest = serde_json::from_slice(body)?;
        if request.method != expected {
            return Err(ServerError::InvalidRequest(format!(
                "endpoint grants {expected} urls, request asked for {}",
                request.method
            )));
        }
        self.grant(expected, request.relative_path)
    }

    fn grant(&self, method: Method, hash: ContentHash) -> ServerResult<BlobUrlResponse> {
        let signed = self.context.signer.mint(method, &hash, Utc::now())?;
        debug!(%method, %hash, expires = %signed.expires, "issued blob url");
        let max_upload_size_bytes = match method {
            Method::Put => self.context.config.max_upload_size,
            _ => 0,
        };
        Ok(BlobUrlResponse {
            expires: signed.expires.to_rfc3339_opts(SecondsFormat::Secs, true),
            method,
            relative_path: hash,
            url: signed.url,
            max_upload_size_bytes,
        })
    }

    fn handle_signed(
        &self,
        request: &ServerRequest,
        hash: ContentHash,
    ) -> ServerResult<ServerResponse> {
        let query = SignedQuery::parse(request.query().unwrap_or_default())?;
        self.context
            .signer
            .verify(request.method, &hash, &query, Utc::now())?;
        self.handle_blob(request.method, hash, request)
    }

    fn handle_blob(
        &self,
        method: Method,
        hash: ContentHash,
        request: &ServerRequest,
    ) -> ServerResult<ServerResponse> {
        match method {
            Method::Get => {
                let data = self.context.blobs.get(&hash)?;
                debug!(%hash, len = data.len(), "serving blob");
                Ok(ServerResponse::bytes(200, data))
            }
            Method::Put => {
                let created = self.handle_blob_put(hash, &request.headers, &request.body)?;
                Ok(ServerResponse::empty(if created { 201 } else { 200 }))
            }
            other => Err(ServerError::MethodNotAllowed(format!("{other} on blob"))),
        }
    }

    /// Stores an uploaded blob after size and checksum checks.
    pub fn handle_blob_put(
        &self,
        hash: ContentHash,
        headers: &HeaderSet,
        body: &[u8],
    ) -> ServerResult<bool> {
        let size = body.len() as u64;
        let max = self.context.config.max_upload_size;
        if size > max {
            return Err(ServerError::PayloadTooLarge { size, max });
        }

        match headers.get(&HeaderName::ContentHash) {
            Some(value) => {
                let declared = Checksum::parse_header(value)
                    .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
                let actual = Checksum::of(body);
                if declared != actual {
                    return Err(ServerError::InvalidRequest(format!(
                        "checksum mismatch: declared {declared}, computed {actual}"
                    )));
                }
            }
            None if self.context.config.require_checksum => {
                return Err(ServerError::InvalidRequest(
                    "missing x-content-hash header".into(),
                ));
            }
            None => {}
        }

        let created = self.context.blobs.put(hash.clone(), body.to_vec())?;
        debug!(
            %hash,
            len = size,
            file = headers.get(&HeaderName::FileName).unwrap_or_default(),
            created,
            "stored blob"
        );
        Ok(created)
    }
}

fn parse_hash(raw: &str) -> ServerResult<ContentHash> {
    if raw.is_empty() || raw.contains('/') {
        return Err(ServerError::InvalidRequest(format!("bad blob hash {raw:?}")));
    }
    Ok(ContentHash::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rootsync_protocol::Generation;

    fn context() -> HandlerContext {
        HandlerContext::new(ServerConfig::new("http://blobs.test").with_max_upload_size(8))
    }

    #[test]
    fn request_target_split() {
        let request = ServerRequest::new(Method::Get, "/signed/abc?method=GET&sig=00");
        assert_eq!(request.path(), "/signed/abc");
        assert_eq!(request.query(), Some("method=GET&sig=00"));
        assert_eq!(ServerRequest::new(Method::Get, "/x").query(), None);
    }

    #[test]
    fn root_put_then_get() {
        let context = context();
        let handler = RequestHandler::new(&context);
        let body = serde_json::to_vec(&RootWriteRequest::new(
            "r1".into(),
            Generation::ZERO,
            true,
        ))
        .unwrap();

        let record = handler.handle_root_put(&body).unwrap();
        assert_eq!(record.generation, Generation(1));
        assert_eq!(handler.handle_root_get(), record);

        let err = handler.handle_root_put(&body).unwrap_err();
        assert_eq!(err.status_code(), 412);
    }

    #[test]
    fn root_put_rejects_garbage() {
        let context = context();
        let handler = RequestHandler::new(&context);
        let err = handler.handle_root_put(b"not json").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn blob_url_method_must_match_endpoint() {
        let context = context();
        let handler = RequestHandler::new(&context);
        let body = serde_json::to_vec(&BlobUrlRequest::download("h".into())).unwrap();

        let grant = handler.handle_blob_url(Method::Get, &body).unwrap();
        assert_eq!(grant.method, Method::Get);
        assert_eq!(grant.max_upload_size_bytes, 0);
        assert!(grant.url.starts_with("http://blobs.test/signed/h?"));
        let expires = grant.expires_at().unwrap();
        assert!(!grant.is_expired_at(Utc::now()));
        assert!(grant.is_expired_at(expires));

        assert!(handler.handle_blob_url(Method::Put, &body).is_err());
    }

    #[test]
    fn blob_put_checks_size_and_checksum() {
        let context = context();
        let handler = RequestHandler::new(&context);
        let good =
            HeaderSet::new().with(HeaderName::ContentHash, Checksum::of(b"abc").header_value());
        let bad =
            HeaderSet::new().with(HeaderName::ContentHash, Checksum::of(b"xyz").header_value());

        let err = handler
            .handle_blob_put("big".into(), &HeaderSet::new(), &[0u8; 9])
            .unwrap_err();
        assert_eq!(err.status_code(), 413);

        let err = handler.handle_blob_put("h".into(), &bad, b"abc").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(!context.blobs.contains(&"h".into()));

        assert!(handler.handle_blob_put("h".into(), &good, b"abc").unwrap());
        assert!(handler
            .handle_blob_put("plain".into(), &HeaderSet::new(), b"abc")
            .unwrap());
    }

    #[test]
    fn required_checksum() {
        let context = HandlerContext::new(ServerConfig::default().with_required_checksum(true));
        let handler = RequestHandler::new(&context);
        let err = handler
            .handle_blob_put("h".into(), &HeaderSet::new(), b"abc")
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn error_response_body() {
        let response = ServerResponse::error(&ServerError::NotFound("h".into()));
        assert_eq!(response.status, 404);
        let body: serde_json::Value = response.json_body().unwrap();
        assert_eq!(body["error"], "not found: h");
    }
}

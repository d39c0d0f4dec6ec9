//! HTTP backends.
//!
//! The transport client builds and classifies exchanges; moving the bytes is
//! delegated to an [`HttpClient`]. [`ReqwestClient`] talks to the network,
//! [`LoopbackClient`] routes requests straight into an in-process server.

use crate::error::{TransportError, TransportResult};
use rootsync_protocol::{HeaderName, HeaderSet, Method};
use std::io::{Cursor, Read};
use std::time::Duration;
use url::Url;

/// A request ready to be put on the wire.
pub struct HttpRequest {
    /// Verb.
    pub method: Method,
    /// Absolute target.
    pub url: Url,
    /// Headers, including authorization and user agent.
    pub headers: HeaderSet,
    /// Body, streamed as the backend sends it.
    pub body: Option<Box<dyn Read + Send>>,
    /// Body length when known up front.
    pub content_length: Option<u64>,
}

/// A response whose body has not been read yet.
///
/// Dropping the response releases the underlying connection.
pub struct HttpResponse {
    /// Numeric status.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderSet,
    /// Live body stream.
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// Creates a response over an in-memory body.
    pub fn from_bytes(status: u16, headers: HeaderSet, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body: Box::new(Cursor::new(body)),
        }
    }
}

/// HTTP client abstraction.
///
/// Implementations perform exactly one exchange per call and never inspect
/// the status code; classification happens in the transport client.
/// Implementations must be safe to share across threads.
pub trait HttpClient: Send + Sync {
    /// Sends the request and returns the response with an unread body.
    fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse>;
}

impl<C: HttpClient + ?Sized> HttpClient for std::sync::Arc<C> {
    fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        (**self).execute(request)
    }
}

/// Blocking network client backed by `reqwest`.
///
/// The inner client keeps a connection pool and is never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client with an overall per-request timeout.
    pub fn new(timeout: Duration) -> TransportResult<Self> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.inner.request(method, request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name.as_str(), value);
        }
        if let Some(body) = request.body {
            let body = match request.content_length {
                Some(len) => reqwest::blocking::Body::sized(body, len),
                None => reqwest::blocking::Body::new(body),
            };
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let mut headers = HeaderSet::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(HeaderName::parse(name.as_str()), value);
            }
        }

        Ok(HttpResponse {
            status,
            headers,
            body: Box::new(response),
        })
    }
}

/// A request as seen by a loopback server: fully buffered.
#[derive(Debug, Clone)]
pub struct LoopbackRequest {
    /// Verb.
    pub method: Method,
    /// Path plus query string, e.g. `/sync/v3/files/abc`.
    pub path: String,
    /// Request headers.
    pub headers: HeaderSet,
    /// Request body.
    pub body: Vec<u8>,
}

/// A fully buffered loopback response.
#[derive(Debug, Clone)]
pub struct LoopbackResponse {
    /// Numeric status.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderSet,
    /// Response body.
    pub body: Vec<u8>,
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles one request.
    fn handle(&self, request: LoopbackRequest) -> LoopbackResponse;
}

/// An HTTP client that routes requests directly to an in-process server.
///
/// Useful for testing without actual network overhead. Request bodies are
/// read to the end before the server sees them.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// Returns the server.
    pub fn server(&self) -> &S {
        &self.server
    }
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let mut body = Vec::new();
        if let Some(mut reader) = request.body {
            reader.read_to_end(&mut body)?;
        }

        let mut path = request.url.path().to_string();
        if let Some(query) = request.url.query() {
            path.push('?');
            path.push_str(query);
        }

        let response = self.server.handle(LoopbackRequest {
            method: request.method,
            path,
            headers: request.headers,
            body,
        });

        Ok(HttpResponse::from_bytes(
            response.status,
            response.headers,
            response.body,
        ))
    }
}

//! Transport client: signs, checksums, dispatches and classifies requests.

use crate::config::ClientConfig;
use crate::error::{TransportError, TransportResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
use rootsync_protocol::{AuthTokens, Checksum, HeaderName, HeaderSet, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use tracing::{error, trace, warn};
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json";
const OCTET_CONTENT_TYPE: &str = "application/octet-stream";

/// Which bearer token goes into the `authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    /// A bare `Bearer` value without a token.
    None,
    /// The device-scoped token.
    Device,
    /// The user-scoped token.
    User,
}

/// A body that supports rewinding, and can therefore be checksummed.
pub trait SeekableBody: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekableBody for T {}

/// Request body, chosen explicitly by the caller.
pub enum RequestBody {
    /// No body.
    Empty,
    /// Serialized structured data.
    Json(Vec<u8>),
    /// Raw bytes that can be rewound; checksummed before sending.
    Seekable(Box<dyn SeekableBody>),
    /// Forward-only raw bytes; sent without a checksum.
    Stream(Box<dyn Read + Send>),
}

impl RequestBody {
    /// Serializes `value` as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> TransportResult<Self> {
        serde_json::to_vec(value)
            .map(RequestBody::Json)
            .map_err(|e| TransportError::Encode(e.to_string()))
    }

    /// Wraps an in-memory payload.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        RequestBody::Seekable(Box::new(Cursor::new(data.into())))
    }

    /// Wraps a rewindable payload such as a file.
    pub fn seekable(reader: impl Read + Seek + Send + 'static) -> Self {
        RequestBody::Seekable(Box::new(reader))
    }

    /// Wraps a forward-only payload.
    pub fn stream(reader: impl Read + Send + 'static) -> Self {
        RequestBody::Stream(Box::new(reader))
    }

    /// Returns the length that will be sent, when it can be learned without
    /// consuming the body.
    ///
    /// Seekable bodies are rewound before sending, so their length counts
    /// from offset zero whatever the current position is.
    pub fn known_len(&mut self) -> TransportResult<Option<u64>> {
        match self {
            RequestBody::Empty => Ok(Some(0)),
            RequestBody::Json(bytes) => Ok(Some(bytes.len() as u64)),
            RequestBody::Seekable(reader) => {
                let pos = reader.stream_position()?;
                let end = reader.seek(SeekFrom::End(0))?;
                reader.seek(SeekFrom::Start(pos))?;
                Ok(Some(end))
            }
            RequestBody::Stream(_) => Ok(None),
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Json(bytes) => write!(f, "Json({} bytes)", bytes.len()),
            RequestBody::Seekable(_) => f.write_str("Seekable"),
            RequestBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// How the caller wants a successful response body handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Decode JSON into the requested type.
    Structured,
    /// Capture the body verbatim as text.
    Text,
    /// Drop the body unread.
    Discard,
}

/// The handled response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// Decoded structured data.
    Structured(T),
    /// Verbatim text.
    Text(String),
    /// The body was not read.
    Discarded,
}

impl<T> Reply<T> {
    /// Returns the decoded value, failing for other reply kinds.
    pub fn into_structured(self) -> TransportResult<T> {
        match self {
            Reply::Structured(value) => Ok(value),
            Reply::Text(_) => Err(TransportError::Decode(
                "expected structured reply, got text".into(),
            )),
            Reply::Discarded => Err(TransportError::Decode(
                "expected structured reply, body was discarded".into(),
            )),
        }
    }

    /// Returns the captured text, failing for other reply kinds.
    pub fn into_text(self) -> TransportResult<String> {
        match self {
            Reply::Text(text) => Ok(text),
            _ => Err(TransportError::Decode("expected text reply".into())),
        }
    }
}

/// A logical request.
#[derive(Debug)]
pub struct Request {
    auth: AuthKind,
    method: Method,
    url: Url,
    body: RequestBody,
    headers: HeaderSet,
}

impl Request {
    /// Creates a request with no body and no auth.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            auth: AuthKind::None,
            method,
            url,
            body: RequestBody::Empty,
            headers: HeaderSet::new(),
        }
    }

    /// Selects the bearer token.
    #[must_use]
    pub fn auth(mut self, auth: AuthKind) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds several headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderSet) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Maps a status code onto success or its error kind.
///
/// Only 200, 201 and 202 count as success.
pub fn classify_status(status: u16) -> TransportResult<()> {
    match status {
        200 | 201 | 202 => Ok(()),
        other => Err(TransportError::from_status(other)),
    }
}

/// A live, caller-owned response body stream.
///
/// The connection behind it is released when the reader is dropped or
/// [`BlobReader::close`]d, whichever happens first.
pub struct BlobReader {
    name: String,
    inner: Box<dyn Read + Send>,
    bytes_read: u64,
}

impl BlobReader {
    /// Wraps a body stream.
    pub fn new(name: impl Into<String>, inner: Box<dyn Read + Send>) -> Self {
        Self {
            name: name.into(),
            inner,
            bytes_read: 0,
        }
    }

    /// Logical name the stream was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Releases the stream, abandoning any unread bytes.
    pub fn close(self) {
        drop(self);
    }
}

impl Read for BlobReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

impl Drop for BlobReader {
    fn drop(&mut self) {
        trace!(blob = %self.name, bytes = self.bytes_read, "closing blob stream");
    }
}

impl fmt::Debug for BlobReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobReader")
            .field("name", &self.name)
            .field("bytes_read", &self.bytes_read)
            .finish()
    }
}

/// Builds, signs and classifies HTTP exchanges.
///
/// All state is fixed at construction, so one client can be shared by
/// reference across threads issuing independent calls.
pub struct TransportClient<C: HttpClient> {
    tokens: AuthTokens,
    config: ClientConfig,
    http: C,
}

impl TransportClient<ReqwestClient> {
    /// Creates a client that talks to the network.
    pub fn connect(tokens: AuthTokens, config: ClientConfig) -> TransportResult<Self> {
        let http = ReqwestClient::new(config.timeout)?;
        Ok(Self::new(tokens, config, http))
    }
}

impl<C: HttpClient> TransportClient<C> {
    /// Creates a client over an arbitrary HTTP backend.
    pub fn new(tokens: AuthTokens, config: ClientConfig, http: C) -> Self {
        Self {
            tokens,
            config,
            http,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the HTTP backend.
    pub fn http(&self) -> &C {
        &self.http
    }

    /// Issues a read and decodes the JSON response.
    pub fn get<T: DeserializeOwned>(
        &self,
        auth: AuthKind,
        url: &Url,
        body: RequestBody,
    ) -> TransportResult<T> {
        let request = Request::new(Method::Get, url.clone()).auth(auth).body(body);
        self.execute(request, ReplyMode::Structured)?.into_structured()
    }

    /// Issues a read and captures the response verbatim.
    pub fn get_text(&self, auth: AuthKind, url: &Url) -> TransportResult<String> {
        let request = Request::new(Method::Get, url.clone()).auth(auth);
        self.execute::<()>(request, ReplyMode::Text)?.into_text()
    }

    /// Issues a POST and decodes the JSON response.
    pub fn post<T: DeserializeOwned>(
        &self,
        auth: AuthKind,
        url: &Url,
        body: RequestBody,
        headers: HeaderSet,
    ) -> TransportResult<T> {
        let request = Request::new(Method::Post, url.clone())
            .auth(auth)
            .body(body)
            .headers(headers);
        self.execute(request, ReplyMode::Structured)?.into_structured()
    }

    /// Issues a POST and captures the response verbatim.
    pub fn post_text(
        &self,
        auth: AuthKind,
        url: &Url,
        body: RequestBody,
    ) -> TransportResult<String> {
        let request = Request::new(Method::Post, url.clone()).auth(auth).body(body);
        self.execute::<()>(request, ReplyMode::Text)?.into_text()
    }

    /// Issues a PUT and decodes the JSON response.
    pub fn put<T: DeserializeOwned>(
        &self,
        auth: AuthKind,
        url: &Url,
        body: RequestBody,
        headers: HeaderSet,
    ) -> TransportResult<T> {
        let request = Request::new(Method::Put, url.clone())
            .auth(auth)
            .body(body)
            .headers(headers);
        self.execute(request, ReplyMode::Structured)?.into_structured()
    }

    /// Issues a DELETE and decodes the JSON response.
    pub fn delete<T: DeserializeOwned>(
        &self,
        auth: AuthKind,
        url: &Url,
        body: RequestBody,
    ) -> TransportResult<T> {
        let request = Request::new(Method::Delete, url.clone())
            .auth(auth)
            .body(body);
        self.execute(request, ReplyMode::Structured)?.into_structured()
    }

    /// Issues a read and hands back the live response body.
    ///
    /// Nothing is buffered; the caller owns the returned reader.
    pub fn get_stream(&self, auth: AuthKind, url: &Url, name: &str) -> TransportResult<BlobReader> {
        let request = Request::new(Method::Get, url.clone())
            .auth(auth)
            .header(HeaderName::FileName, name);
        let response = self.dispatch(request)?;
        Ok(BlobReader::new(name, response.body))
    }

    /// Streams `body` to `url` and discards the response.
    pub fn put_stream(
        &self,
        auth: AuthKind,
        url: &Url,
        name: &str,
        body: RequestBody,
    ) -> TransportResult<()> {
        let request = Request::new(Method::Put, url.clone())
            .auth(auth)
            .body(body)
            .header(HeaderName::FileName, name);
        self.execute::<()>(request, ReplyMode::Discard).map(|_| ())
    }

    /// Runs one exchange and handles the body as `mode` says.
    pub fn execute<T: DeserializeOwned>(
        &self,
        request: Request,
        mode: ReplyMode,
    ) -> TransportResult<Reply<T>> {
        let response = self.dispatch(request)?;
        match mode {
            ReplyMode::Discard => Ok(Reply::Discarded),
            ReplyMode::Text => {
                let bytes = self.read_body(response)?;
                String::from_utf8(bytes)
                    .map(Reply::Text)
                    .map_err(|e| TransportError::Decode(e.to_string()))
            }
            ReplyMode::Structured => {
                let bytes = self.read_body(response)?;
                serde_json::from_slice(&bytes)
                    .map(Reply::Structured)
                    .map_err(|e| {
                        error!(error = %e, "failed to deserialize body");
                        TransportError::Decode(e.to_string())
                    })
            }
        }
    }

    /// Signs, checksums and sends a request, returning only successful responses.
    fn dispatch(&self, request: Request) -> TransportResult<HttpResponse> {
        let Request {
            auth,
            method,
            url,
            body,
            headers: extra,
        } = request;

        let mut headers = HeaderSet::new();
        headers.insert(HeaderName::Authorization, self.authorization(auth));
        headers.insert(HeaderName::UserAgent, self.config.user_agent.clone());

        let (body, content_length, traced_body) = self.prepare_body(body, &mut headers)?;
        headers.extend(extra);

        self.trace_request(method, &url, &headers, traced_body.as_deref(), content_length);

        let response = self
            .http
            .execute(HttpRequest {
                method,
                url: url.clone(),
                headers,
                body,
                content_length,
            })
            .map_err(|e| {
                error!(%method, %url, error = %e, "http request failed");
                e
            })?;

        trace!(status = response.status, "response received");
        match classify_status(response.status) {
            Ok(()) => {
                trace!("---- end request ----");
                Ok(response)
            }
            Err(err) => {
                warn!(%method, %url, status = response.status, "request failed");
                self.trace_error_body(response);
                Err(err)
            }
        }
    }

    fn authorization(&self, auth: AuthKind) -> String {
        match auth {
            AuthKind::None => "Bearer".to_string(),
            AuthKind::Device => format!("Bearer {}", self.tokens.device_token()),
            AuthKind::User => format!("Bearer {}", self.tokens.user_token()),
        }
    }

    /// Turns the caller's body into a wire body.
    ///
    /// Rewindable bodies get an `x-content-hash` header and an explicit
    /// length, and are rewound to their start before sending.
    fn prepare_body(
        &self,
        body: RequestBody,
        headers: &mut HeaderSet,
    ) -> TransportResult<(Option<Box<dyn Read + Send>>, Option<u64>, Option<Vec<u8>>)> {
        match body {
            RequestBody::Empty => Ok((None, None, None)),
            RequestBody::Json(bytes) => {
                headers.insert(HeaderName::ContentHash, Checksum::of(&bytes).header_value());
                headers.insert(HeaderName::ContentType, JSON_CONTENT_TYPE);
                let len = bytes.len() as u64;
                let traced = (bytes.len() <= self.config.trace_body_limit).then(|| bytes.clone());
                Ok((Some(Box::new(Cursor::new(bytes))), Some(len), traced))
            }
            RequestBody::Seekable(mut reader) => {
                reader.seek(SeekFrom::Start(0))?;
                let checksum = Checksum::from_reader(&mut reader)?;
                let len = reader.stream_position()?;
                reader.seek(SeekFrom::Start(0))?;
                headers.insert(HeaderName::ContentHash, checksum.header_value());
                headers.insert(HeaderName::ContentType, OCTET_CONTENT_TYPE);
                Ok((Some(Box::new(reader)), Some(len), None))
            }
            RequestBody::Stream(reader) => {
                headers.insert(HeaderName::ContentType, OCTET_CONTENT_TYPE);
                Ok((Some(reader), None, None))
            }
        }
    }

    fn read_body(&self, mut response: HttpResponse) -> TransportResult<Vec<u8>> {
        let mut bytes = Vec::new();
        response.body.read_to_end(&mut bytes)?;
        if bytes.len() <= self.config.trace_body_limit {
            trace!(body = %String::from_utf8_lossy(&bytes), "response body");
        } else {
            trace!(len = bytes.len(), "response body not logged");
        }
        Ok(bytes)
    }

    fn trace_request(
        &self,
        method: Method,
        url: &Url,
        headers: &HeaderSet,
        body: Option<&[u8]>,
        content_length: Option<u64>,
    ) {
        if !tracing::enabled!(tracing::Level::TRACE) {
            return;
        }
        trace!("---- start request ----");
        for (name, value) in headers.iter() {
            let value = if *name == HeaderName::Authorization {
                "<redacted>"
            } else {
                value
            };
            trace!(header = %name, value, "request header");
        }
        match body {
            Some(body) => {
                let body = String::from_utf8_lossy(body);
                trace!(%method, %url, ?content_length, %body, "request");
            }
            None => trace!(%method, %url, ?content_length, "request, body not logged"),
        }
    }

    fn trace_error_body(&self, response: HttpResponse) {
        if !tracing::enabled!(tracing::Level::TRACE) {
            return;
        }
        let limit = self.config.trace_body_limit as u64;
        let mut snippet = Vec::new();
        if response.body.take(limit).read_to_end(&mut snippet).is_ok() {
            let body = String::from_utf8_lossy(&snippet);
            trace!(status = response.status, %body, "error response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// What the scripted backend saw.
    #[derive(Debug, Clone)]
    struct Seen {
        method: Method,
        url: String,
        headers: HeaderSet,
        body: Vec<u8>,
        content_length: Option<u64>,
    }

    /// Backend that answers every request with a fixed status and body.
    struct Scripted {
        status: u16,
        body: Vec<u8>,
        seen: Mutex<Vec<Seen>>,
        closed: Arc<AtomicBool>,
    }

    impl Scripted {
        fn new(status: u16, body: &[u8]) -> Self {
            Self {
                status,
                body: body.to_vec(),
                seen: Mutex::new(Vec::new()),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }

        fn last(&self) -> Seen {
            self.seen.lock().last().cloned().unwrap()
        }
    }

    /// Body that records when it is dropped.
    struct TrackedBody {
        inner: Cursor<Vec<u8>>,
        closed: Arc<AtomicBool>,
    }

    impl Read for TrackedBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for TrackedBody {
        fn drop(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    impl HttpClient for Scripted {
        fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
            let mut body = Vec::new();
            if let Some(mut reader) = request.body {
                reader.read_to_end(&mut body)?;
            }
            self.seen.lock().push(Seen {
                method: request.method,
                url: request.url.to_string(),
                headers: request.headers,
                body,
                content_length: request.content_length,
            });
            Ok(HttpResponse {
                status: self.status,
                headers: HeaderSet::new(),
                body: Box::new(TrackedBody {
                    inner: Cursor::new(self.body.clone()),
                    closed: Arc::clone(&self.closed),
                }),
            })
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pong {
        ok: bool,
    }

    fn client(status: u16, body: &[u8]) -> TransportClient<Scripted> {
        let config = ClientConfig::new(Endpoints::from_base("http://backend.test/").unwrap())
            .with_user_agent("rootsync-test");
        TransportClient::new(
            AuthTokens::new("device-tok", "user-tok"),
            config,
            Scripted::new(status, body),
        )
    }

    fn url() -> Url {
        Url::parse("http://backend.test/thing").unwrap()
    }

    #[test]
    fn success_statuses_decode() {
        for status in [200u16, 201, 202] {
            let client = client(status, br#"{"ok":true}"#);
            let pong: Pong = client.get(AuthKind::User, &url(), RequestBody::Empty).unwrap();
            assert_eq!(pong, Pong { ok: true });
        }
    }

    #[test]
    fn typed_error_statuses() {
        let cases: [(u16, fn(&TransportError) -> bool); 3] = [
            (401, |e| matches!(e, TransportError::Unauthorized)),
            (409, |e| matches!(e, TransportError::Conflict)),
            (412, |e| matches!(e, TransportError::WrongGeneration)),
        ];
        for (status, check) in cases {
            let err = client(status, b"")
                .get::<Pong>(AuthKind::User, &url(), RequestBody::Empty)
                .unwrap_err();
            assert!(check(&err), "status {status} gave {err:?}");
        }
    }

    #[test]
    fn generic_error_statuses_carry_code() {
        for status in [500u16, 404, 418, 204] {
            let err = client(status, b"")
                .post::<Pong>(AuthKind::User, &url(), RequestBody::Empty, HeaderSet::new())
                .unwrap_err();
            assert!(matches!(err, TransportError::Status(code) if code == status));
        }
    }

    proptest! {
        #[test]
        fn classification_is_total(status in 100u16..600) {
            let result = classify_status(status);
            match status {
                200 | 201 | 202 => prop_assert!(result.is_ok()),
                _ => prop_assert_eq!(result.unwrap_err().status(), Some(status)),
            }
        }
    }

    #[test]
    fn auth_modes_select_tokens() {
        let client = client(200, b"{}");
        let cases = [
            (AuthKind::None, "Bearer"),
            (AuthKind::Device, "Bearer device-tok"),
            (AuthKind::User, "Bearer user-tok"),
        ];
        for (auth, expected) in cases {
            client
                .put_stream(auth, &url(), "n", RequestBody::Empty)
                .unwrap();
            let seen = client.http().last();
            assert_eq!(seen.headers.get(&HeaderName::Authorization), Some(expected));
            assert_eq!(
                seen.headers.get(&HeaderName::UserAgent),
                Some("rootsync-test")
            );
        }
    }

    #[test]
    fn known_len_counts_the_whole_rewindable_body() {
        let mut cursor = Cursor::new(vec![7u8; 10]);
        cursor.seek(SeekFrom::Start(8)).unwrap();
        let mut body = RequestBody::seekable(cursor);

        assert_eq!(body.known_len().unwrap(), Some(10));

        let client = client(200, b"");
        client
            .put_stream(AuthKind::User, &url(), "tail", body)
            .unwrap();
        let seen = client.http().last();
        assert_eq!(seen.body.len(), 10);
        assert_eq!(seen.content_length, Some(10));
    }

    #[test]
    fn seekable_body_is_checksummed_and_rewound() {
        let client = client(200, b"");
        let mut cursor = Cursor::new(b"123456789".to_vec());
        cursor.seek(SeekFrom::Start(4)).unwrap();

        client
            .put_stream(AuthKind::User, &url(), "digits", RequestBody::seekable(cursor))
            .unwrap();

        let seen = client.http().last();
        assert_eq!(seen.method, Method::Put);
        assert_eq!(seen.body, b"123456789");
        assert_eq!(seen.content_length, Some(9));
        assert_eq!(
            seen.headers.get(&HeaderName::ContentHash),
            Some("crc32c=4waSgw==")
        );
        assert_eq!(seen.headers.get(&HeaderName::FileName), Some("digits"));
        assert_eq!(
            seen.headers.get(&HeaderName::ContentType),
            Some("application/octet-stream")
        );
    }

    #[test]
    fn forward_only_body_has_no_checksum() {
        let client = client(200, b"");
        let reader = io::repeat(7).take(1000);
        client
            .put_stream(AuthKind::User, &url(), "stream", RequestBody::stream(reader))
            .unwrap();

        let seen = client.http().last();
        assert_eq!(seen.body.len(), 1000);
        assert_eq!(seen.content_length, None);
        assert_eq!(seen.headers.get(&HeaderName::ContentHash), None);
    }

    #[test]
    fn json_body_is_serialized_and_checksummed() {
        #[derive(Serialize)]
        struct Ping {
            n: u32,
        }
        let client = client(200, br#"{"ok":false}"#);
        let pong: Pong = client
            .post(
                AuthKind::Device,
                &url(),
                RequestBody::json(&Ping { n: 5 }).unwrap(),
                HeaderSet::new().with(HeaderName::Other("x-extra".into()), "1"),
            )
            .unwrap();
        assert!(!pong.ok);

        let seen = client.http().last();
        assert_eq!(seen.body, br#"{"n":5}"#);
        assert_eq!(
            seen.headers.get(&HeaderName::ContentHash),
            Some(Checksum::of(br#"{"n":5}"#).header_value().as_str())
        );
        assert_eq!(
            seen.headers.get(&HeaderName::ContentType),
            Some("application/json")
        );
        assert_eq!(
            seen.headers.get(&HeaderName::Other("x-extra".into())),
            Some("1")
        );
    }

    #[test]
    fn decode_failure_is_surfaced() {
        let err = client(200, b"not json")
            .get::<Pong>(AuthKind::User, &url(), RequestBody::Empty)
            .unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));

        let err = client(200, br#"{"other":1}"#)
            .get::<Pong>(AuthKind::User, &url(), RequestBody::Empty)
            .unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn text_capture_is_verbatim() {
        let client = client(200, b"  raw {not json}\n");
        assert_eq!(
            client.get_text(AuthKind::User, &url()).unwrap(),
            "  raw {not json}\n"
        );
        assert_eq!(
            client
                .post_text(AuthKind::User, &url(), RequestBody::bytes("x"))
                .unwrap(),
            "  raw {not json}\n"
        );
    }

    #[test]
    fn delete_decodes() {
        let client = client(202, br#"{"ok":true}"#);
        let pong: Pong = client
            .delete(AuthKind::User, &url(), RequestBody::Empty)
            .unwrap();
        assert!(pong.ok);
        assert_eq!(client.http().last().method, Method::Delete);
    }

    #[test]
    fn stream_is_live_and_released_on_early_close() {
        let client = client(200, &vec![9u8; 4096]);
        let mut reader = client.get_stream(AuthKind::User, &url(), "big").unwrap();
        assert!(!client.http().closed.load(Ordering::SeqCst));

        let mut first = [0u8; 16];
        reader.read_exact(&mut first).unwrap();
        assert_eq!(reader.bytes_read(), 16);
        assert_eq!(reader.name(), "big");
        assert_eq!(
            client.http().last().headers.get(&HeaderName::FileName),
            Some("big")
        );

        reader.close();
        assert!(client.http().closed.load(Ordering::SeqCst));
    }

    #[test]
    fn failed_responses_release_the_body() {
        let client = client(500, b"boom");
        assert!(client.get_stream(AuthKind::User, &url(), "x").is_err());
        assert!(client.http().closed.load(Ordering::SeqCst));
    }

    #[test]
    fn known_len_does_not_consume() {
        let mut body = RequestBody::bytes(vec![1u8; 10]);
        assert_eq!(body.known_len().unwrap(), Some(10));
        assert_eq!(body.known_len().unwrap(), Some(10));
        assert_eq!(RequestBody::stream(io::empty()).known_len().unwrap(), None);
        assert_eq!(
            RequestBody::json(&[1, 2]).unwrap().known_len().unwrap(),
            Some(5)
        );
    }

    #[test]
    fn trace_logging_covers_bodies_and_error_responses() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let failing = client(500, b"backend exploded");
            let body = RequestBody::json(&[1, 2]).unwrap();
            let err = failing
                .post::<Pong>(AuthKind::User, &url(), body, HeaderSet::new())
                .unwrap_err();
            assert_eq!(err.status(), Some(500));
            assert_eq!(failing.http().last().body, b"[1,2]");

            let ok = client(200, br#"{"ok":true}"#);
            let pong: Pong = ok.get(AuthKind::User, &url(), RequestBody::Empty).unwrap();
            assert_eq!(pong, Pong { ok: true });
        });
    }

    #[test]
    fn reply_accessors() {
        assert_eq!(Reply::Structured(3).into_structured().unwrap(), 3);
        assert!(Reply::<u8>::Discarded.into_structured().is_err());
        assert!(Reply::<u8>::Text("t".into()).into_structured().is_err());
        assert_eq!(Reply::<u8>::Text("t".into()).into_text().unwrap(), "t");
    }
}

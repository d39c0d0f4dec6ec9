//! The reference blob server.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{HandlerContext, RequestHandler, ServerRequest, ServerResponse};
use rootsync_protocol::{ContentHash, RootIndexRecord, RootWriteRequest};
use std::sync::Arc;
use tracing::{trace, warn};

/// In-memory backend speaking the blob and root-index protocol.
///
/// The server is cheap to clone; clones share state.
///
/// # Example
///
/// ```
/// use rootsync_protocol::Method;
/// use rootsync_server::{BlobServer, ServerConfig, ServerRequest};
///
/// let server = BlobServer::new(ServerConfig::default().with_user_token("t"));
/// let request = ServerRequest::new(Method::Get, "/sync/v3/root").with_bearer("t");
/// let response = server.handle(&request);
/// assert_eq!(response.status, 200);
/// ```
#[derive(Clone)]
pub struct BlobServer {
    context: Arc<HandlerContext>,
}

impl BlobServer {
    /// Creates an empty server.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            context: Arc::new(HandlerContext::new(config)),
        }
    }

    /// Handles one request. Failures become error responses.
    pub fn handle(&self, request: &ServerRequest) -> ServerResponse {
        let len = request.body.len();
        trace!(method = %request.method, path = %request.target, len, "request");
        match RequestHandler::new(&self.context).dispatch(request) {
            Ok(response) => {
                trace!(status = response.status, "response");
                response
            }
            Err(e) => {
                warn!(
                    method = %request.method,
                    path = %request.target,
                    status = e.status_code(),
                    "request failed: {}",
                    e
                );
                ServerResponse::error(&e)
            }
        }
    }

    /// Writes the root directly, as another device would.
    pub fn write_root(&self, request: &RootWriteRequest) -> ServerResult<RootIndexRecord> {
        self.context.roots.compare_and_swap(request)
    }

    /// Returns the current root record.
    pub fn root(&self) -> RootIndexRecord {
        self.context.roots.current()
    }

    /// Returns the stored bytes of a blob.
    pub fn blob(&self, hash: &ContentHash) -> Option<Vec<u8>> {
        self.context.blobs.get(hash).ok()
    }

    /// Returns the number of stored blobs.
    pub fn blob_count(&self) -> usize {
        self.context.blobs.len()
    }

    /// Number of accepted root writes that asked for a broadcast.
    pub fn broadcast_count(&self) -> u64 {
        self.context.roots.broadcast_count()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }
}

impl Default for BlobServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

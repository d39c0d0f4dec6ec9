//! Blob resource accessor and the root-index compare-and-swap.

use crate::client::{AuthKind, BlobReader, RequestBody, TransportClient};
use crate::error::{TransportError, TransportResult};
use crate::http::HttpClient;
use rootsync_protocol::{
    BlobUrlRequest, BlobUrlResponse, ContentHash, Generation, HeaderName, HeaderSet,
    RootIndexRecord, RootWriteRequest, ROOT_FILENAME,
};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Access to content-addressed blobs and the root pointer.
///
/// Every call uses the user-scoped token.
///
/// # Root updates
///
/// To move the root, read it with [`BlobStorage::get_root_index`], then call
/// [`BlobStorage::write_root_index`] with the generation you read. If another
/// writer got there first the write fails with
/// [`TransportError::WrongGeneration`]; re-read, reconcile and try again.
/// Nothing here retries on its own.
pub struct BlobStorage<C: HttpClient> {
    transport: Arc<TransportClient<C>>,
    notify: bool,
}

impl<C: HttpClient> Clone for BlobStorage<C> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            notify: self.notify,
        }
    }
}

impl<C: HttpClient> BlobStorage<C> {
    /// Creates an accessor over a shared transport.
    ///
    /// Root writes made through [`crate::RemoteStorageWriter`] broadcast by
    /// default; see [`BlobStorage::with_notify`].
    pub fn new(transport: Arc<TransportClient<C>>) -> Self {
        Self {
            transport,
            notify: true,
        }
    }

    /// Sets the notify flag used by [`crate::RemoteStorageWriter::update_root_index`].
    #[must_use]
    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    /// Returns the notify flag.
    pub fn notify(&self) -> bool {
        self.notify
    }

    /// Returns the transport.
    pub fn transport(&self) -> &TransportClient<C> {
        &self.transport
    }

    /// Requests a delegated access grant.
    pub fn request_url(&self, request: &BlobUrlRequest) -> TransportResult<BlobUrlResponse> {
        let endpoints = &self.transport.config().endpoints;
        let target = if request.method == rootsync_protocol::Method::Put {
            &endpoints.upload_url
        } else {
            &endpoints.download_url
        };
        self.transport.post(
            AuthKind::User,
            target,
            RequestBody::json(request)?,
            HeaderSet::new(),
        )
    }

    /// Returns a signed GET location for `hash`.
    pub fn get_url(&self, hash: &ContentHash) -> TransportResult<String> {
        debug!(%hash, "fetching GET blob url");
        let response = self.request_url(&BlobUrlRequest::download(hash.clone()))?;
        Ok(response.url)
    }

    /// Returns a signed PUT location for `hash` and the largest payload it takes.
    pub fn put_url(&self, hash: &ContentHash) -> TransportResult<(String, u64)> {
        debug!(%hash, "fetching PUT blob url");
        let response = self.request_url(&BlobUrlRequest::upload(hash.clone()))?;
        Ok((response.url, response.max_upload_size_bytes))
    }

    /// Returns a signed PUT location for a root blob.
    pub fn put_root_url(
        &self,
        hash: &ContentHash,
        generation: Generation,
        notify: bool,
    ) -> TransportResult<(String, u64)> {
        debug!(%hash, %generation, "fetching ROOT url");
        let request = RootWriteRequest::new(hash.clone(), generation, notify);
        let response: BlobUrlResponse = self.transport.post(
            AuthKind::User,
            &self.transport.config().endpoints.root,
            RequestBody::json(&request)?,
            HeaderSet::new(),
        )?;
        Ok((response.url, response.max_upload_size_bytes))
    }

    /// Opens a live reader on the blob's direct content path.
    pub fn get_reader(&self, hash: &ContentHash, name: &str) -> TransportResult<BlobReader> {
        let url = self.transport.config().endpoints.blob(hash)?;
        self.transport.get_stream(AuthKind::User, &url, name)
    }

    /// Streams a blob to its direct content path.
    pub fn upload_blob(
        &self,
        hash: &ContentHash,
        name: &str,
        body: RequestBody,
    ) -> TransportResult<()> {
        debug!(%hash, name, "uploading blob");
        let url = self.transport.config().endpoints.blob(hash)?;
        self.transport.put_stream(AuthKind::User, &url, name, body)
    }

    /// Downloads through a signed URL instead of the direct path.
    pub fn download_via_url(&self, hash: &ContentHash, name: &str) -> TransportResult<BlobReader> {
        let url = parse_signed(&self.get_url(hash)?)?;
        self.transport.get_stream(AuthKind::None, &url, name)
    }

    /// Uploads through a signed URL, enforcing the grant's size limit.
    pub fn upload_via_url(
        &self,
        hash: &ContentHash,
        name: &str,
        mut body: RequestBody,
    ) -> TransportResult<()> {
        let (url, max) = self.put_url(hash)?;
        if let Some(size) = body.known_len()? {
            if max > 0 && size > max {
                return Err(TransportError::UploadTooLarge { size, max });
            }
        }
        let url = parse_signed(&url)?;
        self.transport.put_stream(AuthKind::None, &url, name, body)
    }

    /// Compare-and-swap write of the root pointer.
    ///
    /// Succeeds only if `generation` is still the server's current
    /// generation, returning the new one. The echoed hash must equal the
    /// submitted one; anything else is reported as
    /// [`TransportError::RootHashMismatch`] and the write is not treated as
    /// successful.
    pub fn write_root_index(
        &self,
        hash: &ContentHash,
        generation: Generation,
        notify: bool,
    ) -> TransportResult<Generation> {
        info!(%hash, %generation, notify, "writing root");
        let request = RootWriteRequest::new(hash.clone(), generation, notify);
        let record: RootIndexRecord = self.transport.put(
            AuthKind::User,
            &self.transport.config().endpoints.root,
            RequestBody::json(&request)?,
            HeaderSet::new().with(HeaderName::FileName, ROOT_FILENAME),
        )?;

        if record.hash != *hash {
            return Err(TransportError::RootHashMismatch {
                expected: hash.clone(),
                actual: record.hash,
            });
        }

        info!(generation = %record.generation, "root written");
        Ok(record.generation)
    }

    /// Fetches the full current root record.
    pub fn root_record(&self) -> TransportResult<RootIndexRecord> {
        let record: RootIndexRecord = self.transport.get(
            AuthKind::User,
            &self.transport.config().endpoints.root,
            RequestBody::Empty,
        )?;
        info!(generation = %record.generation, "got root");
        Ok(record)
    }

    /// Fetches the current root hash and generation.
    pub fn get_root_index(&self) -> TransportResult<(ContentHash, Generation)> {
        let record = self.root_record()?;
        Ok((record.hash, record.generation))
    }
}

fn parse_signed(url: &str) -> TransportResult<Url> {
    Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))
}

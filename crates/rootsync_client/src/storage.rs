//! Remote storage capabilities used by sync orchestrators.
//!
//! Reading and writing are separate capabilities. A holder of only a
//! [`RemoteStorage`] cannot mutate the remote tree.

use crate::blob::BlobStorage;
use crate::client::{BlobReader, RequestBody};
use crate::error::{TransportError, TransportResult};
use crate::http::HttpClient;
use parking_lot::RwLock;
use rootsync_protocol::{ContentHash, Generation, RootIndexRecord, SCHEMA_VERSION};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Read-only access to the remote tree.
pub trait RemoteStorage: Send + Sync {
    /// Returns the current root hash and its generation.
    fn get_root_index(&self) -> TransportResult<(ContentHash, Generation)>;

    /// Opens a reader on the blob `hash`. The caller must drop it on every path.
    fn get_reader(&self, hash: &ContentHash, name: &str) -> TransportResult<BlobReader>;
}

/// Mutating access to the remote tree.
pub trait RemoteStorageWriter: Send + Sync {
    /// Compare-and-swap of the root pointer.
    ///
    /// Fails with [`TransportError::WrongGeneration`] when `generation` is no
    /// longer current.
    fn update_root_index(
        &self,
        hash: &ContentHash,
        generation: Generation,
    ) -> TransportResult<Generation>;

    /// Delivers `content` to the remote blob `hash`.
    fn get_writer(
        &self,
        hash: &ContentHash,
        name: &str,
        content: RequestBody,
    ) -> TransportResult<()>;
}

impl<C: HttpClient> RemoteStorage for BlobStorage<C> {
    fn get_root_index(&self) -> TransportResult<(ContentHash, Generation)> {
        BlobStorage::get_root_index(self)
    }

    fn get_reader(&self, hash: &ContentHash, name: &str) -> TransportResult<BlobReader> {
        BlobStorage::get_reader(self, hash, name)
    }
}

impl<C: HttpClient> RemoteStorageWriter for BlobStorage<C> {
    fn update_root_index(
        &self,
        hash: &ContentHash,
        generation: Generation,
    ) -> TransportResult<Generation> {
        self.write_root_index(hash, generation, self.notify())
    }

    fn get_writer(
        &self,
        hash: &ContentHash,
        name: &str,
        content: RequestBody,
    ) -> TransportResult<()> {
        self.upload_blob(hash, name, content)
    }
}

/// In-memory remote storage with the same compare-and-swap rules as a real
/// backend.
///
/// # Example
///
/// ```rust
/// use rootsync_client::{MemoryRemoteStorage, RemoteStorage, RemoteStorageWriter};
///
/// let remote = MemoryRemoteStorage::new();
/// let (_, current) = remote.get_root_index().unwrap();
/// let next = remote.update_root_index(&"root-a".into(), current).unwrap();
/// assert!(next > current);
/// ```
#[derive(Debug, Default)]
pub struct MemoryRemoteStorage {
    root: RwLock<RootIndexRecord>,
    blobs: RwLock<HashMap<ContentHash, Vec<u8>>>,
}

impl MemoryRemoteStorage {
    /// Creates an empty store at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored bytes of a blob.
    pub fn blob(&self, hash: &ContentHash) -> Option<Vec<u8>> {
        self.blobs.read().get(hash).cloned()
    }

    /// Returns the number of stored blobs.
    pub fn blob_count(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns the current root record.
    pub fn root(&self) -> RootIndexRecord {
        self.root.read().clone()
    }
}

impl RemoteStorage for MemoryRemoteStorage {
    fn get_root_index(&self) -> TransportResult<(ContentHash, Generation)> {
        let root = self.root.read();
        Ok((root.hash.clone(), root.generation))
    }

    fn get_reader(&self, hash: &ContentHash, name: &str) -> TransportResult<BlobReader> {
        let data = self
            .blob(hash)
            .ok_or_else(|| TransportError::NotFound(hash.to_string()))?;
        Ok(BlobReader::new(name, Box::new(Cursor::new(data))))
    }
}

impl RemoteStorageWriter for MemoryRemoteStorage {
    fn update_root_index(
        &self,
        hash: &ContentHash,
        generation: Generation,
    ) -> TransportResult<Generation> {
        let mut root = self.root.write();
        if root.generation != generation {
            return Err(TransportError::WrongGeneration);
        }
        let next = generation
            .next()
            .ok_or(TransportError::GenerationExhausted(generation))?;
        *root = RootIndexRecord::new(hash.clone(), next, SCHEMA_VERSION);
        Ok(root.generation)
    }

    fn get_writer(
        &self,
        hash: &ContentHash,
        _name: &str,
        content: RequestBody,
    ) -> TransportResult<()> {
        let mut data = Vec::new();
        match content {
            RequestBody::Empty => {}
            RequestBody::Json(bytes) => data = bytes,
            RequestBody::Seekable(mut reader) => {
                reader.seek(SeekFrom::Start(0))?;
                reader.read_to_end(&mut data)?;
            }
            RequestBody::Stream(mut reader) => {
                reader.read_to_end(&mut data)?;
            }
        }
        self.blobs.write().insert(hash.clone(), data);
        Ok(())
    }
}

//! In-memory root pointer and blob storage.

use crate::error::{ServerError, ServerResult};
use parking_lot::RwLock;
use rootsync_protocol::{ContentHash, Generation, RootIndexRecord, RootWriteRequest, SCHEMA_VERSION};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// The root pointer with generation-checked updates.
#[derive(Debug, Default)]
pub struct RootStore {
    record: RwLock<RootIndexRecord>,
    broadcasts: AtomicU64,
}

impl RootStore {
    /// Creates an empty root at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current record.
    pub fn current(&self) -> RootIndexRecord {
        self.record.read().clone()
    }

    /// Fails unless `generation` is current.
    pub fn check(&self, generation: Generation) -> ServerResult<()> {
        let current = self.record.read().generation;
        if current == generation {
            Ok(())
        } else {
            Err(ServerError::WrongGeneration {
                current,
                requested: generation,
            })
        }
    }

    /// Applies a root write if it names the current generation.
    ///
    /// The check and the swap happen under one write lock, so of several
    /// writers naming the same generation exactly one succeeds.
    pub fn compare_and_swap(&self, request: &RootWriteRequest) -> ServerResult<RootIndexRecord> {
        let mut record = self.record.write();
        if record.generation != request.generation {
            return Err(ServerError::WrongGeneration {
                current: record.generation,
                requested: request.generation,
            });
        }
        let next = request.generation.next().ok_or_else(|| {
            ServerError::Internal(format!("generation {} cannot advance", request.generation))
        })?;
        *record = RootIndexRecord::new(request.hash.clone(), next, SCHEMA_VERSION);
        if request.broadcast {
            self.broadcasts.fetch_add(1, Ordering::Relaxed);
        }
        Ok(record.clone())
    }

    /// Number of accepted writes that asked for a broadcast.
    pub fn broadcast_count(&self) -> u64 {
        self.broadcasts.load(Ordering::Relaxed)
    }
}

/// Content-addressed blob storage.
#[derive(Debug, Default)]
pub struct BlobStore {
    blobs: RwLock<HashMap<ContentHash, Vec<u8>>>,
}

impl BlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes stored under `hash`.
    pub fn get(&self, hash: &ContentHash) -> ServerResult<Vec<u8>> {
        self.blobs
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| ServerError::NotFound(hash.to_string()))
    }

    /// Stores `data` under `hash`, returning true if the blob is new.
    ///
    /// Re-uploading identical bytes is accepted. Different bytes under an
    /// existing hash are a conflict.
    pub fn put(&self, hash: ContentHash, data: Vec<u8>) -> ServerResult<bool> {
        let mut blobs = self.blobs.write();
        if let Some(existing) = blobs.get(&hash) {
            if *existing != data {
                return Err(ServerError::Conflict(format!(
                    "blob {hash} already holds different content"
                )));
            }
            return Ok(false);
        }
        blobs.insert(hash, data);
        Ok(true)
    }

    /// Returns true if a blob is stored under `hash`.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.blobs.read().contains_key(hash)
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns true if no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

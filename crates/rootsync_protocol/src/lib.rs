//! # rootsync protocol
//!
//! Wire types and integrity primitives for the rootsync root-index protocol.
//!
//! This crate provides:
//! - `AuthTokens`, `Generation`, `ContentHash` for the data model
//! - `RootIndexRecord` and `RootWriteRequest` for the compare-and-swap root pointer
//! - `BlobUrlRequest` / `BlobUrlResponse` for delegated blob access grants
//! - `Method` and `HeaderSet` for typed request metadata
//! - `Checksum` for CRC32C (Castagnoli) upload integrity headers
//!
//! This is a pure protocol crate with no I/O operations beyond reading
//! caller-supplied byte sources when computing a checksum.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checksum;
mod error;
mod headers;
mod messages;
mod types;

pub use checksum::Checksum;
pub use error::{ProtocolError, ProtocolResult};
pub use headers::{HeaderName, HeaderSet, Method};
pub use messages::{BlobUrlRequest, BlobUrlResponse, RootIndexRecord, RootWriteRequest};
pub use types::{AuthTokens, ContentHash, Generation, ROOT_FILENAME};

/// Schema version written into root records by this implementation.
pub const SCHEMA_VERSION: u32 = 3;

//! # rootsync client
//!
//! Client-side core for synchronizing a document tree against a
//! content-addressed blob store.
//!
//! This crate provides:
//! - `TransportClient`: signs, checksums (CRC32C), dispatches and classifies requests
//! - `BlobStorage`: signed blob URLs, blob streaming, and the root-index
//!   compare-and-swap
//! - `RemoteStorage` / `RemoteStorageWriter`: read-only and read-write
//!   capabilities for sync orchestrators
//! - HTTP backend abstraction with a `reqwest` implementation and a loopback
//!   implementation for tests
//!
//! ## Architecture
//!
//! orchestrator → `RemoteStorage` → `BlobStorage` → `TransportClient` → `HttpClient`
//!
//! Every call blocks until its exchange completes. The client holds only
//! immutable state after construction, so callers may share it across
//! threads and run independent transfers in parallel.
//!
//! ## Key Invariants
//!
//! - Only 200, 201 and 202 are successes; 401, 409 and 412 map to typed errors
//! - A root write succeeds only against the server's current generation
//! - A root write whose echoed hash differs from the submitted one is fatal
//! - No retries happen in this crate

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod blob;
mod client;
mod config;
mod error;
mod http;
mod storage;

pub use blob::BlobStorage;
pub use client::{
    classify_status, AuthKind, BlobReader, Reply, ReplyMode, Request, RequestBody, SeekableBody,
    TransportClient,
};
pub use config::{ClientConfig, Endpoints, DEFAULT_TIMEOUT, DEFAULT_TRACE_BODY_LIMIT};
pub use error::{TransportError, TransportResult};
pub use http::{
    HttpClient, HttpRequest, HttpResponse, LoopbackClient, LoopbackRequest, LoopbackResponse,
    LoopbackServer, ReqwestClient,
};
pub use storage::{MemoryRemoteStorage, RemoteStorage, RemoteStorageWriter};

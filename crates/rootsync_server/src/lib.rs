//! # rootsync server
//!
//! In-memory reference backend for the rootsync protocol.
//!
//! This crate provides:
//! - The root index with generation-checked compare-and-swap
//! - A content-addressed blob store with size and CRC32C checks
//! - Bearer-token checks on API routes
//! - HMAC-SHA256 signed, time-limited blob URLs
//!
//! # Architecture
//!
//! The server is transport-agnostic: [`BlobServer::handle`] takes a fully
//! buffered [`ServerRequest`] and returns a [`ServerResponse`]. Tests and
//! local tooling connect it to a client in-process; no listener is bundled.
//!
//! # Routes
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /sync/v3/root` | read the root record |
//! | `PUT /sync/v3/root` | compare-and-swap the root |
//! | `POST /sync/v3/root` | signed upload URL for a new root blob |
//! | `POST /signed-urls/uploads` | signed upload URL |
//! | `POST /signed-urls/downloads` | signed download URL |
//! | `GET/PUT /sync/v3/files/<hash>` | direct blob transfer |
//! | `GET/PUT /signed/<hash>?...` | signed blob transfer, no bearer |

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod server;
mod store;

pub use auth::{SignedQuery, SignedUrl, TokenValidator, UrlSigner};
pub use config::{ServerConfig, DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_URL_TTL};
pub use error::{ServerError, ServerResult};
pub use handler::{
    HandlerContext, RequestHandler, ServerRequest, ServerResponse, BLOB_PREFIX, DOWNLOAD_URL_PATH,
    ROOT_PATH, UPLOAD_URL_PATH,
};
pub use server::BlobServer;
pub use store::{BlobStore, RootStore};

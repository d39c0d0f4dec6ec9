//! JSON messages exchanged with the blob and root endpoints.

use crate::headers::Method;
use crate::types::{ContentHash, Generation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request for a delegated, time-limited blob access URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobUrlRequest {
    /// Operation the URL will be used for.
    #[serde(rename = "http_method")]
    pub method: Method,
    /// Set during the first sync of a device.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub initial_sync: bool,
    /// Blob hash the grant is for.
    pub relative_path: ContentHash,
    /// Optional hash of the containing entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
}

impl BlobUrlRequest {
    /// Requests a URL for reading `hash`.
    pub fn download(hash: ContentHash) -> Self {
        Self::new(Method::Get, hash)
    }

    /// Requests a URL for writing `hash`.
    pub fn upload(hash: ContentHash) -> Self {
        Self::new(Method::Put, hash)
    }

    fn new(method: Method, relative_path: ContentHash) -> Self {
        Self {
            method,
            initial_sync: false,
            relative_path,
            parent_path: None,
        }
    }

    /// Sets the parent path.
    #[must_use]
    pub fn with_parent_path(mut self, parent: impl Into<String>) -> Self {
        self.parent_path = Some(parent.into());
        self
    }

    /// Marks the request as part of an initial sync.
    #[must_use]
    pub fn with_initial_sync(mut self, initial: bool) -> Self {
        self.initial_sync = initial;
        self
    }
}

/// A short-lived access grant for one blob operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobUrlResponse {
    /// When the URL stops being accepted, as sent by the backend.
    ///
    /// Kept verbatim; [`BlobUrlResponse::expires_at`] interprets it.
    #[serde(default)]
    pub expires: String,
    /// Method the URL is valid for.
    pub method: Method,
    /// Blob hash the grant is for.
    pub relative_path: ContentHash,
    /// Absolute URL to transfer against.
    pub url: String,
    /// Largest payload the URL accepts; zero for downloads.
    #[serde(rename = "maxuploadsize_bytes", default)]
    pub max_upload_size_bytes: u64,
}

impl BlobUrlResponse {
    /// Parses the expiry as an RFC 3339 timestamp.
    ///
    /// Returns `None` when the backend sent nothing or another format.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.expires.trim())
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }

    /// Returns true once `now` is at or past a parseable expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires| now >= expires)
    }
}

/// Compare-and-swap write of the root pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootWriteRequest {
    /// Ask the backend to notify other devices about the new root.
    pub broadcast: bool,
    /// New root hash.
    pub hash: ContentHash,
    /// Generation the caller believes is current.
    pub generation: Generation,
}

impl RootWriteRequest {
    /// Creates a root write request.
    pub fn new(hash: ContentHash, generation: Generation, broadcast: bool) -> Self {
        Self {
            broadcast,
            hash,
            generation,
        }
    }
}

/// The single pointer to the current state of the synchronized tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootIndexRecord {
    /// Hash of the root blob.
    pub hash: ContentHash,
    /// Generation of this record.
    pub generation: Generation,
    /// Schema version of the tree the root points to.
    #[serde(rename = "schemaVersion", default)]
    pub schema_version: u32,
}

impl RootIndexRecord {
    /// Creates a root record.
    pub fn new(hash: ContentHash, generation: Generation, schema_version: u32) -> Self {
        Self {
            hash,
            generation,
            schema_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blob_url_request_omits_unset_fields() {
        let req = BlobUrlRequest::upload("h1".into());
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"http_method": "PUT", "relative_path": "h1"})
        );

        let req = BlobUrlRequest::download("h2".into())
            .with_parent_path("p")
            .with_initial_sync(true);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "http_method": "GET",
                "relative_path": "h2",
                "parent_path": "p",
                "initial_sync": true
            })
        );
    }

    #[test]
    fn blob_url_response_from_wire() {
        let resp: BlobUrlResponse = serde_json::from_value(json!({
            "expires": "2026-01-02T03:04:05Z",
            "method": "PUT",
            "relative_path": "abc",
            "url": "https://storage.example.com/abc?sig=1",
            "maxuploadsize_bytes": 1024
        }))
        .unwrap();
        assert_eq!(resp.method, Method::Put);
        assert_eq!(resp.max_upload_size_bytes, 1024);
        let expires = resp.expires_at().unwrap();
        assert_eq!(expires.to_rfc3339(), "2026-01-02T03:04:05+00:00");
        assert!(resp.is_expired_at(expires));
        assert!(!resp.is_expired_at(expires - chrono::Duration::seconds(1)));

        let resp: BlobUrlResponse = serde_json::from_value(json!({
            "expires": "2026-01-02T03:04:05Z",
            "method": "GET",
            "relative_path": "abc",
            "url": "https://storage.example.com/abc"
        }))
        .unwrap();
        assert_eq!(resp.max_upload_size_bytes, 0);
    }

    #[test]
    fn grant_with_unparsed_expiry_still_decodes() {
        for expires in ["", "2030-01-01 00:00:00", "soon"] {
            let resp: BlobUrlResponse = serde_json::from_value(json!({
                "expires": expires,
                "method": "GET",
                "relative_path": "abc",
                "url": "https://storage.example.com/abc"
            }))
            .unwrap();
            assert_eq!(resp.expires, expires);
            assert_eq!(resp.expires_at(), None);
            assert!(!resp.is_expired_at(Utc::now()));
        }

        let resp: BlobUrlResponse = serde_json::from_value(json!({
            "method": "PUT",
            "relative_path": "abc",
            "url": "https://storage.example.com/abc"
        }))
        .unwrap();
        assert!(resp.expires.is_empty());
    }

    #[test]
    fn root_messages_use_wire_names() {
        let req = RootWriteRequest::new("r".into(), Generation(7), true);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"broadcast": true, "hash": "r", "generation": 7})
        );

        let record: RootIndexRecord =
            serde_json::from_value(json!({"hash": "r", "generation": 8, "schemaVersion": 3}))
                .unwrap();
        assert_eq!(record.generation, Generation(8));
        assert_eq!(record.schema_version, 3);
    }
}

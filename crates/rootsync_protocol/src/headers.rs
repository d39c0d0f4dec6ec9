//! Typed request metadata: HTTP methods and header sets.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP methods used by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Read.
    Get,
    /// Create / request a grant.
    Post,
    /// Write.
    Put,
    /// Remove.
    Delete,
}

impl Method {
    /// Returns the canonical upper-case verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(ProtocolError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Header names known to the protocol, plus an escape hatch for extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderName {
    /// `authorization`
    Authorization,
    /// `user-agent`
    UserAgent,
    /// `content-type`
    ContentType,
    /// `x-filename`: logical name of the blob being transferred.
    FileName,
    /// `x-content-hash`: `crc32c=<base64>` integrity header.
    ContentHash,
    /// Any other header, stored lower-cased.
    Other(String),
}

impl HeaderName {
    /// Returns the lower-case wire name.
    pub fn as_str(&self) -> &str {
        match self {
            HeaderName::Authorization => "authorization",
            HeaderName::UserAgent => "user-agent",
            HeaderName::ContentType => "content-type",
            HeaderName::FileName => "x-filename",
            HeaderName::ContentHash => "x-content-hash",
            HeaderName::Other(name) => name,
        }
    }

    /// Parses a wire name, mapping known names onto their variants.
    pub fn parse(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "authorization" => HeaderName::Authorization,
            "user-agent" => HeaderName::UserAgent,
            "content-type" => HeaderName::ContentType,
            "x-filename" => HeaderName::FileName,
            "x-content-hash" => HeaderName::ContentHash,
            _ => HeaderName::Other(lower),
        }
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered set of headers with at most one value per name.
///
/// Inserting an existing name replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(HeaderName, String)>,
}

impl HeaderSet {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any previous value.
    pub fn insert(&mut self, name: HeaderName, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of [`HeaderSet::insert`].
    #[must_use]
    pub fn with(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value of a header.
    pub fn get(&self, name: &HeaderName) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &HeaderName) -> Option<String> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    /// Copies every header from `other` into `self`, overriding duplicates.
    pub fn extend(&mut self, other: HeaderSet) {
        for (name, value) in other.entries {
            self.insert(name, value);
        }
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &str)> {
        self.entries.iter().map(|(n, v)| (n, v.as_str()))
    }

    /// Returns the number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no headers are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the bearer token from the `authorization` header, if any.
    ///
    /// A bare `Bearer` value yields `Some("")`.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.get(&HeaderName::Authorization)?;
        let rest = value.strip_prefix("Bearer")?;
        Some(rest.trim_start())
    }
}

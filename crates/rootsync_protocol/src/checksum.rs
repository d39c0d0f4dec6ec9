//! CRC32C (Castagnoli) upload checksums.
//!
//! The checksum travels in the `x-content-hash` header as
//! `crc32c=<base64 of the 4 big-endian CRC bytes>`.

use crate::error::{ProtocolError, ProtocolResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fmt;
use std::io::{self, Read};

const HEADER_PREFIX: &str = "crc32c=";
const READ_CHUNK: usize = 64 * 1024;

/// A CRC32C checksum over an entire request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum(u32);

impl Checksum {
    /// Computes the checksum of an in-memory buffer.
    pub fn of(bytes: &[u8]) -> Self {
        Self(crc32c::crc32c(bytes))
    }

    /// Computes the checksum of everything `reader` yields.
    ///
    /// The reader is consumed to EOF; callers that need the bytes afterwards
    /// must rewind it themselves.
    pub fn from_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut crc = 0u32;
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            crc = crc32c::crc32c_append(crc, &buf[..n]);
        }
        Ok(Self(crc))
    }

    /// Returns the raw CRC value.
    pub fn value(self) -> u32 {
        self.0
    }

    /// Returns the base64 encoding of the big-endian CRC bytes.
    pub fn to_base64(self) -> String {
        STANDARD.encode(self.0.to_be_bytes())
    }

    /// Returns the full `x-content-hash` header value.
    pub fn header_value(self) -> String {
        format!("{HEADER_PREFIX}{}", self.to_base64())
    }

    /// Parses an `x-content-hash` header value.
    pub fn parse_header(value: &str) -> ProtocolResult<Self> {
        let encoded = value
            .trim()
            .strip_prefix(HEADER_PREFIX)
            .ok_or_else(|| ProtocolError::invalid_header("x-content-hash", "missing crc32c="))?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| ProtocolError::invalid_header("x-content-hash", e.to_string()))?;
        let bytes: [u8; 4] = bytes
            .try_into()
            .map_err(|_| ProtocolError::invalid_header("x-content-hash", "expected 4 bytes"))?;
        Ok(Self(u32::from_be_bytes(bytes)))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

//! Content addressing for layer filesystem deltas
//!
//! A layer's identity is the SHA-256 digest of its content bytes, nothing
//! else. Hashing is a pure function: the same bytes always produce the same
//! digest regardless of where the content came from or how it was retrieved.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Digest algorithm identifier recorded in persisted layers
pub const DIGEST_ALGORITHM: &str = "SHA-256";

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Buffer size for streaming digest computation
const READ_BUF_SIZE: usize = 64 * 1024;

/// Errors from digest computation and parsing
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("I/O error reading content stream: {0}")]
    Io(#[from] io::Error),

    #[error("invalid digest string {value:?}: {reason}")]
    InvalidDigest { value: String, reason: String },
}

/// SHA-256 content digest, stored as 64 lowercase hex characters
///
/// Immutable once computed. Serializes as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Hash a complete in-memory byte slice
    pub fn of_bytes(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hex::encode(hasher.finalize()))
    }

    /// Hash a byte stream incrementally
    ///
    /// Fails only if the reader fails; never returns a digest of a partial
    /// read.
    pub fn of_reader<R: Read>(mut reader: R) -> Result<Self, DigestError> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// The lowercase hex form
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(DigestError::InvalidDigest {
                value: s.to_string(),
                reason: format!("expected {} hex chars, got {}", DIGEST_HEX_LEN, s.len()),
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(DigestError::InvalidDigest {
                value: s.to_string(),
                reason: "expected lowercase hex".to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = DigestError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.0
    }
}

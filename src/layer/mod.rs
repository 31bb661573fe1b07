//! The layer: the immutable, content-addressed unit of distribution
//!
//! A layer is content bytes, the manifest describing their provenance, and
//! a signature binding the two. Layers are immutable after signing: any
//! change to content or manifest requires a new layer with a new digest and
//! a fresh signature. The persisted JSON form is handed verbatim to the
//! storage/transport collaborator and never mutated by this crate.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::manifest::Manifest;

/// Signature block of a persisted layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSignature {
    /// Base64-encoded Ed25519 signature over the signing payload
    pub signature: String,

    /// Signature algorithm identifier (always "Ed25519")
    pub signature_algorithm: String,

    /// Digest algorithm identifier (always "SHA-256")
    pub digest_algorithm: String,
}

/// A signed layer: filesystem delta + manifest + signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Digest of `content`; always recomputable, must equal
    /// `manifest.computed_hash`
    pub content_hash: ContentDigest,

    /// Opaque filesystem delta (empty for a certification record)
    #[serde(with = "content_base64")]
    pub content: Vec<u8>,

    /// Attached provenance record
    pub manifest: Manifest,

    /// Signature over (content_hash, canonical manifest)
    pub signature: LayerSignature,
}

impl Layer {
    /// Recompute the content digest from the actual bytes
    pub fn content_digest(&self) -> ContentDigest {
        ContentDigest::of_bytes(&self.content)
    }

    /// Whether this layer is a content-empty certification record
    pub fn is_certification(&self) -> bool {
        self.content.is_empty() && self.manifest.parent_hash.is_some()
    }

    /// Serialize the persisted form to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a persisted layer from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write the persisted form to a file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))?;
        fs::write(path, json)
    }

    /// Load a persisted layer from a file
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }
}

/// Content bytes serialize as base64 so the persisted form stays JSON
mod content_base64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(de)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

//! Layer manifest: the provenance record attached to every layer
//!
//! The canonical byte form is JCS (RFC 8785). The same logical field set
//! always canonicalizes to the same byte sequence, so signatures over it are
//! reproducible and verifiable byte-for-byte.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::digest::ContentDigest;

/// Errors from manifest construction and canonicalization
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest name must not be empty")]
    EmptyName,

    #[error("malformed manifest name {name:?}: expected namespace/image-name form")]
    MalformedName { name: String },

    #[error("JCS canonicalization error: {0}")]
    Canonicalization(String),
}

/// Provenance record for a single layer
///
/// 1:1 with its layer; immutable after construction. `metadata` is
/// maintainer-controlled and passed through uninterpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Maintainer-assigned identity in namespace/image-name form,
    /// independent of storage location
    pub name: String,

    /// SHA-256 fingerprint of the maintainer's signing key
    pub maintainer_fingerprint: String,

    /// Content digest of the parent layer (absent for a root layer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_hash: Option<ContentDigest>,

    /// Pointer to the build-source origin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,

    /// Free-text description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered maintainer-supplied key/value pairs
    pub metadata: BTreeMap<String, String>,

    /// When the layer was built; set once, never revised
    pub build_timestamp: DateTime<Utc>,

    /// The content digest this manifest claims to describe
    pub computed_hash: ContentDigest,
}

impl Manifest {
    /// Canonical JCS byte sequence of this manifest
    ///
    /// Pure and total for any constructed manifest; re-serialization is
    /// byte-identical. This is exactly what gets signed and re-verified.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        serde_json_canonicalizer::to_vec(self)
            .map_err(|e| ManifestError::Canonicalization(e.to_string()))
    }
}

/// Validate a manifest name: `namespace/image-name`, lowercase
/// alphanumerics with internal `._-` separators in each segment
pub fn validate_name(name: &str) -> Result<(), ManifestError> {
    if name.is_empty() {
        return Err(ManifestError::EmptyName);
    }
    // One path separator, each side a lowercase word with ._- between
    // alphanumerics
    let re = Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*/[a-z0-9]+(?:[._-][a-z0-9]+)*$")
        .unwrap_or_else(|_| unreachable!("static pattern"));
    if !re.is_match(name) {
        return Err(ManifestError::MalformedName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Builder for manifests
///
/// Required identity fields up front; `build` stamps the timestamp and
/// binds the freshly computed content digest.
pub struct ManifestBuilder {
    name: String,
    maintainer_fingerprint: String,
    parent_hash: Option<ContentDigest>,
    source_uri: Option<String>,
    description: Option<String>,
    metadata: BTreeMap<String, String>,
}

impl ManifestBuilder {
    /// Create a builder with the required author identity fields
    pub fn new(name: impl Into<String>, maintainer_fingerprint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            maintainer_fingerprint: maintainer_fingerprint.into(),
            parent_hash: None,
            source_uri: None,
            description: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Reference the parent layer by content digest
    pub fn parent(mut self, parent_hash: ContentDigest) -> Self {
        self.parent_hash = Some(parent_hash);
        self
    }

    /// Set the build-source origin
    pub fn source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }

    /// Set the free-text description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add one metadata key/value pair
    pub fn metadata_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the whole metadata map
    pub fn metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Finish the manifest against a freshly computed content digest
    ///
    /// Validates the name, stamps `build_timestamp` with the current time,
    /// and sets `computed_hash = content_hash`. Fails with
    /// [`ManifestError`] on an empty or malformed name; nothing partial is
    /// returned.
    pub fn build(self, content_hash: ContentDigest) -> Result<Manifest, ManifestError> {
        validate_name(&self.name)?;

        Ok(Manifest {
            name: self.name,
            maintainer_fingerprint: self.maintainer_fingerprint,
            parent_hash: self.parent_hash,
            source_uri: self.source_uri,
            description: self.description,
            metadata: self.metadata,
            build_timestamp: Utc::now(),
            computed_hash: content_hash,
        })
    }
}

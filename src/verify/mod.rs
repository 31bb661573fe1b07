//! Verifier: integrity, signature, and chain-of-trust checks
//!
//! A single layer passes through a fixed step order: recompute the content
//! digest, look the claimed maintainer up in the trust store, verify the
//! signature over the canonical payload. A chain walk repeats those steps
//! for each parent, retrieved by digest from the storage collaborator, with
//! a visited-set cycle guard and a bounded depth budget on top. Terminal
//! outcomes are a [`ChainReport`] or a typed [`VerifyError`]; there is no
//! retry inside a single call.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier};
use thiserror::Error;

use crate::digest::ContentDigest;
use crate::layer::Layer;
use crate::manifest::ManifestError;
use crate::signing::signing_payload;
use crate::trust::TrustStore;

/// Default bound on ancestry depth
pub const DEFAULT_DEPTH_LIMIT: usize = 128;

/// Why a parent layer could not be retrieved
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("no layer stored under digest {0}")]
    NotFound(ContentDigest),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Verification failures, all explicit and typed
///
/// `IntegrityMismatch` and `SignatureInvalid` are fatal to trust for the
/// layer and must not be retried with the same input. `ChainIncomplete`
/// reflects data availability, not cryptography; the caller may fetch more
/// of the chain and re-invoke.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("integrity mismatch for layer {digest}: manifest claims {claimed}")]
    IntegrityMismatch {
        digest: ContentDigest,
        claimed: ContentDigest,
    },

    #[error("untrusted signer {fingerprint} on layer {digest}")]
    UntrustedSigner {
        digest: ContentDigest,
        fingerprint: String,
    },

    #[error("invalid signature on layer {digest}: {reason}")]
    SignatureInvalid {
        digest: ContentDigest,
        reason: String,
    },

    #[error("chain incomplete: parent {parent} of layer {digest} unavailable: {source}")]
    ChainIncomplete {
        digest: ContentDigest,
        parent: ContentDigest,
        source: RetrieveError,
    },

    #[error("chain deeper than the configured limit of {limit} layers")]
    ChainTooDeep { limit: usize },

    #[error("ancestry violation between layer {digest} and parent {parent}: {reason}")]
    AncestryViolation {
        digest: ContentDigest,
        parent: ContentDigest,
        reason: String,
    },

    #[error("canonicalization failed during verification: {0}")]
    Canonicalization(#[from] ManifestError),

    #[error("verification cancelled mid-chain")]
    Cancelled,
}

/// Cooperative cancellation token for a chain walk
///
/// Checked before each parent retrieval, so a timed-out verification aborts
/// between blocking storage calls without touching trust-store state.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect before the next retrieval
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tunables for a verification call
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Maximum number of layers in one ancestry walk
    pub depth_limit: usize,

    /// Optional cancellation token
    pub cancel: Option<CancelFlag>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            depth_limit: DEFAULT_DEPTH_LIMIT,
            cancel: None,
        }
    }
}

impl VerifyOptions {
    /// Options with an explicit depth bound
    pub fn with_depth_limit(depth_limit: usize) -> Self {
        Self {
            depth_limit,
            ..Self::default()
        }
    }

    /// Attach a cancellation token
    pub fn cancellable(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }
}

/// Storage/transport seam: retrieval of layers by content digest
///
/// Retrieval is by immutable digest, never by mutable name. Retry policy
/// for transient unavailability belongs to the implementor, not to the
/// verifier.
pub trait LayerStore {
    fn retrieve(&self, digest: &ContentDigest) -> Result<Layer, RetrieveError>;
}

/// In-memory layer store, for tests and offline verification
#[derive(Debug, Default)]
pub struct MemoryLayerStore {
    layers: std::collections::BTreeMap<ContentDigest, Layer>,
}

impl MemoryLayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finished layer under its content digest
    pub fn insert(&mut self, layer: Layer) {
        self.layers.insert(layer.content_hash.clone(), layer);
    }

    /// Drop a layer, simulating a gap in the chain
    pub fn remove(&mut self, digest: &ContentDigest) -> Option<Layer> {
        self.layers.remove(digest)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl LayerStore for MemoryLayerStore {
    fn retrieve(&self, digest: &ContentDigest) -> Result<Layer, RetrieveError> {
        self.layers
            .get(digest)
            .cloned()
            .ok_or_else(|| RetrieveError::NotFound(digest.clone()))
    }
}

/// Successful chain walk summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    /// Verified maintainer fingerprints, root first, leaf last
    pub fingerprints: Vec<String>,

    /// Content digests of the verified layers, root first, leaf last
    pub digests: Vec<ContentDigest>,
}

impl ChainReport {
    /// Number of layers verified
    pub fn depth(&self) -> usize {
        self.digests.len()
    }

    /// Digest of the chain's root layer
    pub fn root(&self) -> &ContentDigest {
        // A report is only built from a non-empty walk
        &self.digests[0]
    }
}

/// Verify a single layer: integrity, trust, signature
///
/// The three steps run in fixed order and short-circuit on the first
/// failure. Returns the verified maintainer fingerprint.
pub fn verify_layer(layer: &Layer, trust: &TrustStore) -> Result<String, VerifyError> {
    // Step 1: recompute the content digest and check the manifest's claim
    let actual = layer.content_digest();
    if actual != layer.manifest.computed_hash || actual != layer.content_hash {
        return Err(VerifyError::IntegrityMismatch {
            digest: actual,
            claimed: layer.manifest.computed_hash.clone(),
        });
    }

    // Step 2: the claimed signer must be in the trust store, evaluated now
    let fingerprint = layer.manifest.maintainer_fingerprint.clone();
    let Some(key) = trust.lookup(&fingerprint) else {
        return Err(VerifyError::UntrustedSigner {
            digest: actual,
            fingerprint,
        });
    };

    // Step 3: the signature must cover (content_hash, canonical manifest)
    let payload = signing_payload(&actual, &layer.manifest)?;
    let sig_bytes = base64::engine::general_purpose::STANDARD
        .decode(&layer.signature.signature)
        .map_err(|e| VerifyError::SignatureInvalid {
            digest: actual.clone(),
            reason: format!("signature is not valid base64: {}", e),
        })?;
    let signature =
        Signature::from_slice(&sig_bytes).map_err(|e| VerifyError::SignatureInvalid {
            digest: actual.clone(),
            reason: e.to_string(),
        })?;
    key.verify(&payload, &signature)
        .map_err(|_| VerifyError::SignatureInvalid {
            digest: actual,
            reason: "signature does not match canonical payload".to_string(),
        })?;

    Ok(fingerprint)
}

/// Verify a layer and its full ancestry up to a root
///
/// Walks parent references via `store.retrieve`, verifying each layer with
/// [`verify_layer`]. Guards: a visited-digest set rejects cycles outright,
/// the depth budget bounds the walk even against a corrupted or adversarial
/// store, and each parent must carry a build timestamp no later than its
/// child. On success the report lists fingerprints and digests in
/// root-to-leaf order.
pub fn verify_chain(
    layer: &Layer,
    trust: &TrustStore,
    store: &dyn LayerStore,
    options: &VerifyOptions,
) -> Result<ChainReport, VerifyError> {
    let mut visited: HashSet<ContentDigest> = HashSet::new();
    // Collected leaf-to-root, reversed at the end
    let mut fingerprints = Vec::new();
    let mut digests = Vec::new();

    let mut current = layer.clone();

    loop {
        if digests.len() >= options.depth_limit {
            return Err(VerifyError::ChainTooDeep {
                limit: options.depth_limit,
            });
        }

        let fingerprint = verify_layer(&current, trust)?;
        let digest = current.content_hash.clone();
        if !visited.insert(digest.clone()) {
            return Err(VerifyError::AncestryViolation {
                digest: digest.clone(),
                parent: digest,
                reason: "ancestry cycle: digest already visited in this walk".to_string(),
            });
        }
        fingerprints.push(fingerprint);
        digests.push(digest.clone());

        let Some(parent_hash) = current.manifest.parent_hash.clone() else {
            // Root reached
            break;
        };

        if parent_hash == digest {
            return Err(VerifyError::AncestryViolation {
                digest: digest.clone(),
                parent: parent_hash,
                reason: "layer references itself as parent".to_string(),
            });
        }

        if let Some(cancel) = &options.cancel {
            if cancel.is_cancelled() {
                return Err(VerifyError::Cancelled);
            }
        }

        let parent = store
            .retrieve(&parent_hash)
            .map_err(|source| VerifyError::ChainIncomplete {
                digest: digest.clone(),
                parent: parent_hash.clone(),
                source,
            })?;

        // The store is untrusted: the retrieved layer must actually be the
        // layer the child signed a reference to, not merely self-consistent
        let retrieved = parent.content_digest();
        if retrieved != parent_hash {
            return Err(VerifyError::IntegrityMismatch {
                digest: retrieved,
                claimed: parent_hash,
            });
        }

        if parent.manifest.build_timestamp > current.manifest.build_timestamp {
            return Err(VerifyError::AncestryViolation {
                digest,
                parent: parent_hash,
                reason: "parent built after child".to_string(),
            });
        }

        current = parent;
    }

    fingerprints.reverse();
    digests.reverse();
    Ok(ChainReport {
        fingerprints,
        digests,
    })
}

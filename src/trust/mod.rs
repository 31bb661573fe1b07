//! Trust store: the set of public keys the verifier currently accepts
//!
//! Populated by an external trust-decision mechanism; the verifier only
//! reads it. Reads are concurrent, writes are serialized against readers,
//! and a verification in flight observes either the pre-update or the
//! post-update trust set, never a torn mix. Trust is evaluated live at each
//! verification: revoking a key takes effect on the next check with no
//! caching.

use std::collections::BTreeMap;
use std::sync::RwLock;

use ed25519_dalek::VerifyingKey;

/// Fingerprint-keyed registry of trusted public keys
#[derive(Debug, Default)]
pub struct TrustStore {
    keys: RwLock<BTreeMap<String, VerifyingKey>>,
}

impl TrustStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an explicit trust decision for a key
    ///
    /// Replaces any key previously held under the same fingerprint; there
    /// is no silent upgrade path.
    pub fn trust(&self, fingerprint: impl Into<String>, key: VerifyingKey) {
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.insert(fingerprint.into(), key);
    }

    /// Revoke trust in a fingerprint; returns whether it was present
    pub fn revoke(&self, fingerprint: &str) -> bool {
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.remove(fingerprint).is_some()
    }

    /// Look up the public key for a fingerprint
    pub fn lookup(&self, fingerprint: &str) -> Option<VerifyingKey> {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        keys.get(fingerprint).copied()
    }

    /// Whether a fingerprint is currently trusted
    pub fn is_trusted(&self, fingerprint: &str) -> bool {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        keys.contains_key(fingerprint)
    }

    /// Number of trusted keys
    pub fn len(&self) -> usize {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        keys.len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All trusted fingerprints, sorted
    pub fn fingerprints(&self) -> Vec<String> {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        keys.keys().cloned().collect()
    }
}

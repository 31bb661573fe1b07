//! Signer: produces the signature binding a layer's content to its manifest
//!
//! Signing payload (fixed, documented here and nowhere else):
//!
//! ```text
//! payload = content_hash_hex ++ 0x0A ++ JCS(manifest)
//! ```
//!
//! One signature covers both halves, so neither the content nor the
//! manifest can be swapped independently without invalidating it. The hex
//! digest never contains a newline, so the separator is unambiguous. The
//! private key is borrowed for the duration of the call and never stored.

use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use thiserror::Error;

use crate::digest::{ContentDigest, DIGEST_ALGORITHM};
use crate::layer::{Layer, LayerSignature};
use crate::manifest::{Manifest, ManifestError};

/// Signature algorithm identifier recorded in persisted layers
pub const SIGNATURE_ALGORITHM: &str = "Ed25519";

/// Errors from the signing pipeline
///
/// All are fatal to the build: no partially signed layer is ever produced.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("manifest claims hash {claimed} but content hashes to {actual}")]
    HashClaimMismatch {
        claimed: ContentDigest,
        actual: ContentDigest,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("key operation failed: {0}")]
    KeyOperationFailed(String),
}

/// Build the exact byte sequence the signature covers
pub fn signing_payload(
    content_hash: &ContentDigest,
    manifest: &Manifest,
) -> Result<Vec<u8>, ManifestError> {
    let canonical = manifest.canonical_bytes()?;
    let mut payload = Vec::with_capacity(content_hash.as_hex().len() + 1 + canonical.len());
    payload.extend_from_slice(content_hash.as_hex().as_bytes());
    payload.push(b'\n');
    payload.extend_from_slice(&canonical);
    Ok(payload)
}

/// Sign a manifest over its content, producing the finished immutable layer
///
/// Recomputes the content digest and cross-checks it against
/// `manifest.computed_hash` before anything is signed: a manifest that
/// disagrees with the content it claims to describe is rejected with
/// [`SignError::HashClaimMismatch`].
pub fn sign_layer(
    content: Vec<u8>,
    manifest: Manifest,
    signing_key: &SigningKey,
) -> Result<Layer, SignError> {
    let content_hash = ContentDigest::of_bytes(&content);
    if content_hash != manifest.computed_hash {
        return Err(SignError::HashClaimMismatch {
            claimed: manifest.computed_hash.clone(),
            actual: content_hash,
        });
    }

    let payload = signing_payload(&content_hash, &manifest)?;
    let signature = signing_key
        .try_sign(&payload)
        .map_err(|e| SignError::KeyOperationFailed(e.to_string()))?;

    Ok(Layer {
        content_hash,
        content,
        manifest,
        signature: LayerSignature {
            signature: base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()),
            signature_algorithm: SIGNATURE_ALGORITHM.to_string(),
            digest_algorithm: DIGEST_ALGORITHM.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, key_fingerprint};
    use crate::manifest::ManifestBuilder;

    fn manifest_for(content: &[u8], key: &SigningKey) -> Manifest {
        ManifestBuilder::new("acme/app", key_fingerprint(&key.verifying_key()))
            .build(ContentDigest::of_bytes(content))
            .unwrap()
    }

    #[test]
    fn test_sign_layer_produces_consistent_layer() {
        let key = generate_keypair();
        let content = b"delta".to_vec();
        let manifest = manifest_for(&content, &key);

        let layer = sign_layer(content, manifest, &key).unwrap();

        assert_eq!(layer.content_hash, layer.manifest.computed_hash);
        assert_eq!(layer.signature.signature_algorithm, SIGNATURE_ALGORITHM);
        assert_eq!(layer.signature.digest_algorithm, DIGEST_ALGORITHM);
        assert!(!layer.signature.signature.is_empty());
    }

    #[test]
    fn test_sign_rejects_stale_hash_claim() {
        let key = generate_keypair();
        let manifest = manifest_for(b"original content", &key);

        // Content changed after the manifest was built
        let result = sign_layer(b"different content".to_vec(), manifest, &key);
        assert!(matches!(result, Err(SignError::HashClaimMismatch { .. })));
    }

    #[test]
    fn test_signing_payload_covers_both_halves() {
        let key = generate_keypair();
        let content = b"delta".to_vec();
        let manifest = manifest_for(&content, &key);
        let hash = ContentDigest::of_bytes(&content);

        let baseline = signing_payload(&hash, &manifest).unwrap();

        // Different hash, same manifest
        let other_hash = ContentDigest::of_bytes(b"other");
        assert_ne!(signing_payload(&other_hash, &manifest).unwrap(), baseline);

        // Same hash, different manifest
        let mut other_manifest = manifest.clone();
        other_manifest.description = Some("tampered".to_string());
        assert_ne!(signing_payload(&hash, &other_manifest).unwrap(), baseline);
    }

    #[test]
    fn test_signing_payload_deterministic() {
        let key = generate_keypair();
        let content = b"delta".to_vec();
        let manifest = manifest_for(&content, &key);
        let hash = ContentDigest::of_bytes(&content);

        assert_eq!(
            signing_payload(&hash, &manifest).unwrap(),
            signing_payload(&hash, &manifest).unwrap()
        );
    }

    #[test]
    fn test_empty_content_signs() {
        // Certification records have zero-length content; the pipeline must
        // treat that as ordinary content
        let key = generate_keypair();
        let manifest = manifest_for(b"", &key);
        let layer = sign_layer(Vec::new(), manifest, &key).unwrap();
        assert_eq!(layer.content_hash, ContentDigest::of_bytes(b""));
    }
}

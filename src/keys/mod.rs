//! Ed25519 key material helpers: generation, encoding, fingerprints
//!
//! Private keys are handled by reference for the duration of a signing call
//! and never persisted by this crate. Fingerprints are SHA-256 over the raw
//! public key bytes, hex-encoded.

use base64::Engine;
use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from key decoding
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Generate a new Ed25519 keypair
pub fn generate_keypair() -> SigningKey {
    SigningKey::generate(&mut rand::thread_rng())
}

/// SHA-256 fingerprint of a public key, 64 lowercase hex chars
pub fn key_fingerprint(key: &VerifyingKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Encode a signing key to base64 for storage
pub fn encode_signing_key(key: &SigningKey) -> String {
    base64::engine::general_purpose::STANDARD.encode(key.to_bytes())
}

/// Decode a signing key from base64
pub fn decode_signing_key(encoded: &str) -> Result<SigningKey, KeyError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    let bytes_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| KeyError::InvalidKey("key must be 32 bytes".to_string()))?;
    Ok(SigningKey::from_bytes(&bytes_array))
}

/// Encode a verifying key to base64 for storage
pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    base64::engine::general_purpose::STANDARD.encode(key.as_bytes())
}

/// Decode a verifying key from base64
pub fn decode_verifying_key(encoded: &str) -> Result<VerifyingKey, KeyError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    let bytes_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| KeyError::InvalidKey("key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes_array).map_err(|e| KeyError::InvalidKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let key = generate_keypair();
        let verifying = key.verifying_key();

        let fp1 = key_fingerprint(&verifying);
        let fp2 = key_fingerprint(&verifying);

        assert_eq!(fp1, fp2);
        assert_eq!(fp1.len(), 64);
    }

    #[test]
    fn test_fingerprints_differ_per_key() {
        let a = key_fingerprint(&generate_keypair().verifying_key());
        let b = key_fingerprint(&generate_keypair().verifying_key());
        assert_ne!(a, b);
    }

    #[test]
    fn test_signing_key_encoding_round_trip() {
        let key = generate_keypair();
        let encoded = encode_signing_key(&key);
        let decoded = decode_signing_key(&encoded).unwrap();
        assert_eq!(key.to_bytes(), decoded.to_bytes());
    }

    #[test]
    fn test_verifying_key_encoding_round_trip() {
        let verifying = generate_keypair().verifying_key();
        let encoded = encode_verifying_key(&verifying);
        let decoded = decode_verifying_key(&encoded).unwrap();
        assert_eq!(verifying.as_bytes(), decoded.as_bytes());
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let encoded = base64::engine::general_purpose::STANDARD.encode([0u8; 16]);
        assert!(matches!(
            decode_signing_key(&encoded),
            Err(KeyError::InvalidKey(_))
        ));
        assert!(matches!(
            decode_verifying_key(&encoded),
            Err(KeyError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(matches!(
            decode_verifying_key("not base64 !!!"),
            Err(KeyError::Base64(_))
        ));
    }
}

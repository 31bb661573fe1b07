//! Layerseal - image layer provenance and trust
//!
//! This crate implements the provenance subsystem for content-addressed
//! image layers: deterministic content addressing, signed manifest
//! construction, signature and ancestry verification at distribution time,
//! and a certification overlay for third-party attestation. Transport,
//! registry access, and CLI surfaces are external collaborators.

pub mod certify;
pub mod digest;
pub mod keys;
pub mod layer;
pub mod manifest;
pub mod signing;
pub mod trust;
pub mod verify;

pub use certify::{certify, verify_certified, CertifiedReport, CertifyError};
pub use digest::{ContentDigest, DigestError, DIGEST_ALGORITHM};
pub use keys::{generate_keypair, key_fingerprint, KeyError};
pub use layer::{Layer, LayerSignature};
pub use manifest::{Manifest, ManifestBuilder, ManifestError};
pub use signing::{sign_layer, SignError, SIGNATURE_ALGORITHM};
pub use trust::TrustStore;
pub use verify::{
    verify_chain, verify_layer, CancelFlag, ChainReport, LayerStore, MemoryLayerStore,
    RetrieveError, VerifyError, VerifyOptions, DEFAULT_DEPTH_LIMIT,
};

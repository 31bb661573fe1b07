//! Certification overlay: third-party attestation of a base layer
//!
//! A certification record is a content-empty layer whose `parent_hash`
//! names the certified application layer and whose maintainer fingerprint
//! identifies the certifying party rather than the original author. It is
//! built through the ordinary manifest + signing pipeline and obeys every
//! layer invariant. Verifying a certified application takes two independent
//! chain walks plus an exact digest cross-check between them.

use std::collections::BTreeMap;

use ed25519_dalek::SigningKey;
use thiserror::Error;

use crate::digest::ContentDigest;
use crate::keys::key_fingerprint;
use crate::layer::Layer;
use crate::manifest::{ManifestBuilder, ManifestError};
use crate::signing::{sign_layer, SignError};
use crate::trust::TrustStore;
use crate::verify::{verify_chain, ChainReport, LayerStore, VerifyError, VerifyOptions};

/// Errors from building or checking certifications
#[derive(Debug, Error)]
pub enum CertifyError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error("certification layer {cert} carries content; a certification must be content-empty")]
    NonEmptyCertification { cert: ContentDigest },

    #[error("certification layer {cert} has no parent reference")]
    MissingBaseReference { cert: ContentDigest },

    #[error("certification {cert} attests to {claimed} but the application layer is {actual}")]
    BaseMismatch {
        cert: ContentDigest,
        claimed: ContentDigest,
        actual: ContentDigest,
    },

    #[error("application chain failed: {0}")]
    ApplicationChain(#[source] VerifyError),

    #[error("certification chain failed: {0}")]
    CertificationChain(#[source] VerifyError),
}

/// Result of a successful certified-application verification
#[derive(Debug, Clone)]
pub struct CertifiedReport {
    /// Chain walk of the application layer itself
    pub application: ChainReport,

    /// Chain walk of the certification record (the application chain is its
    /// ancestry past the first hop)
    pub certification: ChainReport,

    /// Fingerprint of the certifying party
    pub certifier_fingerprint: String,
}

/// Issue a certification record over a base layer
///
/// The record's manifest carries the certifier's fingerprint and name,
/// `parent_hash = base.content_hash`, and zero-length content, then goes
/// through the normal signing pipeline.
pub fn certify(
    base: &Layer,
    certifier_key: &SigningKey,
    name: &str,
    metadata: BTreeMap<String, String>,
    description: Option<&str>,
) -> Result<Layer, CertifyError> {
    let certifier_fingerprint = key_fingerprint(&certifier_key.verifying_key());

    let mut builder = ManifestBuilder::new(name, certifier_fingerprint)
        .parent(base.content_hash.clone())
        .metadata(metadata);
    if let Some(description) = description {
        builder = builder.description(description);
    }
    let manifest = builder.build(ContentDigest::of_bytes(b""))?;

    Ok(sign_layer(Vec::new(), manifest, certifier_key)?)
}

/// Verify a certified application: both chains plus the base cross-check
///
/// 1. The certification record must be content-empty and reference a base.
/// 2. Its `parent_hash` must equal the application's recomputed content
///    digest exactly; no fuzzy matching.
/// 3. The application's own chain must verify end-to-end.
/// 4. The certification's chain must verify end-to-end (which re-walks the
///    application's ancestry under the certifier's link).
pub fn verify_certified(
    application: &Layer,
    certification: &Layer,
    trust: &TrustStore,
    store: &dyn LayerStore,
    options: &VerifyOptions,
) -> Result<CertifiedReport, CertifyError> {
    let cert_digest = certification.content_digest();
    if !certification.content.is_empty() {
        return Err(CertifyError::NonEmptyCertification { cert: cert_digest });
    }
    let Some(claimed_base) = certification.manifest.parent_hash.clone() else {
        return Err(CertifyError::MissingBaseReference { cert: cert_digest });
    };

    // Exact content-digest match against the application as retrieved, not
    // as named
    let actual_base = application.content_digest();
    if claimed_base != actual_base {
        return Err(CertifyError::BaseMismatch {
            cert: cert_digest,
            claimed: claimed_base,
            actual: actual_base,
        });
    }

    let application_report =
        verify_chain(application, trust, store, options).map_err(CertifyError::ApplicationChain)?;
    let certification_report =
        verify_chain(certification, trust, store, options).map_err(CertifyError::CertificationChain)?;

    // Both walks share the application's ancestry past the certifier's
    // link, so their roots agree: the walk binds every retrieved parent to
    // the digest its child signed
    let certifier_fingerprint = certification.manifest.maintainer_fingerprint.clone();
    Ok(CertifiedReport {
        application: application_report,
        certification: certification_report,
        certifier_fingerprint,
    })
}

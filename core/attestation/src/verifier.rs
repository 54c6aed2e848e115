//! Top-level `Verify` operation: COSE signature, certificate chain, validity
//! window, and byte-exact binding field checks.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use p384::ecdsa::signature::Verifier as _;
use p384::ecdsa::{Signature, VerifyingKey};
use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::public_key::PublicKey;

use crate::cose::CoseSign1;
use crate::document::AttestationDocument;
use crate::error::AttestationError;
use crate::measurements::Measurements;

/// The caller-visible result of a successful `Verify`: measurements and the
/// (optional) ephemeral public key the peer bound into its attestation.
/// Everything else in the underlying document is discarded.
#[derive(Debug, Clone)]
pub struct VerifiedAttestation {
    /// The peer's code and instance measurements.
    pub measurements: Measurements,
    /// The `public_key` field the peer bound into the attested document, if
    /// any.
    pub public_key: Option<Vec<u8>>,
    /// The `user_data` field the peer bound into the attested document, if
    /// any. Callers with an `expected_user_data` already had it checked by
    /// [`NitroVerifier::verify`]; the Leader verifying M2 instead reads this
    /// back to learn the Follower's nonce, which it had no prior expectation
    /// for.
    pub user_data: Option<Vec<u8>>,
}

/// Verifies Nitro-profile attestation documents against a pinned root
/// certificate.
///
/// The root is supplied as configuration (DER bytes) rather than compiled
/// in, so the identical verifier runs against the real AWS Nitro root in
/// production and against a locally generated test root in mock mode.
pub struct NitroVerifier {
    root_der: Vec<u8>,
    max_age: Duration,
}

impl NitroVerifier {
    /// Construct a verifier pinned to `root_der`, accepting documents whose
    /// embedded timestamp is no older than `max_age` relative to the
    /// verifier's clock.
    pub fn new(root_der: Vec<u8>, max_age: Duration) -> Self {
        Self { root_der, max_age }
    }

    /// Run the full verification check: signature chain, validity window,
    /// and byte-exact `nonce`/`user_data` comparison.
    ///
    /// `expected_user_data` is `None` when the caller does not care about
    /// that field (e.g. the Leader verifying M2, which binds
    /// `user_data = follower_nonce` that the Leader doesn't yet know).
    pub fn verify(
        &self,
        document_bytes: &[u8],
        expected_nonce: &[u8],
        expected_user_data: Option<&[u8]>,
    ) -> Result<VerifiedAttestation, AttestationError> {
        let cose = CoseSign1::parse_and_validate(document_bytes)?;
        let doc = AttestationDocument::parse_payload(&cose.payload)?;
        let signed_message = cose.to_signed_message()?;

        verify_cose_signature(&doc.certificate, &cose.signature, &signed_message)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is after the Unix epoch");
        self.check_validity_window(doc.timestamp_ms, now)?;

        let mut chain = Vec::with_capacity(1 + doc.cabundle.len());
        chain.push(doc.certificate.as_slice());
        chain.extend(doc.cabundle.iter().rev().map(Vec::as_slice));
        crate::chain::verify_cert_chain(&chain, &self.root_der, now.as_secs() as i64)?;

        match &doc.nonce {
            Some(n) if n.as_slice() == expected_nonce => {}
            _ => return Err(AttestationError::NonceMismatch),
        }

        if let Some(expected) = expected_user_data {
            match &doc.user_data {
                Some(ud) if ud.as_slice() == expected => {}
                _ => return Err(AttestationError::UserDataMismatch),
            }
        }

        Ok(VerifiedAttestation {
            measurements: doc.measurements,
            public_key: doc.public_key,
            user_data: doc.user_data,
        })
    }

    fn check_validity_window(&self, doc_timestamp_ms: u64, now: Duration) -> Result<(), AttestationError> {
        let doc_time = Duration::from_millis(doc_timestamp_ms);
        let age = if now >= doc_time {
            now - doc_time
        } else {
            // A document timestamped in the future is never acceptable.
            return Err(AttestationError::DocumentExpired);
        };
        if age > self.max_age {
            return Err(AttestationError::DocumentExpired);
        }
        Ok(())
    }
}

fn verify_cose_signature(
    certificate_der: &[u8],
    signature: &[u8],
    signed_message: &[u8],
) -> Result<(), AttestationError> {
    let signature = Signature::from_slice(signature).map_err(|_| AttestationError::SignatureInvalid)?;

    let cert = X509Certificate::from_der(certificate_der)
        .map_err(|_| AttestationError::Malformed("invalid end-entity certificate"))?
        .1;
    let public_key = cert
        .public_key()
        .parsed()
        .map_err(|_| AttestationError::Malformed("invalid end-entity public key"))?;

    let PublicKey::EC(ec) = public_key else {
        return Err(AttestationError::Malformed("end-entity key is not EC"));
    };

    let verifying_key =
        VerifyingKey::from_sec1_bytes(ec.data()).map_err(|_| AttestationError::SignatureInvalid)?;
    verifying_key
        .verify(signed_message, &signature)
        .map_err(|_| AttestationError::SignatureInvalid)
}

//! The Attestation Provider leaf: produces and verifies AWS Nitro-profile
//! attestation documents.
//!
//! [`provider::AttestationProvider`]/[`provider::NitroAttestationProvider`]
//! implement `Attest`; [`verifier::NitroVerifier`] implements `Verify`. See
//! the module docs on each for the exact binding semantics.

mod chain;
mod cose;
mod document;
mod error;
mod measurements;
mod provider;
mod verifier;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::AttestationError;
pub use measurements::Measurements;
pub use provider::{AttestationProvider, NitroAttestationProvider};
pub use verifier::{NitroVerifier, VerifiedAttestation};

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock::MockAttestationProvider;

    fn measurements() -> Measurements {
        Measurements {
            pcr0: vec![0xaa; 48],
            pcr1: vec![0xbb; 48],
            pcr2: vec![0xcc; 48],
            pcr4: vec![0xdd; 48],
        }
    }

    #[test]
    fn round_trip_with_all_fields_bound() {
        let provider = MockAttestationProvider::generate(measurements());
        let verifier = NitroVerifier::new(provider.root_cert_der().to_vec(), Duration::from_secs(300));

        let nonce = b"leader-nonce".to_vec();
        let pubkey = b"ephemeral-pub".to_vec();
        let user_data = b"follower-nonce".to_vec();

        let doc = provider
            .attest(Some(&nonce), Some(&pubkey), Some(&user_data))
            .expect("attest");

        let verified = verifier
            .verify(&doc, &nonce, Some(&user_data))
            .expect("verify");

        assert_eq!(verified.measurements, measurements());
        assert_eq!(verified.public_key.as_deref(), Some(pubkey.as_slice()));
    }

    #[test]
    fn nonce_mismatch_is_rejected() {
        let provider = MockAttestationProvider::generate(measurements());
        let verifier = NitroVerifier::new(provider.root_cert_der().to_vec(), Duration::from_secs(300));

        let doc = provider
            .attest(Some(b"actual-nonce"), None, None)
            .expect("attest");

        let err = verifier.verify(&doc, b"wrong-nonce", None).unwrap_err();
        assert!(matches!(err, AttestationError::NonceMismatch));
    }

    #[test]
    fn user_data_mismatch_is_rejected() {
        let provider = MockAttestationProvider::generate(measurements());
        let verifier = NitroVerifier::new(provider.root_cert_der().to_vec(), Duration::from_secs(300));

        let doc = provider
            .attest(Some(b"n"), None, Some(b"actual-user-data"))
            .expect("attest");

        let err = verifier
            .verify(&doc, b"n", Some(b"wrong-user-data"))
            .unwrap_err();
        assert!(matches!(err, AttestationError::UserDataMismatch));
    }

    #[test]
    fn expired_document_is_rejected() {
        let provider = MockAttestationProvider::generate(measurements());
        let verifier = NitroVerifier::new(provider.root_cert_der().to_vec(), Duration::from_secs(0));

        let doc = provider.attest(Some(b"n"), None, None).expect("attest");

        // A zero-second window rejects even a document signed moments ago,
        // exercising the "> max_age" edge from the validity-window property.
        let err = verifier.verify(&doc, b"n", None).unwrap_err();
        assert!(matches!(err, AttestationError::DocumentExpired));
    }

    #[test]
    fn untrusted_root_is_rejected() {
        let provider = MockAttestationProvider::generate(measurements());
        let other_root = MockAttestationProvider::generate(measurements());
        let verifier = NitroVerifier::new(
            other_root.root_cert_der().to_vec(),
            Duration::from_secs(300),
        );

        let doc = provider.attest(Some(b"n"), None, None).expect("attest");

        let err = verifier.verify(&doc, b"n", None).unwrap_err();
        assert!(matches!(err, AttestationError::ChainUntrusted(_)));
    }

    #[test]
    fn tampered_document_fails_signature_check() {
        let provider = MockAttestationProvider::generate(measurements());
        let verifier = NitroVerifier::new(provider.root_cert_der().to_vec(), Duration::from_secs(300));

        let mut doc = provider.attest(Some(b"n"), None, None).expect("attest");
        let last = doc.len() - 1;
        doc[last] ^= 0x01;

        let err = verifier.verify(&doc, b"n", None).unwrap_err();
        assert!(matches!(
            err,
            AttestationError::SignatureInvalid | AttestationError::Malformed(_)
        ));
    }

    #[test]
    fn absent_public_key_round_trips_as_none() {
        let provider = MockAttestationProvider::generate(measurements());
        let verifier = NitroVerifier::new(provider.root_cert_der().to_vec(), Duration::from_secs(300));

        let doc = provider.attest(Some(b"n"), None, None).expect("attest");
        let verified = verifier.verify(&doc, b"n", None).expect("verify");

        assert!(verified.public_key.is_none());
    }
}

//! The `AttestationError` kind from the protocol's error taxonomy.

/// Failure modes of [`crate::AttestationProvider::attest`] and
/// [`crate::Verifier::verify`].
///
/// Every variant here is terminal for the session that produced it: callers
/// must abort rather than retry within the same handshake (see the
/// Handshake Engine's failure semantics).
#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    /// The platform declined to produce an attestation document.
    #[error("attestation unavailable: {0}")]
    AttestationUnavailable(String),

    /// The COSE_Sign1 envelope, its CBOR payload, or a field within it does
    /// not parse.
    #[error("malformed attestation document: {0}")]
    Malformed(&'static str),

    /// A specific semantic field violates the protocol's strictness rules,
    /// e.g. a non-empty `public_key` where the protocol requires absence.
    #[error("malformed field in attestation document: {0}")]
    MalformedField(&'static str),

    /// The COSE signature does not verify against the end-entity
    /// certificate's public key.
    #[error("attestation signature invalid")]
    SignatureInvalid,

    /// The certificate chain does not terminate at the pinned platform
    /// root, or fails a structural check (key usage, basic constraints,
    /// issuer chaining, validity window) along the way.
    #[error("attestation certificate chain untrusted: {0}")]
    ChainUntrusted(String),

    /// The document's embedded timestamp falls outside the acceptable
    /// validity window relative to the verifier's clock.
    #[error("attestation document expired or not yet valid")]
    DocumentExpired,

    /// `document.nonce` did not byte-compare equal to the expected nonce.
    #[error("attestation nonce mismatch")]
    NonceMismatch,

    /// `document.user_data` did not byte-compare equal to the expected
    /// value.
    #[error("attestation user_data mismatch")]
    UserDataMismatch,
}

//! The `AuthorizationError` kind from the protocol's error taxonomy,
//! realized here as `CommitteeError`.

/// Failure modes of [`crate::authorize_attestation`].
#[derive(Debug, thiserror::Error)]
pub enum CommitteeError {
    /// The peer's code measurement (PCR0/1/2) has no live committee
    /// approval, or has been revoked.
    #[error("code measurement not authorized by committee")]
    CodeNotAuthorized,

    /// The peer's instance measurement (PCR4) has no live committee
    /// approval, or has been revoked.
    #[error("instance measurement not authorized by committee")]
    InstanceNotAuthorized,

    /// The registry lookup itself failed (network, chain unreachable, bad
    /// response). Treated as non-authorization, not retried within the
    /// session.
    #[error("committee oracle unavailable: {0}")]
    OracleUnavailable(String),
}

//! `KeySyncError` composes the leaf crates' error kinds plus the two kinds
//! owned by the engine itself (`TransportError`, `InternalError`).

use attestation::AttestationError;
use committee::CommitteeError;
use envelope::EnvelopeError;
use secret_store::SecretStoreError;

/// Transport-layer failures of the length-prefixed framing.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The stream was closed (EOF) before a complete frame arrived.
    #[error("peer closed the stream")]
    StreamClosed,
    /// A length prefix declared a payload larger than the configured cap.
    #[error("frame of {0} bytes exceeds the configured maximum")]
    FrameTooLarge(u32),
    /// The receive deadline elapsed before a complete frame arrived.
    #[error("timed out waiting for peer")]
    Timeout,
    /// The underlying I/O operation failed.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Top-level error for a [`crate::Session`]. Every variant here is terminal:
/// the session that produced it transitions to `Aborted`.
#[derive(Debug, thiserror::Error)]
pub enum KeySyncError {
    /// See [`TransportError`].
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// See [`attestation::AttestationError`].
    #[error("attestation error: {0}")]
    Attestation(#[from] AttestationError),
    /// See [`committee::CommitteeError`].
    #[error("authorization error: {0}")]
    Authorization(#[from] CommitteeError),
    /// See [`envelope::EnvelopeError`].
    #[error("crypto error: {0}")]
    Crypto(#[from] EnvelopeError),
    /// See [`secret_store::SecretStoreError`].
    #[error("state error: {0}")]
    State(#[from] SecretStoreError),
    /// An invariant the session relies on was violated. Unrecoverable; the
    /// process hosting the session should exit rather than continue serving
    /// further sessions from the same state.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

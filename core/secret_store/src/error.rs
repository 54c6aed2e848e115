//! The `StateError` kind from the protocol's error taxonomy.

/// Failure modes of a [`crate::SecretStateStore`].
#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    /// The leader side has no secret state to export (pool not yet
    /// bootstrapped).
    #[error("secret state unavailable")]
    StateUnavailable,

    /// The follower side already installed state once in this enclave's
    /// lifetime; installs are not idempotent.
    #[error("secret state already installed")]
    AlreadyInstalled,

    /// The backing store could not be read or written.
    #[error("secret state store I/O error: {0}")]
    Io(String),
}

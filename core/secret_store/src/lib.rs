//! The Secret State Store leaf: holds the pool's opaque secret state and
//! exposes read-for-export (Leader) and install-once (Follower) operations.

mod error;
mod file;
mod memory;

pub use error::SecretStoreError;
pub use file::FileSecretStore;
pub use memory::InMemorySecretStore;

/// Read-for-export / install-once access to the pool's secret state.
///
/// The store is read-only during Leader-side sessions (snapshot semantics)
/// and is written exactly once in a
/// Follower's lifetime; implementations must serialize concurrent
/// `install` calls so at most one succeeds.
pub trait SecretStateStore: Send + Sync {
    /// Read the current secret state for export to an admitted Follower.
    /// Errors with [`SecretStoreError::StateUnavailable`] if the pool has
    /// not yet been bootstrapped.
    fn read_for_export(&self) -> Result<Vec<u8>, SecretStoreError>;

    /// Install `state` as this enclave's secret state. Errors with
    /// [`SecretStoreError::AlreadyInstalled`] if called more than once.
    fn install(&self, state: Vec<u8>) -> Result<(), SecretStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise_store_once_semantics(store: &dyn SecretStateStore) {
        assert!(matches!(
            store.read_for_export().unwrap_err(),
            SecretStoreError::StateUnavailable
        ));

        store.install(vec![0x41, 0x42, 0x43]).unwrap();
        assert_eq!(store.read_for_export().unwrap(), vec![0x41, 0x42, 0x43]);

        assert!(matches!(
            store.install(vec![0x44]).unwrap_err(),
            SecretStoreError::AlreadyInstalled
        ));
    }

    #[test]
    fn in_memory_store_enforces_install_once() {
        exercise_store_once_semantics(&InMemorySecretStore::new());
    }

    #[test]
    fn file_store_enforces_install_once() {
        let dir = tempdir::TempDir::new("secret_store").expect("tempdir");
        let store = FileSecretStore::new(dir.path().join("state.bin"));
        exercise_store_once_semantics(&store);
    }
}

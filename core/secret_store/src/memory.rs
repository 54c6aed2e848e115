use std::sync::Mutex;

use crate::error::SecretStoreError;
use crate::SecretStateStore;

/// A [`SecretStateStore`] backed by process memory, for tests and the `e2e`
/// harness. Install-once is enforced with a `Mutex<Option<Vec<u8>>>`, the
/// same pattern the pack uses for its in-process mock devices.
#[derive(Default)]
pub struct InMemorySecretStore {
    state: Mutex<Option<Vec<u8>>>,
}

impl InMemorySecretStore {
    /// An empty store (Follower's starting state).
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with `state` (a Leader's starting state).
    pub fn with_state(state: Vec<u8>) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

impl SecretStateStore for InMemorySecretStore {
    fn read_for_export(&self) -> Result<Vec<u8>, SecretStoreError> {
        self.state
            .lock()
            .expect("secret store mutex poisoned")
            .clone()
            .ok_or(SecretStoreError::StateUnavailable)
    }

    fn install(&self, state: Vec<u8>) -> Result<(), SecretStoreError> {
        let mut guard = self.state.lock().expect("secret store mutex poisoned");
        if guard.is_some() {
            return Err(SecretStoreError::AlreadyInstalled);
        }
        *guard = Some(state);
        Ok(())
    }
}

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::SecretStoreError;
use crate::SecretStateStore;

/// A [`SecretStateStore`] sealed to a single file on disk. `install` uses
/// `create_new` so the filesystem itself enforces install-once even across
/// process restarts; a `Mutex` additionally serializes concurrent callers
/// within one process.
pub struct FileSecretStore {
    path: PathBuf,
    install_lock: Mutex<()>,
}

impl FileSecretStore {
    /// Seal state to `path`. The parent directory must already exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            install_lock: Mutex::new(()),
        }
    }

    /// The configured backing path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretStateStore for FileSecretStore {
    fn read_for_export(&self) -> Result<Vec<u8>, SecretStoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SecretStoreError::StateUnavailable),
            Err(e) => Err(SecretStoreError::Io(e.to_string())),
        }
    }

    fn install(&self, state: Vec<u8>) -> Result<(), SecretStoreError> {
        let _guard = self.install_lock.lock().expect("secret store mutex poisoned");

        use std::fs::OpenOptions;
        use std::io::Write;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SecretStoreError::AlreadyInstalled)
            }
            Err(e) => return Err(SecretStoreError::Io(e.to_string())),
        };

        file.write_all(&state)
            .map_err(|e| SecretStoreError::Io(e.to_string()))
    }
}

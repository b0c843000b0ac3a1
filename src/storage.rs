use std::{fs, io::ErrorKind, path::PathBuf};

use comments_core::session::{StoreError, TokenStore};

/// Keeps the bearer token in a plain file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(token) => Some(token.trim().to_string()).filter(|t| !t.is_empty()),
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    log::warn!("Unable to read token from {}: {err}", self.path.display());
                }
                None
            }
        }
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| StoreError(err.to_string()))?;
        }
        fs::write(&self.path, token).map_err(|err| StoreError(err.to_string()))
    }

    fn delete(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError(err.to_string())),
        }
    }
}

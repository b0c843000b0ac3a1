use gloo_storage::{LocalStorage, Storage};

use comments_core::session::{StoreError, TokenStore, TOKEN_KEY};

/// Keeps the bearer token in the browser's `LocalStorage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTokenStore;

impl TokenStore for LocalTokenStore {
    fn load(&self) -> Option<String> {
        LocalStorage::get(TOKEN_KEY).ok()
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        log::debug!("Save token in LocalStorage");
        LocalStorage::set(TOKEN_KEY, token).map_err(|err| StoreError(err.to_string()))
    }

    fn delete(&self) -> Result<(), StoreError> {
        log::debug!("Delete token from LocalStorage");
        LocalStorage::delete(TOKEN_KEY);
        Ok(())
    }
}

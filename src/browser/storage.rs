use crate::manager::{KeyValueStore, StorageError};
use async_trait::async_trait;
use web_sys::Storage;

/// [`KeyValueStore`] over the page's `window.localStorage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    fn storage() -> Result<Storage, StorageError> {
        let window = web_sys::window().ok_or_else(|| StorageError("no window".to_owned()))?;
        window
            .local_storage()
            .map_err(|error| StorageError(format!("localStorage is not accessible: {error:?}")))?
            .ok_or_else(|| StorageError("localStorage is not available".to_owned()))
    }
}

#[async_trait(?Send)]
impl KeyValueStore for LocalStorageStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(key)
            .map_err(|error| StorageError(format!("couldn't read `{key}': {error:?}")))
    }

    async fn set(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        let storage = Self::storage()?;
        match value {
            Some(value) => storage.set_item(key, value),
            None => storage.remove_item(key),
        }
        .map_err(|error| StorageError(format!("couldn't write `{key}': {error:?}")))
    }
}

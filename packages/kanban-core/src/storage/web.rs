/// Key-value storage backend for browser builds.
///
/// The whole envelope lives under one fixed key, so there is no backup slot.
/// Reads degrade to "absent" on any access failure. A missing store (storage
/// disabled) silently drops writes; a store that rejects a write (quota)
/// reports the failure.
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{PersistenceBackend, Slot, StorageError};

pub const WEB_STORAGE_KEY: &str = "kanban.board.v1";

/// Synchronous string key-value store, e.g. `window.localStorage`.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Whether the store can be reached at all. A store that is present but
    /// rejects writes (quota) is still available.
    fn is_available(&self) -> bool {
        true
    }
}

/// In-process store, injectable where no browser storage exists;
/// `with_quota` simulates a full store.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    items: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self
            .items
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            if key.len() + value.len() > quota {
                return Err(StorageError::Unavailable(format!(
                    "quota of {} bytes exceeded",
                    quota
                )));
            }
        }
        let mut items = self
            .items
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `window.localStorage`, looked up on every access so nothing non-Send is held.
#[cfg(target_arch = "wasm32")]
pub struct BrowserLocalStorage;

#[cfg(target_arch = "wasm32")]
impl BrowserLocalStorage {
    fn storage() -> Result<web_sys::Storage, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".to_string()))
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for BrowserLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn is_available(&self) -> bool {
        Self::storage().is_ok()
    }
}

pub struct WebBackend<S: KeyValueStore> {
    store: Option<S>,
}

impl<S: KeyValueStore> WebBackend<S> {
    /// `None` models a page where storage access is blocked entirely.
    pub fn new(store: Option<S>) -> Self {
        Self { store }
    }

    /// Keep `store` only if it can be reached; otherwise writes are dropped.
    pub fn detect(store: S) -> Self {
        if store.is_available() {
            Self::new(Some(store))
        } else {
            log::warn!("[kanban.storage.web] Storage unavailable, changes will not persist");
            Self::new(None)
        }
    }

    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }
}

#[async_trait]
impl<S: KeyValueStore> PersistenceBackend for WebBackend<S> {
    async fn read(&self, slot: Slot) -> Option<String> {
        if slot != Slot::Primary {
            return None;
        }
        let store = self.store.as_ref()?;
        match store.get_item(WEB_STORAGE_KEY) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("[kanban.storage.web] Failed to read {}: {}", WEB_STORAGE_KEY, e);
                None
            }
        }
    }

    async fn write(&self, slot: Slot, text: &str) -> Result<(), StorageError> {
        if slot != Slot::Primary {
            return Err(StorageError::UnsupportedSlot(slot));
        }
        match self.store.as_ref() {
            Some(store) => store.set_item(WEB_STORAGE_KEY, text),
            None => {
                log::warn!("[kanban.storage.web] Storage unavailable, dropping write");
                Ok(())
            }
        }
    }

    fn describe(&self) -> String {
        format!("key-value:{}", WEB_STORAGE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_write_single_key() {
        let backend = WebBackend::new(Some(MemoryKeyValueStore::new()));
        assert!(backend.read(Slot::Primary).await.is_none());

        backend.write(Slot::Primary, "payload").await.unwrap();
        assert_eq!(backend.read(Slot::Primary).await.as_deref(), Some("payload"));
        assert_eq!(
            backend.store().unwrap().get_item(WEB_STORAGE_KEY).unwrap().as_deref(),
            Some("payload")
        );
    }

    #[tokio::test]
    async fn test_no_backup_slot() {
        let backend = WebBackend::new(Some(MemoryKeyValueStore::new()));
        assert!(!backend.has_backup_slot());
        assert!(backend.read(Slot::Backup).await.is_none());
        assert!(matches!(
            backend.write(Slot::Backup, "x").await,
            Err(StorageError::UnsupportedSlot(Slot::Backup))
        ));
        assert!(backend.quarantine_primary().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_store_degrades_silently() {
        let backend: WebBackend<MemoryKeyValueStore> = WebBackend::new(None);
        assert!(backend.read(Slot::Primary).await.is_none());
        assert!(backend.write(Slot::Primary, "dropped").await.is_ok());
        assert!(backend.read(Slot::Primary).await.is_none());
    }

    /// Behaves like `window.localStorage` when the browser has it turned off.
    struct DisabledStore;

    impl KeyValueStore for DisabledStore {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("localStorage disabled".to_string()))
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("localStorage disabled".to_string()))
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_disabled_store_drops_writes() {
        let backend = WebBackend::detect(DisabledStore);
        assert!(backend.store().is_none());
        assert!(backend.write(Slot::Primary, "x").await.is_ok());
        assert!(backend.read(Slot::Primary).await.is_none());
    }

    #[tokio::test]
    async fn test_detect_keeps_reachable_store() {
        let backend = WebBackend::detect(MemoryKeyValueStore::with_quota(8));
        assert!(backend.store().is_some());
        // Reachable but full still reports the failure.
        assert!(backend.write(Slot::Primary, "too large").await.is_err());
    }

    #[tokio::test]
    async fn test_quota_failure_is_reported() {
        let backend = WebBackend::new(Some(MemoryKeyValueStore::with_quota(32)));
        backend.write(Slot::Primary, "small").await.unwrap();
        let big = "x".repeat(64);
        assert!(matches!(
            backend.write(Slot::Primary, &big).await,
            Err(StorageError::Unavailable(_))
        ));
        // Previous value survives the failed write.
        assert_eq!(backend.read(Slot::Primary).await.as_deref(), Some("small"));
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod fs;
#[cfg(test)]
pub(crate) mod testing;
pub mod web;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

/// Logical storage locations a backend can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Primary,
    Backup,
}

/// Abstract persistence backend for the board envelope.
/// Implementations: FsBackend (host data directory), WebBackend (key-value store).
///
/// `read` never fails: an unreadable or missing slot is `None`.
/// `write` failures propagate so autosave can report them.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Read the raw text stored in a slot.
    async fn read(&self, slot: Slot) -> Option<String>;

    /// Replace the contents of a slot.
    async fn write(&self, slot: Slot, text: &str) -> Result<(), StorageError>;

    /// Whether the backend keeps a separate backup copy next to the primary.
    fn has_backup_slot(&self) -> bool {
        false
    }

    /// Move an unparseable primary aside. Returns the new location on success,
    /// `Ok(None)` when there was nothing to move.
    async fn quarantine_primary(&self) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    /// Short description for log lines.
    fn describe(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Slot {0:?} is not supported by this backend")]
    UnsupportedSlot(Slot),
}

/// Which runtime the process is hosted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Browser,
    Host,
}

/// Detected once at start; the store is handed the matching backend.
pub fn detect_environment() -> Environment {
    if cfg!(target_arch = "wasm32") {
        Environment::Browser
    } else {
        Environment::Host
    }
}

/// Build the backend for the current environment. `data_dir` is only used on
/// the host.
#[cfg(not(target_arch = "wasm32"))]
pub fn default_backend(data_dir: &Path) -> Arc<dyn PersistenceBackend> {
    log::debug!(
        "[kanban.storage] {:?} environment, data dir {:?}",
        detect_environment(),
        data_dir
    );
    Arc::new(fs::FsBackend::new(data_dir))
}

#[cfg(target_arch = "wasm32")]
pub fn default_backend(_data_dir: &Path) -> Arc<dyn PersistenceBackend> {
    log::debug!("[kanban.storage] {:?} environment", detect_environment());
    Arc::new(web::WebBackend::detect(web::BrowserLocalStorage))
}

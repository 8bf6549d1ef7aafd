/// Filesystem storage backend.
///
/// Keeps the board in an application-private data directory:
/// - `board.json` primary, rewritten on every save
/// - `board.backup.json` mirror written right after the primary
/// - `board.corrupt-<ms>.json` quarantined primaries that failed to parse
///
/// Writes are atomic (write to .tmp, fsync, rename, fsync directory).
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{PersistenceBackend, Slot, StorageError};

pub const BOARD_FILE_NAME: &str = "board.json";
pub const BACKUP_FILE_NAME: &str = "board.backup.json";
const CORRUPT_FILE_PREFIX: &str = "board.corrupt-";

pub struct FsBackend {
    dir: PathBuf,
}

impl FsBackend {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, slot: Slot) -> PathBuf {
        match slot {
            Slot::Primary => self.dir.join(BOARD_FILE_NAME),
            Slot::Backup => self.dir.join(BACKUP_FILE_NAME),
        }
    }

    /// List quarantined primaries, oldest first.
    pub async fn corrupt_files(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let Ok(mut entries) = fs::read_dir(&self.dir).await else {
            return found;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(CORRUPT_FILE_PREFIX) && name.ends_with(".json") {
                found.push(entry.path());
            }
        }
        found.sort();
        found
    }

    async fn corrupt_path(&self) -> PathBuf {
        let stamp = crate::types::now_millis();
        let mut candidate = self.dir.join(format!("{}{}.json", CORRUPT_FILE_PREFIX, stamp));
        let mut n = 1;
        while fs::try_exists(&candidate).await.unwrap_or(false) {
            candidate = self
                .dir
                .join(format!("{}{}-{}.json", CORRUPT_FILE_PREFIX, stamp, n));
            n += 1;
        }
        candidate
    }

    async fn write_synced(path: &Path, content: &str) -> Result<(), std::io::Error> {
        let mut file = fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await
    }

    /// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
    async fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let tmp_path = path.with_extension("json.tmp");
        if let Err(e) = Self::write_synced(&tmp_path, content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }

        // fsync directory for rename durability
        if let Some(dir) = path.parent() {
            if let Ok(d) = fs::File::open(dir).await {
                let _ = d.sync_all().await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceBackend for FsBackend {
    async fn read(&self, slot: Slot) -> Option<String> {
        let path = self.path_for(slot);
        match fs::read_to_string(&path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("[kanban.storage.fs] No file at {:?}", path);
                None
            }
            Err(e) => {
                log::warn!("[kanban.storage.fs] Failed to read {:?}: {}", path, e);
                None
            }
        }
    }

    async fn write(&self, slot: Slot, text: &str) -> Result<(), StorageError> {
        let path = self.path_for(slot);
        Self::atomic_write(&path, text).await?;
        Ok(())
    }

    fn has_backup_slot(&self) -> bool {
        true
    }

    async fn quarantine_primary(&self) -> Result<Option<String>, StorageError> {
        let primary = self.path_for(Slot::Primary);
        if fs::metadata(&primary).await.is_err() {
            return Ok(None);
        }
        let target = self.corrupt_path().await;
        fs::rename(&primary, &target).await?;
        Ok(Some(target.to_string_lossy().to_string()))
    }

    fn describe(&self) -> String {
        format!("filesystem:{}", self.dir.display())
    }
}

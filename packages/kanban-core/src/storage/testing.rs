/// In-memory backend with failure switches, shared by store and autosave tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{PersistenceBackend, Slot, StorageError};

#[derive(Default)]
pub struct RecordingBackend {
    slots: Mutex<HashMap<Slot, String>>,
    pub writes: Mutex<Vec<(Slot, String)>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub fail_primary_writes: AtomicBool,
    pub fail_backup_writes: AtomicBool,
    pub fail_quarantine: AtomicBool,
    pub quarantined: Mutex<Vec<String>>,
    pub write_delay: Option<Duration>,
    pub backup_slot: bool,
}

impl RecordingBackend {
    pub fn with_backup() -> Self {
        Self {
            backup_slot: true,
            ..Self::default()
        }
    }

    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn seed(&self, slot: Slot, text: &str) {
        self.slots.lock().unwrap().insert(slot, text.to_string());
    }

    pub fn get(&self, slot: Slot) -> Option<String> {
        self.slots.lock().unwrap().get(&slot).cloned()
    }

    pub fn primary_writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(slot, _)| *slot == Slot::Primary)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl PersistenceBackend for RecordingBackend {
    async fn read(&self, slot: Slot) -> Option<String> {
        self.get(slot)
    }

    async fn write(&self, slot: Slot, text: &str) -> Result<(), StorageError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fail = match slot {
            Slot::Primary => self.fail_primary_writes.load(Ordering::SeqCst),
            Slot::Backup => self.fail_backup_writes.load(Ordering::SeqCst),
        };
        if fail {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.writes.lock().unwrap().push((slot, text.to_string()));
        self.seed(slot, text);
        Ok(())
    }

    fn has_backup_slot(&self) -> bool {
        self.backup_slot
    }

    async fn quarantine_primary(&self) -> Result<Option<String>, StorageError> {
        if self.fail_quarantine.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "rename refused",
            )));
        }
        let Some(text) = self.slots.lock().unwrap().remove(&Slot::Primary) else {
            return Ok(None);
        };
        self.quarantined.lock().unwrap().push(text);
        Ok(Some("memory:corrupt".to_string()))
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}

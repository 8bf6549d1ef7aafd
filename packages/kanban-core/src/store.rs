/// Board load/save orchestration.
///
/// Save writes the envelope to the primary slot, then mirrors the same text
/// into the backup slot when the backend has one. Load reads the primary and
/// falls back to the backup when the primary is missing or unparseable,
/// quarantining the bad primary and restoring it from the backup so the next
/// start takes the fast path again. Secondary failures during recovery
/// (quarantine rename, primary rewrite) are logged and never abort the load.
use std::sync::Arc;

use crate::storage::{PersistenceBackend, Slot, StorageError};
use crate::types::{now_millis, BoardState, PersistedBoardFile};
use crate::validate::parse_board_text;

/// Result of a load, distinguishing first run from corruption.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The primary parsed.
    Loaded(BoardState),
    /// The primary was missing or bad and the backup parsed.
    Recovered {
        state: BoardState,
        quarantined: Option<String>,
    },
    /// Nothing has ever been saved.
    Empty,
    /// Data existed but neither copy parsed.
    Unrecoverable { quarantined: Option<String> },
}

impl LoadOutcome {
    pub fn state(&self) -> Option<&BoardState> {
        match self {
            LoadOutcome::Loaded(state) | LoadOutcome::Recovered { state, .. } => Some(state),
            LoadOutcome::Empty | LoadOutcome::Unrecoverable { .. } => None,
        }
    }

    pub fn into_state(self) -> Option<BoardState> {
        match self {
            LoadOutcome::Loaded(state) | LoadOutcome::Recovered { state, .. } => Some(state),
            LoadOutcome::Empty | LoadOutcome::Unrecoverable { .. } => None,
        }
    }

    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            LoadOutcome::Recovered { .. } | LoadOutcome::Unrecoverable { .. }
        )
    }
}

#[derive(Clone)]
pub struct BoardStore {
    backend: Arc<dyn PersistenceBackend>,
}

impl BoardStore {
    pub fn new(backend: Arc<dyn PersistenceBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn PersistenceBackend> {
        &self.backend
    }

    /// Serialize a board into the compact envelope written by autosave.
    pub fn serialize(state: &BoardState) -> Result<String, StorageError> {
        Ok(PersistedBoardFile::wrap(state, now_millis()).to_json()?)
    }

    pub async fn save_board(&self, state: &BoardState) -> Result<(), StorageError> {
        let text = Self::serialize(state)?;
        self.backend.write(Slot::Primary, &text).await?;
        if self.backend.has_backup_slot() {
            self.backend.write(Slot::Backup, &text).await?;
        }
        log::debug!(
            "[kanban.store.save] Saved {} cards to {}",
            state.cards.len(),
            self.backend.describe()
        );
        Ok(())
    }

    /// Load the board, or `None` when the caller should start from defaults.
    pub async fn load_board(&self, fallback_board_name: &str) -> Option<BoardState> {
        self.load_board_with_report(fallback_board_name)
            .await
            .into_state()
    }

    pub async fn load_board_with_report(&self, fallback_board_name: &str) -> LoadOutcome {
        let primary = self.backend.read(Slot::Primary).await;

        if let Some(text) = &primary {
            match parse_board_text(text, fallback_board_name) {
                Ok(state) => return LoadOutcome::Loaded(state),
                Err(e) => log::warn!(
                    "[kanban.store.load] Primary board in {} is unusable: {}",
                    self.backend.describe(),
                    e
                ),
            }
        }

        if !self.backend.has_backup_slot() {
            return match primary {
                Some(_) => LoadOutcome::Unrecoverable { quarantined: None },
                None => LoadOutcome::Empty,
            };
        }

        let had_primary = primary.is_some();
        let Some(backup_text) = self.backend.read(Slot::Backup).await else {
            if !had_primary {
                return LoadOutcome::Empty;
            }
            let quarantined = self.quarantine_primary().await;
            log::error!("[kanban.store.load] Primary board corrupt and no backup exists");
            return LoadOutcome::Unrecoverable { quarantined };
        };

        let state = match parse_board_text(&backup_text, fallback_board_name) {
            Ok(state) => state,
            Err(e) => {
                log::error!("[kanban.store.load] Backup board is unusable too: {}", e);
                let quarantined = if had_primary {
                    self.quarantine_primary().await
                } else {
                    None
                };
                return LoadOutcome::Unrecoverable { quarantined };
            }
        };

        let quarantined = if had_primary {
            self.quarantine_primary().await
        } else {
            None
        };

        if let Err(e) = self.backend.write(Slot::Primary, &backup_text).await {
            log::warn!(
                "[kanban.store.recover] Could not restore primary from backup: {}",
                e
            );
        }

        log::warn!(
            "[kanban.store.recover] Recovered {} cards from backup",
            state.cards.len()
        );
        LoadOutcome::Recovered { state, quarantined }
    }

    /// Best effort: a failed rename is logged and recovery continues.
    async fn quarantine_primary(&self) -> Option<String> {
        match self.backend.quarantine_primary().await {
            Ok(Some(location)) => {
                log::info!(
                    "[kanban.store.quarantine] Moved unusable primary to {}",
                    location
                );
                Some(location)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!(
                    "[kanban.store.quarantine] Failed to quarantine primary: {}",
                    e
                );
                None
            }
        }
    }
}

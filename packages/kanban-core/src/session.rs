/// Startup wiring between the store, the autosave task and the live board.
use std::time::Duration;

use tokio::sync::watch;

use crate::autosave::AutosaveController;
use crate::storage::StorageError;
use crate::store::{BoardStore, LoadOutcome};
use crate::types::BoardState;

/// Load the board, dropping the result when `cancelled` was raised while the
/// read was in flight (the consumer has gone away).
pub async fn load_unless_cancelled(
    store: &BoardStore,
    fallback_board_name: &str,
    cancelled: &watch::Receiver<bool>,
) -> Option<LoadOutcome> {
    let outcome = store.load_board_with_report(fallback_board_name).await;
    if *cancelled.borrow() {
        log::debug!("[kanban.session.load] Load finished after teardown, discarding result");
        return None;
    }
    Some(outcome)
}

/// The live board plus its autosave task.
pub struct BoardSession {
    board: BoardState,
    outcome: LoadOutcome,
    autosave: AutosaveController,
}

impl BoardSession {
    /// Load from `store` (or start from `defaults`) and arm autosave only
    /// after the load has been applied.
    pub async fn open(
        store: BoardStore,
        defaults: BoardState,
        autosave_delay: Duration,
        cancelled: &watch::Receiver<bool>,
    ) -> Option<Self> {
        let autosave = AutosaveController::spawn(store.clone(), autosave_delay);
        let Some(outcome) = load_unless_cancelled(&store, &defaults.board_name, cancelled).await
        else {
            autosave.shutdown().await;
            return None;
        };

        if let LoadOutcome::Unrecoverable { quarantined } = &outcome {
            log::error!(
                "[kanban.session.open] Stored board unusable (quarantined: {:?}), starting from defaults",
                quarantined
            );
        }

        let board = outcome.state().cloned().unwrap_or(defaults);
        autosave.arm(outcome.state());
        if outcome == LoadOutcome::Empty {
            // First run. After corruption the unreadable copies stay put until
            // the user changes something.
            autosave.schedule(board.clone());
        }

        Some(Self {
            board,
            outcome,
            autosave,
        })
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.outcome
    }

    pub fn autosave(&self) -> &AutosaveController {
        &self.autosave
    }

    /// Mutate the board and schedule an autosave.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut BoardState) -> R) -> R {
        let result = f(&mut self.board);
        self.autosave.schedule(self.board.clone());
        result
    }

    /// Swap in a whole board, e.g. after an import.
    pub fn replace(&mut self, board: BoardState) {
        self.board = board;
        self.autosave.schedule(self.board.clone());
    }

    /// Write anything pending, then stop autosave.
    pub async fn close(self) -> Result<bool, StorageError> {
        let result = self.autosave.flush().await;
        self.autosave.shutdown().await;
        result
    }
}

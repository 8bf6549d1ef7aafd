/// Debounced autosave.
///
/// A single background task owns all writes. Each scheduled state replaces
/// the pending one and restarts the quiet-period timer; only the state held
/// when the timer fires is written. Writes run inside the task loop, so a
/// slow write cannot overlap the next one: states scheduled meanwhile queue
/// up and collapse into one follow-up save.
///
/// Scheduling is ignored until `arm` is called after the initial load, so
/// start-up defaults never overwrite stored data. Dropping the controller or
/// calling `shutdown` discards a pending state without writing it.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::fingerprint::BoardFingerprint;
use crate::storage::StorageError;
use crate::store::BoardStore;
use crate::types::BoardState;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveEvent {
    Saved { cards: usize },
    /// Content matched the last write.
    Skipped,
    Failed { message: String },
}

enum Command {
    Baseline(BoardFingerprint),
    Schedule(BoardState),
    Flush(oneshot::Sender<Result<bool, StorageError>>),
}

pub struct AutosaveController {
    tx: mpsc::UnboundedSender<Command>,
    armed: Arc<AtomicBool>,
    events: broadcast::Sender<AutosaveEvent>,
    task: JoinHandle<()>,
}

impl AutosaveController {
    /// Start the autosave task on the current tokio runtime.
    pub fn spawn(store: BoardStore, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);
        let task = tokio::spawn(run(store, delay, rx, events.clone()));
        Self {
            tx,
            armed: Arc::new(AtomicBool::new(false)),
            events,
            task,
        }
    }

    /// Open the gate once the initial load has finished. `stored` is what is
    /// already in storage, so scheduling it unchanged writes nothing.
    pub fn arm(&self, stored: Option<&BoardState>) {
        if let Some(stored) = stored {
            match BoardFingerprint::of_board(stored) {
                Ok(fp) => {
                    let _ = self.tx.send(Command::Baseline(fp));
                }
                Err(e) => log::warn!("[kanban.autosave.arm] Could not fingerprint board: {}", e),
            }
        }
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Queue `state` for saving after the quiet period. Returns false when the
    /// controller is not armed yet or has stopped.
    pub fn schedule(&self, state: BoardState) -> bool {
        if !self.is_armed() {
            log::debug!("[kanban.autosave.schedule] Ignoring change before initial load");
            return false;
        }
        self.tx.send(Command::Schedule(state)).is_ok()
    }

    /// Write any pending state now. Returns whether a write happened.
    pub async fn flush(&self) -> Result<bool, StorageError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(reply_tx)).is_err() {
            return Ok(false);
        }
        reply_rx.await.unwrap_or(Ok(false))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AutosaveEvent> {
        self.events.subscribe()
    }

    /// Stop the task, discarding any pending state.
    pub async fn shutdown(self) {
        let Self { tx, task, .. } = self;
        drop(tx);
        if let Err(e) = task.await {
            log::warn!("[kanban.autosave.shutdown] Autosave task ended abnormally: {}", e);
        }
    }
}

async fn run(
    store: BoardStore,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    events: broadcast::Sender<AutosaveEvent>,
) {
    let mut last_written: Option<BoardFingerprint> = None;
    let mut pending: Option<(BoardState, Instant)> = None;

    loop {
        let deadline = pending.as_ref().map(|(_, deadline)| *deadline);
        let command = match deadline {
            None => rx.recv().await,
            Some(deadline) => {
                tokio::select! {
                    command = rx.recv() => command,
                    _ = tokio::time::sleep_until(deadline) => {
                        if let Some((state, _)) = pending.take() {
                            let _ = write(&store, &state, &mut last_written, &events).await;
                        }
                        continue;
                    }
                }
            }
        };

        match command {
            None => {
                if pending.is_some() {
                    log::debug!("[kanban.autosave.stop] Discarding pending save");
                }
                break;
            }
            Some(Command::Baseline(fp)) => last_written = Some(fp),
            Some(Command::Schedule(state)) => {
                pending = Some((state, Instant::now() + delay));
            }
            Some(Command::Flush(reply)) => {
                let result = match pending.take() {
                    Some((state, _)) => write(&store, &state, &mut last_written, &events).await,
                    None => Ok(false),
                };
                let _ = reply.send(result);
            }
        }
    }
}

async fn write(
    store: &BoardStore,
    state: &BoardState,
    last_written: &mut Option<BoardFingerprint>,
    events: &broadcast::Sender<AutosaveEvent>,
) -> Result<bool, StorageError> {
    let fingerprint = BoardFingerprint::of_board(state).ok();
    if fingerprint.is_some() && fingerprint == *last_written {
        log::debug!("[kanban.autosave.write] Board unchanged, skipping write");
        let _ = events.send(AutosaveEvent::Skipped);
        return Ok(false);
    }

    match store.save_board(state).await {
        Ok(()) => {
            *last_written = fingerprint;
            let _ = events.send(AutosaveEvent::Saved {
                cards: state.cards.len(),
            });
            Ok(true)
        }
        Err(e) => {
            log::error!("[kanban.autosave.write] Autosave failed: {}", e);
            let _ = events.send(AutosaveEvent::Failed {
                message: e.to_string(),
            });
            Err(e)
        }
    }
}

/// Kanban host: config loading, logging, board load with recovery, one
/// command, then an autosave flush before exit.
pub mod cli;
pub mod commands;
pub mod config;
pub mod dialog;
mod log_bridge;

use std::io;
use std::sync::Arc;

use kanban_core::session::BoardSession;
use kanban_core::storage::{self, StorageError};
use kanban_core::store::{BoardStore, LoadOutcome};
use kanban_core::types::BoardState;
use tokio::sync::watch;

use crate::cli::{Cli, Command};
use crate::commands::CommandError;
use crate::dialog::TerminalDialog;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Failed to save board: {0}")]
    Save(#[from] StorageError),
}

pub async fn run(cli: Cli) -> Result<(), HostError> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let (config, config_status) = config::load_config(&config_path);
    let data_dir = config.resolve_data_dir(cli.data_dir.as_deref());

    match log_bridge::init(&data_dir, config.log_filter()) {
        Ok(path) => log::debug!("[kanban.host] Logging to {}", path.display()),
        Err(e) => eprintln!("kanban: logger already installed: {}", e),
    }
    config_status.log(&config_path);

    let backend = storage::default_backend(&data_dir);
    log::info!("[kanban.host] Using {}", backend.describe());
    let store = BoardStore::new(backend);

    // Ctrl-C while the board is loading abandons the load.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let defaults = BoardState::new(config.default_board_name.clone());
    let session = BoardSession::open(store, defaults, config.autosave_delay(), &cancel_rx).await;
    interrupt.abort();
    let Some(mut session) = session else {
        log::info!("[kanban.host] Interrupted during load");
        return Ok(());
    };

    match session.load_outcome() {
        LoadOutcome::Recovered { quarantined, .. } => eprintln!(
            "kanban: board file was damaged and has been restored from the backup{}",
            quarantined
                .as_deref()
                .map(|q| format!(" (damaged copy kept at {})", q))
                .unwrap_or_default()
        ),
        LoadOutcome::Unrecoverable { quarantined } => eprintln!(
            "kanban: board file and backup are unreadable, starting a new board{}",
            quarantined
                .as_deref()
                .map(|q| format!(" (damaged copy kept at {})", q))
                .unwrap_or_default()
        ),
        LoadOutcome::Loaded(_) | LoadOutcome::Empty => {}
    }

    let command = cli.command.unwrap_or_else(Command::show_all);
    let dialog = Arc::new(TerminalDialog::stdin(command.preset_path()));
    let result = commands::execute(&mut session, command, dialog, &mut io::stdout()).await;

    // Save whatever the command changed, even if it then failed.
    let saved = session.close().await;
    result?;
    saved?;
    Ok(())
}

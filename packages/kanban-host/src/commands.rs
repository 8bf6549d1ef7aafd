use std::io::{self, Write};
use std::sync::Arc;

use kanban_core::board::{BoardStats, CardFilter};
use kanban_core::session::BoardSession;
use kanban_core::transfer::{FileTransfer, HostFileDialog, TransferError};
use kanban_core::types::{now_millis, BoardState, Card, Status};

use crate::cli::{card_filter, Command};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("No card with id {0}")]
    UnknownCard(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Output error: {0}")]
    Io(#[from] io::Error),
}

/// Apply one command to the open session. Mutations go through the session so
/// they are picked up by autosave.
pub async fn execute<W: Write>(
    session: &mut BoardSession,
    command: Command,
    dialog: Arc<dyn HostFileDialog>,
    out: &mut W,
) -> Result<(), CommandError> {
    match command {
        Command::Show {
            blocked,
            priority,
            tags,
            search,
        } => {
            let filter = card_filter(blocked, priority, tags, search);
            render_board(session.board(), &filter, out)?;
        }
        Command::Add {
            title,
            status,
            priority,
            tags,
        } => {
            let card = session.update(|board| {
                let mut card = board.add_card(&title, status.into(), now_millis()).clone();
                if let Some(priority) = priority {
                    card.priority = priority.into();
                }
                card.tags = tags;
                board.update_card(card.clone());
                card
            });
            writeln!(out, "Added {}", card_line(&card))?;
        }
        Command::Move { id, status } => {
            require_card(session.board(), &id)?;
            let status = Status::from(status);
            session.update(|board| board.move_card(&id, status));
            writeln!(out, "Moved {} to {}", id, lane_title(status))?;
        }
        Command::Remove { id } => {
            require_card(session.board(), &id)?;
            if let Some(card) = session.update(|board| board.remove_card(&id)) {
                writeln!(out, "Removed {}", card_line(&card))?;
            }
        }
        Command::Rename { name } => {
            session.update(|board| board.rename(name.trim()));
            writeln!(out, "Board renamed to {}", session.board().board_name)?;
        }
        Command::Export { .. } => {
            let transfer = FileTransfer::Host(dialog);
            if transfer.export_board(session.board()).await? {
                writeln!(out, "Board exported")?;
            } else {
                writeln!(out, "Export cancelled")?;
            }
        }
        Command::Import { .. } => {
            let transfer = FileTransfer::Host(dialog);
            let current_name = session.board().board_name.clone();
            match transfer.import_board(&current_name).await? {
                Some(board) => {
                    writeln!(
                        out,
                        "Imported {} cards into {}",
                        board.cards.len(),
                        board.board_name
                    )?;
                    session.replace(board);
                }
                None => writeln!(out, "Import cancelled")?,
            }
        }
    }
    Ok(())
}

fn require_card(board: &BoardState, id: &str) -> Result<(), CommandError> {
    match board.find_card(id) {
        Some(_) => Ok(()),
        None => Err(CommandError::UnknownCard(id.to_string())),
    }
}

pub fn lane_title(status: Status) -> &'static str {
    match status {
        Status::NotStarted => "Not Started",
        Status::InProgress => "In Progress",
        Status::Blocked => "Blocked",
        Status::Done => "Done",
    }
}

fn card_line(card: &Card) -> String {
    let mut line = format!("[{}] {} ({})", card.priority.as_str(), card.title, card.id);
    for tag in &card.tags {
        line.push_str(" #");
        line.push_str(tag);
    }
    if let Some(reason) = card.blocked_reason.as_deref().filter(|r| !r.is_empty()) {
        line.push_str(&format!(" blocked: {}", reason));
    }
    line
}

/// Board name, statistics over the visible cards, then each lane oldest first.
pub fn render_board<W: Write>(
    board: &BoardState,
    filter: &CardFilter,
    out: &mut W,
) -> io::Result<()> {
    let visible = board.filtered(filter);
    let stats = BoardStats::of(visible);
    writeln!(out, "{}", board.board_name)?;
    writeln!(
        out,
        "{} cards, {} done, {} blocked",
        stats.total, stats.done, stats.blocked
    )?;
    let tags = board.all_tags();
    if !tags.is_empty() {
        writeln!(out, "Tags: {}", tags.join(", "))?;
    }

    for status in Status::ALL {
        let lane: Vec<&Card> = board
            .lane(status)
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();
        writeln!(out)?;
        writeln!(out, "{} ({})", lane_title(status), lane.len())?;
        for card in lane {
            writeln!(out, "  {}", card_line(card))?;
        }
    }
    Ok(())
}

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use kanban_core::board::CardFilter;
use kanban_core::types::{Priority, Status};

#[derive(Parser, Debug)]
#[command(name = "kanban", version, about = "Kanban board with local persistence")]
pub struct Cli {
    /// Config file to read instead of the platform default.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding board.json and its backup.
    #[arg(long = "data-dir", global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Defaults to `show`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the board lane by lane.
    Show {
        /// Only blocked cards.
        #[arg(long)]
        blocked: bool,
        #[arg(long)]
        priority: Option<PriorityArg>,
        /// Cards carrying any of these tags. Repeatable.
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Case-insensitive match on title, notes, blocked reason and tags.
        #[arg(long)]
        search: Option<String>,
    },
    /// Quick-add a card.
    Add {
        title: String,
        #[arg(long, default_value = "not-started")]
        status: StatusArg,
        #[arg(long)]
        priority: Option<PriorityArg>,
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// Move a card to another lane.
    Move { id: String, status: StatusArg },
    Remove { id: String },
    /// Rename the board.
    Rename { name: String },
    /// Write the board to a JSON file.
    Export {
        #[arg(long, value_name = "FILE")]
        to: Option<PathBuf>,
    },
    /// Replace the board with one read from a JSON file.
    Import {
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
    },
}

impl Command {
    /// Path given on the command line for the file dialog, if any.
    pub fn preset_path(&self) -> Option<PathBuf> {
        match self {
            Command::Export { to, .. } => to.clone(),
            Command::Import { from, .. } => from.clone(),
            _ => None,
        }
    }

    pub fn show_all() -> Self {
        Command::Show {
            blocked: false,
            priority: None,
            tags: Vec::new(),
            search: None,
        }
    }
}

pub fn card_filter(
    blocked: bool,
    priority: Option<PriorityArg>,
    tags: Vec<String>,
    search: Option<String>,
) -> CardFilter {
    CardFilter {
        blocked_only: blocked,
        priority: priority.map(Priority::from),
        tags,
        search_query: search.unwrap_or_default(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    #[value(name = "not-started")]
    NotStarted,
    #[value(name = "in-progress")]
    InProgress,
    #[value(name = "blocked")]
    Blocked,
    #[value(name = "done")]
    Done,
}

impl From<StatusArg> for Status {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::NotStarted => Status::NotStarted,
            StatusArg::InProgress => Status::InProgress,
            StatusArg::Blocked => Status::Blocked,
            StatusArg::Done => Status::Done,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

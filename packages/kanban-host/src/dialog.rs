/// Terminal stand-in for the native save/open dialogs.
///
/// A path given on the command line is used as-is. Otherwise the user is
/// prompted on stderr and one line is read from the input. For saves an empty
/// answer accepts the suggested file name; for opens it cancels. End of input
/// cancels both.
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

use kanban_core::transfer::{DialogOptions, HostFileDialog};

pub struct TerminalDialog<R> {
    preset: Option<PathBuf>,
    input: Mutex<R>,
}

impl TerminalDialog<BufReader<Stdin>> {
    pub fn stdin(preset: Option<PathBuf>) -> Self {
        Self::new(preset, BufReader::new(tokio::io::stdin()))
    }
}

impl<R> TerminalDialog<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(preset: Option<PathBuf>, input: R) -> Self {
        Self {
            preset,
            input: Mutex::new(input),
        }
    }

    /// `None` on end of input or a read error.
    async fn prompt(&self, options: &DialogOptions) -> Option<String> {
        let extensions: Vec<String> = options
            .filters
            .iter()
            .flat_map(|f| f.extensions.iter().map(|e| format!("*.{}", e)))
            .collect();
        match &options.default_file_name {
            Some(name) => eprint!("{} [{}] ({}): ", options.title, name, extensions.join(", ")),
            None => eprint!("{} ({}): ", options.title, extensions.join(", ")),
        }

        let mut line = String::new();
        let mut input = self.input.lock().await;
        match input.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                log::warn!("[kanban.dialog.prompt] Failed to read answer: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl<R> HostFileDialog for TerminalDialog<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn pick_save_path(&self, options: &DialogOptions) -> Option<PathBuf> {
        if let Some(path) = &self.preset {
            return Some(path.clone());
        }
        let answer = self.prompt(options).await?;
        if answer.is_empty() {
            return options.default_file_name.as_ref().map(PathBuf::from);
        }
        Some(PathBuf::from(answer))
    }

    async fn pick_open_path(&self, options: &DialogOptions) -> Option<PathBuf> {
        if let Some(path) = &self.preset {
            return Some(path.clone());
        }
        let answer = self.prompt(options).await?;
        if answer.is_empty() {
            return None;
        }
        Some(PathBuf::from(answer))
    }
}

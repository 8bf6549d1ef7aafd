/// Configuration for the kanban host.
/// Reads config.json from ~/.config/kanban-board/config.json (or platform equivalent).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kanban_core::autosave::DEFAULT_AUTOSAVE_DELAY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// Overrides the platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,
    #[serde(default = "default_board_name")]
    pub default_board_name: String,
    /// Log filter used when RUST_LOG is unset.
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_autosave_delay_ms() -> u64 {
    DEFAULT_AUTOSAVE_DELAY.as_millis() as u64
}

fn default_board_name() -> String {
    "Kanban Board".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            autosave_delay_ms: default_autosave_delay_ms(),
            default_board_name: default_board_name(),
            log_level: None,
        }
    }
}

impl HostConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Command-line override first, then the config file, then the platform default.
    pub fn resolve_data_dir(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.data_dir.clone())
            .unwrap_or_else(default_data_dir)
    }

    pub fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or("warn")
    }
}

/// Default config path: ~/.config/kanban-board/config.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kanban-board")
        .join("config.json")
}

/// Default data directory: ~/.local/share/kanban-board
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kanban-board")
}

/// How the config file was found. Logged once the logger is up, since the
/// log file location depends on the config.
#[derive(Debug)]
pub enum ConfigStatus {
    Loaded,
    Missing,
    Invalid(String),
}

impl ConfigStatus {
    pub fn log(&self, path: &Path) {
        match self {
            ConfigStatus::Loaded => {
                log::info!("[kanban.config] Loaded config from {}", path.display())
            }
            ConfigStatus::Missing => {
                log::info!("[kanban.config] No config at {}, using defaults", path.display())
            }
            ConfigStatus::Invalid(e) => {
                log::warn!("[kanban.config] Failed to parse config {}: {}", path.display(), e)
            }
        }
    }
}

/// Load config from path. Returns defaults if the file is missing or unparseable.
pub fn load_config(path: &Path) -> (HostConfig, ConfigStatus) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => (config, ConfigStatus::Loaded),
            Err(e) => (HostConfig::default(), ConfigStatus::Invalid(e.to_string())),
        },
        Err(_) => (HostConfig::default(), ConfigStatus::Missing),
    }
}

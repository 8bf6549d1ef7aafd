use env_logger::Logger;
use log::{Log, Metadata, Record, SetLoggerError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use kanban_core::types::now_millis;

pub const LOG_FILE_NAME: &str = "host.log";

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogEntry {
    timestamp_ms: i64,
    level: String,
    target: String,
    message: String,
}

/// Append-only log file under `<data_dir>/logs`. Opened lazily and reopened
/// after a failure, so a missing directory never stops logging to stderr.
struct HostLogFile {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl HostLogFile {
    fn new(data_dir: &Path) -> Self {
        let path = data_dir.join("logs").join(LOG_FILE_NAME);
        let file = Self::open(&path).ok();
        Self {
            path,
            file: Mutex::new(file),
        }
    }

    fn open(path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn append_entry(&self, entry: &LogEntry) {
        let mut guard = match self.file.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if guard.is_none() {
            match Self::open(&self.path) {
                Ok(file) => *guard = Some(file),
                Err(_) => return,
            }
        }
        if let Some(file) = guard.as_mut() {
            let line = format_log_line(entry);
            let _ = file.write_all(line.as_bytes());
            let _ = file.write_all(b"\n");
            let _ = file.flush();
        }
    }
}

fn format_log_line(entry: &LogEntry) -> String {
    format!(
        "{} [{}] [{}] {}",
        entry.timestamp_ms,
        entry.level.to_uppercase(),
        entry.target,
        entry.message.replace('\n', "\\n")
    )
}

/// env_logger on stderr, teed into the log file.
struct TeeLogger {
    inner: Logger,
    file: HostLogFile,
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.inner.log(record);

        let entry = LogEntry {
            timestamp_ms: now_millis(),
            level: record.level().to_string().to_lowercase(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        };
        self.file.append_entry(&entry);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the process logger. `default_filter` applies when RUST_LOG is unset.
/// Returns the log file path.
pub fn init(data_dir: &Path, default_filter: &str) -> Result<PathBuf, SetLoggerError> {
    let inner = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .build();
    let max_level = inner.filter();
    let logger = Box::leak(Box::new(TeeLogger {
        inner,
        file: HostLogFile::new(data_dir),
    }));
    let path = logger.file.path.clone();
    log::set_logger(logger)?;
    log::set_max_level(max_level);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp_ms: 1_700_000_000_000,
            level: "warn".to_string(),
            target: "kanban_core::store".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_format_log_line_escapes_newlines() {
        assert_eq!(
            format_log_line(&entry("[kanban.store.load] line one\nline two")),
            "1700000000000 [WARN] [kanban_core::store] [kanban.store.load] line one\\nline two"
        );
    }

    #[test]
    fn test_log_file_created_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = HostLogFile::new(dir.path());
        file.append_entry(&entry("first"));
        file.append_entry(&entry("second"));

        let path = dir.path().join("logs").join(LOG_FILE_NAME);
        assert_eq!(file.path, path);
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));
    }

    #[test]
    fn test_log_file_opened_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("not-yet");
        // Parent is a file, so the first open fails.
        fs::write(&data_dir, "").unwrap();
        let file = HostLogFile::new(&data_dir);
        assert!(file.file.lock().unwrap().is_none());
        file.append_entry(&entry("dropped"));

        fs::remove_file(&data_dir).unwrap();
        file.append_entry(&entry("kept"));
        let content = fs::read_to_string(data_dir.join("logs").join(LOG_FILE_NAME)).unwrap();
        assert!(content.contains("kept"));
        assert!(!content.contains("dropped"));
    }
}

/// One-shot board export/import through save/open dialogs (host) or a
/// download link and file input (browser).
///
/// Exchanged files carry the same envelope as autosave; imports go through
/// the same validator as startup loads. Cancelling a dialog is not an error.
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use tokio::sync::oneshot;

use crate::types::{now_millis, BoardState, PersistedBoardFile};
use crate::validate::{parse_board_text, BoardRejection};

pub const JSON_MIME_TYPE: &str = "application/json";
pub const PICKER_ACCEPT: &str = "application/json,.json";
pub const EXPORT_DIALOG_TITLE: &str = "Export Kanban Board";
pub const IMPORT_DIALOG_TITLE: &str = "Import Kanban Board";
const FALLBACK_SLUG: &str = "kanban-board";

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read picked file: {0}")]
    Picker(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid board file: {0}")]
    Invalid(#[from] BoardRejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn json() -> Self {
        Self {
            name: "JSON".to_string(),
            extensions: vec!["json".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogOptions {
    pub title: String,
    pub default_file_name: Option<String>,
    pub filters: Vec<FileFilter>,
}

/// Native save/open dialogs. `None` means the user cancelled.
#[async_trait]
pub trait HostFileDialog: Send + Sync {
    async fn pick_save_path(&self, options: &DialogOptions) -> Option<PathBuf>;
    async fn pick_open_path(&self, options: &DialogOptions) -> Option<PathBuf>;
}

/// Page-side hooks for the browser variant.
pub trait BrowserFileBridge: Send + Sync {
    /// Trigger a client-side download of `payload`.
    fn download(&self, file_name: &str, mime_type: &str, payload: &str);

    /// Show a file input. The bridge reports input and window events on
    /// `session` as they happen.
    fn open_picker(&self, accept: &str, session: FilePickerSession);
}

type PickResult = Result<Option<String>, TransferError>;

enum PickerState {
    Waiting(oneshot::Sender<PickResult>),
    Reading(oneshot::Sender<PickResult>),
    Settled,
}

/// Settles a browser file pick exactly once.
///
/// A file input gives no event when its dialog is dismissed, so the window
/// regaining focus before any file was selected is read as a cancel. Once a
/// file has been selected, focus events are ignored until the read finishes.
#[derive(Clone)]
pub struct FilePickerSession {
    state: Arc<Mutex<PickerState>>,
}

impl FilePickerSession {
    pub fn start() -> (Self, oneshot::Receiver<PickResult>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                state: Arc::new(Mutex::new(PickerState::Waiting(tx))),
            },
            rx,
        )
    }

    fn settle(&self, result: PickResult) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match std::mem::replace(&mut *state, PickerState::Settled) {
            PickerState::Waiting(tx) | PickerState::Reading(tx) => {
                let _ = tx.send(result);
            }
            PickerState::Settled => {}
        }
    }

    /// The input reported a chosen file; its text is being read.
    pub fn file_selected(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        *state = match std::mem::replace(&mut *state, PickerState::Settled) {
            PickerState::Waiting(tx) => PickerState::Reading(tx),
            other => other,
        };
    }

    /// The input changed but holds no file.
    pub fn no_file_selected(&self) {
        self.settle(Ok(None));
    }

    pub fn file_read(&self, text: String) {
        self.settle(Ok(Some(text)));
    }

    pub fn read_failed(&self, message: impl Into<String>) {
        self.settle(Err(TransferError::Picker(message.into())));
    }

    pub fn window_focused(&self) {
        let waiting = self
            .state
            .lock()
            .map(|state| matches!(&*state, PickerState::Waiting(_)))
            .unwrap_or(false);
        if waiting {
            self.settle(Ok(None));
        }
    }

    pub fn is_settled(&self) -> bool {
        self.state
            .lock()
            .map(|state| matches!(&*state, PickerState::Settled))
            .unwrap_or(true)
    }
}

fn slug_separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"))
}

pub fn slugify_board_name(board_name: &str) -> String {
    let lowered = board_name.trim().to_lowercase();
    let slug = slug_separator_regex().replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// `<slug>-<ISO-8601 UTC with ':' and '.' replaced by '-'>.json`
pub fn export_file_name(board_name: &str, now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}-{}.json", slugify_board_name(board_name), stamp)
}

/// Pretty-printed envelope used for exported files.
pub fn export_payload(state: &BoardState) -> Result<String, serde_json::Error> {
    PersistedBoardFile::wrap(state, now_millis()).to_json_pretty()
}

#[derive(Clone)]
pub enum FileTransfer {
    Browser(Arc<dyn BrowserFileBridge>),
    /// Native dialogs and file I/O; not available in browser builds.
    #[cfg(not(target_arch = "wasm32"))]
    Host(Arc<dyn HostFileDialog>),
}

impl FileTransfer {
    /// Returns whether a file was written. Browser downloads always report
    /// success; a cancelled host dialog reports `false`.
    pub async fn export_board_json_file(
        &self,
        board_name: &str,
        payload: &str,
    ) -> Result<bool, TransferError> {
        let file_name = export_file_name(board_name, Utc::now());

        match self {
            FileTransfer::Browser(bridge) => {
                bridge.download(&file_name, JSON_MIME_TYPE, payload);
                Ok(true)
            }
            #[cfg(not(target_arch = "wasm32"))]
            FileTransfer::Host(dialog) => {
                let options = DialogOptions {
                    title: EXPORT_DIALOG_TITLE.to_string(),
                    default_file_name: Some(file_name),
                    filters: vec![FileFilter::json()],
                };
                let Some(path) = dialog.pick_save_path(&options).await else {
                    return Ok(false);
                };
                tokio::fs::write(&path, payload)
                    .await
                    .map_err(|source| TransferError::Write {
                        path: path.clone(),
                        source,
                    })?;
                log::info!("[kanban.transfer.export] Exported board to {:?}", path);
                Ok(true)
            }
        }
    }

    /// Returns the chosen file's text, or `None` when the user cancelled.
    pub async fn import_board_json_file(&self) -> Result<Option<String>, TransferError> {
        match self {
            FileTransfer::Browser(bridge) => {
                let (session, rx) = FilePickerSession::start();
                bridge.open_picker(PICKER_ACCEPT, session);
                // A bridge that drops the session without settling it is a cancel.
                rx.await.unwrap_or(Ok(None))
            }
            #[cfg(not(target_arch = "wasm32"))]
            FileTransfer::Host(dialog) => {
                let options = DialogOptions {
                    title: IMPORT_DIALOG_TITLE.to_string(),
                    default_file_name: None,
                    filters: vec![FileFilter::json()],
                };
                let Some(path) = dialog.pick_open_path(&options).await else {
                    return Ok(None);
                };
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| TransferError::Read {
                        path: path.clone(),
                        source,
                    })?;
                Ok(Some(text))
            }
        }
    }

    /// Export `state` as a pretty envelope.
    pub async fn export_board(&self, state: &BoardState) -> Result<bool, TransferError> {
        let payload = export_payload(state)?;
        self.export_board_json_file(&state.board_name, &payload).await
    }

    /// Pick a file and validate it, falling back to the current board name.
    /// The caller's in-memory board is untouched on any error.
    pub async fn import_board(
        &self,
        current_board_name: &str,
    ) -> Result<Option<BoardState>, TransferError> {
        let Some(text) = self.import_board_json_file().await? else {
            return Ok(None);
        };
        let state = parse_board_text(&text, current_board_name)?;
        log::info!(
            "[kanban.transfer.import] Imported {} cards",
            state.cards.len()
        );
        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify_board_name("Sprint Regression"), "sprint-regression");
        assert_eq!(slugify_board_name("  Q4: Release/Plan!! "), "q4-release-plan");
        assert_eq!(slugify_board_name("---"), "kanban-board");
        assert_eq!(slugify_board_name(""), "kanban-board");
        assert_eq!(slugify_board_name("Überblick"), "berblick");
    }

    #[test]
    fn test_export_file_name() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 5, 7).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(
            export_file_name("Sprint Regression", now),
            "sprint-regression-2026-10-18T09-05-07-123Z.json"
        );
    }

    struct FakeDialog {
        save_to: Option<PathBuf>,
        open_from: Option<PathBuf>,
        seen: Mutex<Vec<DialogOptions>>,
    }

    #[async_trait]
    impl HostFileDialog for FakeDialog {
        async fn pick_save_path(&self, options: &DialogOptions) -> Option<PathBuf> {
            self.seen.lock().unwrap().push(options.clone());
            self.save_to.clone()
        }

        async fn pick_open_path(&self, options: &DialogOptions) -> Option<PathBuf> {
            self.seen.lock().unwrap().push(options.clone());
            self.open_from.clone()
        }
    }

    fn host(save_to: Option<PathBuf>, open_from: Option<PathBuf>) -> (FileTransfer, Arc<FakeDialog>) {
        let dialog = Arc::new(FakeDialog {
            save_to,
            open_from,
            seen: Mutex::new(Vec::new()),
        });
        (FileTransfer::Host(dialog.clone()), dialog)
    }

    #[tokio::test]
    async fn test_host_export_writes_chosen_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.json");
        let (transfer, dialog) = host(Some(target.clone()), None);

        let saved = transfer
            .export_board_json_file("My Board", "{\"cards\":[]}")
            .await
            .unwrap();
        assert!(saved);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"cards\":[]}");

        let seen = dialog.seen.lock().unwrap();
        assert_eq!(seen[0].title, EXPORT_DIALOG_TITLE);
        assert_eq!(seen[0].filters, vec![FileFilter::json()]);
        let suggested = seen[0].default_file_name.as_deref().unwrap();
        assert!(suggested.starts_with("my-board-"));
        assert!(suggested.ends_with("Z.json"));
    }

    #[tokio::test]
    async fn test_host_export_cancel_writes_nothing() {
        let (transfer, _) = host(None, None);
        assert!(!transfer.export_board_json_file("b", "{}").await.unwrap());
    }

    #[tokio::test]
    async fn test_host_export_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (transfer, _) = host(Some(dir.path().join("missing").join("out.json")), None);
        assert!(matches!(
            transfer.export_board_json_file("b", "{}").await,
            Err(TransferError::Write { .. })
        ));
    }

    #[tokio::test]
    async fn test_host_import_validates_with_current_name() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.json");
        std::fs::write(
            &source,
            r#"[{"id":"c1","title":"x","status":"blocked","priority":"high","tags":[],"notes":"","links":[],"evidenceCaptured":false,"createdAt":1}]"#,
        )
        .unwrap();
        let (transfer, dialog) = host(None, Some(source));

        let board = transfer.import_board("Current").await.unwrap().unwrap();
        assert_eq!(board.board_name, "Current");
        assert_eq!(board.cards.len(), 1);
        assert_eq!(dialog.seen.lock().unwrap()[0].title, IMPORT_DIALOG_TITLE);
    }

    #[tokio::test]
    async fn test_host_import_cancel_and_invalid() {
        let (transfer, _) = host(None, None);
        assert!(transfer.import_board("Current").await.unwrap().is_none());

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bad.json");
        std::fs::write(&source, r#"{"boardName":"x","cards":[{"id":1}]}"#).unwrap();
        let (transfer, _) = host(None, Some(source));
        assert!(matches!(
            transfer.import_board("Current").await,
            Err(TransferError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_export_then_import_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let (transfer, _) = host(Some(path.clone()), Some(path));

        let mut state = BoardState::new("Roundtrip");
        state.cards.push(crate::board::new_card("Write tests", crate::types::Status::InProgress, 5));
        assert!(transfer.export_board(&state).await.unwrap());

        let imported = transfer.import_board("Other").await.unwrap().unwrap();
        assert_eq!(imported, state);
    }

    enum PickScript {
        Choose(&'static str),
        FocusThenChoose(&'static str),
        FocusOnly,
        EmptyChange,
        ReadError,
        Drop,
    }

    struct FakeBrowser {
        script: PickScript,
        downloads: Mutex<Vec<(String, String, String)>>,
    }

    impl BrowserFileBridge for FakeBrowser {
        fn download(&self, file_name: &str, mime_type: &str, payload: &str) {
            self.downloads.lock().unwrap().push((
                file_name.to_string(),
                mime_type.to_string(),
                payload.to_string(),
            ));
        }

        fn open_picker(&self, accept: &str, session: FilePickerSession) {
            assert_eq!(accept, PICKER_ACCEPT);
            match self.script {
                PickScript::Choose(text) => {
                    session.file_selected();
                    session.file_read(text.to_string());
                }
                PickScript::FocusThenChoose(text) => {
                    session.file_selected();
                    session.window_focused();
                    session.file_read(text.to_string());
                }
                PickScript::FocusOnly => {
                    session.window_focused();
                    // A late read after the cancel is ignored.
                    session.file_read("late".to_string());
                }
                PickScript::EmptyChange => session.no_file_selected(),
                PickScript::ReadError => {
                    session.file_selected();
                    session.read_failed("NotReadableError");
                }
                PickScript::Drop => drop(session),
            }
        }
    }

    fn browser(script: PickScript) -> (FileTransfer, Arc<FakeBrowser>) {
        let bridge = Arc::new(FakeBrowser {
            script,
            downloads: Mutex::new(Vec::new()),
        });
        (FileTransfer::Browser(bridge.clone()), bridge)
    }

    #[tokio::test]
    async fn test_browser_export_downloads() {
        let (transfer, bridge) = browser(PickScript::Drop);
        assert!(transfer.export_board_json_file("Team Board", "{}").await.unwrap());
        let downloads = bridge.downloads.lock().unwrap();
        assert_eq!(downloads.len(), 1);
        assert!(downloads[0].0.starts_with("team-board-"));
        assert_eq!(downloads[0].1, JSON_MIME_TYPE);
        assert_eq!(downloads[0].2, "{}");
    }

    #[tokio::test]
    async fn test_browser_import_outcomes() {
        let (t, _) = browser(PickScript::Choose("[]"));
        assert_eq!(t.import_board_json_file().await.unwrap().as_deref(), Some("[]"));

        let (t, _) = browser(PickScript::FocusThenChoose("[1]"));
        assert_eq!(t.import_board_json_file().await.unwrap().as_deref(), Some("[1]"));

        let (t, _) = browser(PickScript::FocusOnly);
        assert!(t.import_board_json_file().await.unwrap().is_none());

        let (t, _) = browser(PickScript::EmptyChange);
        assert!(t.import_board_json_file().await.unwrap().is_none());

        let (t, _) = browser(PickScript::Drop);
        assert!(t.import_board_json_file().await.unwrap().is_none());

        let (t, _) = browser(PickScript::ReadError);
        assert!(matches!(
            t.import_board_json_file().await,
            Err(TransferError::Picker(_))
        ));
    }

    #[test]
    fn test_picker_settles_once() {
        let (session, mut rx) = FilePickerSession::start();
        assert!(!session.is_settled());
        session.file_read("first".to_string());
        session.file_read("second".to_string());
        session.window_focused();
        assert!(session.is_settled());
        assert_eq!(rx.try_recv().unwrap().unwrap().as_deref(), Some("first"));
    }
}

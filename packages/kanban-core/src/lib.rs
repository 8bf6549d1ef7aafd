/// Kanban board persistence: card/board validation, primary + backup storage
/// with corruption recovery, JSON export/import and debounced autosave.
pub mod autosave;
pub mod board;
pub mod fingerprint;
pub mod session;
pub mod storage;
pub mod store;
pub mod transfer;
pub mod types;
pub mod validate;

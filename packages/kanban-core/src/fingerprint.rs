/// SHA-256 fingerprints of board content.
///
/// Autosave compares the fingerprint of the board it is about to write with
/// the last one it wrote and skips the write when they match. The envelope's
/// `savedAt` is not part of the fingerprint.
use sha2::{Digest, Sha256};

use crate::types::BoardState;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoardFingerprint(pub String);

impl BoardFingerprint {
    /// Fingerprint raw text with normalized line endings.
    pub fn from_content(content: &str) -> Self {
        let normalized = content.replace("\r\n", "\n");
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn of_board(state: &BoardState) -> Result<Self, serde_json::Error> {
        Ok(Self::from_content(&serde_json::to_string(state)?))
    }
}

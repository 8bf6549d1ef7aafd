use serde::Serialize;

/// Envelope version written by every save and export.
pub const SCHEMA_VERSION: u32 = 1;

/// Board lane a card sits in. The set is closed; anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    NotStarted,
    InProgress,
    Blocked,
    Done,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::NotStarted,
        Status::InProgress,
        Status::Blocked,
        Status::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "not-started",
            Status::InProgress => "in-progress",
            Status::Blocked => "blocked",
            Status::Done => "done",
        }
    }

    /// Exact, case-sensitive match against the wire spelling.
    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub id: String,
    pub label: String,
    pub url: String,
}

/// A single task on the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub notes: String,
    pub links: Vec<Link>,
    /// Only meaningful while `status` is `Blocked`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    pub evidence_captured: bool,
    /// Only meaningful while `evidence_captured` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    pub board_name: String,
    pub cards: Vec<Card>,
}

impl BoardState {
    pub fn new(board_name: impl Into<String>) -> Self {
        Self {
            board_name: board_name.into(),
            cards: Vec::new(),
        }
    }
}

/// The versioned envelope persisted to storage and exchanged as a file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedBoardFile<'a> {
    pub schema_version: u32,
    pub board_name: &'a str,
    pub cards: &'a [Card],
    pub saved_at: i64,
}

impl<'a> PersistedBoardFile<'a> {
    pub fn wrap(state: &'a BoardState, saved_at: i64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            board_name: &state.board_name,
            cards: &state.cards,
            saved_at,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

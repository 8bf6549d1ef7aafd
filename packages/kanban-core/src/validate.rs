/// Structural validation of untyped board payloads.
///
/// Both the startup loader and the interactive importer go through
/// `parse_board_payload`, so a file accepted by one is accepted by the other.
/// Validation is all-or-nothing: one malformed card rejects the whole board,
/// one malformed link or tag rejects the whole card.
use serde_json::{Map, Value};

use crate::types::{BoardState, Card, Link, Priority, Status};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardRejection {
    #[error("card is not an object")]
    NotAnObject,

    #[error("field `{0}` is missing or not a string")]
    NotAString(&'static str),

    #[error("unknown status {0:?}")]
    UnknownStatus(String),

    #[error("unknown priority {0:?}")]
    UnknownPriority(String),

    #[error("`tags` is missing or not an array")]
    TagsNotArray,

    #[error("tag {0} is not a string")]
    InvalidTag(usize),

    #[error("`links` is missing or not an array")]
    LinksNotArray,

    #[error("link {0} is malformed")]
    InvalidLink(usize),

    #[error("`evidenceCaptured` is missing or not a boolean")]
    EvidenceCapturedNotBool,

    #[error("`createdAt` is missing or not a number of milliseconds")]
    InvalidCreatedAt,
}

#[derive(Debug, thiserror::Error)]
pub enum BoardRejection {
    #[error("payload is neither a card list nor a board object")]
    NotABoard,

    #[error("board object has no `cards` array")]
    MissingCards,

    #[error("card {index} rejected: {reason}")]
    InvalidCard { index: usize, reason: CardRejection },

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn required_string(record: &Map<String, Value>, field: &'static str) -> Result<String, CardRejection> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(CardRejection::NotAString(field))
}

/// Optional text fields never reject a card; a wrong type (null included)
/// reads as absent.
fn optional_string(record: &Map<String, Value>, field: &str) -> Option<String> {
    record.get(field).and_then(Value::as_str).map(str::to_string)
}

fn parse_link(raw: &Value) -> Option<Link> {
    let record = raw.as_object()?;
    Some(Link {
        id: record.get("id")?.as_str()?.to_string(),
        label: record.get("label")?.as_str()?.to_string(),
        url: record.get("url")?.as_str()?.to_string(),
    })
}

fn parse_created_at(raw: Option<&Value>) -> Result<i64, CardRejection> {
    let number = raw
        .and_then(Value::as_number)
        .ok_or(CardRejection::InvalidCreatedAt)?;
    if let Some(ms) = number.as_i64() {
        return Ok(ms);
    }
    // Fractional milliseconds are truncated; anything outside i64 is rejected
    // rather than clamped.
    match number.as_f64().map(f64::trunc) {
        Some(ms) if ms >= i64::MIN as f64 && ms < i64::MAX as f64 => Ok(ms as i64),
        _ => Err(CardRejection::InvalidCreatedAt),
    }
}

/// Validate one untyped card. Nested sequences are copied, never aliased.
pub fn parse_card(raw: &Value) -> Result<Card, CardRejection> {
    let record = raw.as_object().ok_or(CardRejection::NotAnObject)?;

    let id = required_string(record, "id")?;
    let title = required_string(record, "title")?;
    let notes = required_string(record, "notes")?;

    let status_raw = required_string(record, "status")?;
    let status =
        Status::from_wire(&status_raw).ok_or(CardRejection::UnknownStatus(status_raw))?;

    let priority_raw = required_string(record, "priority")?;
    let priority =
        Priority::from_wire(&priority_raw).ok_or(CardRejection::UnknownPriority(priority_raw))?;

    let tags = record
        .get("tags")
        .and_then(Value::as_array)
        .ok_or(CardRejection::TagsNotArray)?
        .iter()
        .enumerate()
        .map(|(i, tag)| {
            tag.as_str()
                .map(str::to_string)
                .ok_or(CardRejection::InvalidTag(i))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let links = record
        .get("links")
        .and_then(Value::as_array)
        .ok_or(CardRejection::LinksNotArray)?
        .iter()
        .enumerate()
        .map(|(i, link)| parse_link(link).ok_or(CardRejection::InvalidLink(i)))
        .collect::<Result<Vec<_>, _>>()?;

    let evidence_captured = record
        .get("evidenceCaptured")
        .and_then(Value::as_bool)
        .ok_or(CardRejection::EvidenceCapturedNotBool)?;

    let created_at = parse_created_at(record.get("createdAt"))?;

    Ok(Card {
        id,
        title,
        status,
        priority,
        tags,
        notes,
        links,
        blocked_reason: optional_string(record, "blockedReason"),
        evidence_captured,
        evidence_notes: optional_string(record, "evidenceNotes"),
        assignee: optional_string(record, "assignee"),
        due_date: optional_string(record, "dueDate"),
        created_at,
    })
}

fn parse_cards(raw: &[Value]) -> Result<Vec<Card>, BoardRejection> {
    raw.iter()
        .enumerate()
        .map(|(index, card)| {
            parse_card(card).map_err(|reason| BoardRejection::InvalidCard { index, reason })
        })
        .collect()
}

/// Validate a whole board payload: either the versioned envelope or a bare
/// card array from older exports.
pub fn parse_board_payload(
    payload: &Value,
    fallback_board_name: &str,
) -> Result<BoardState, BoardRejection> {
    match payload {
        Value::Array(cards) => Ok(BoardState {
            board_name: fallback_board_name.to_string(),
            cards: parse_cards(cards)?,
        }),
        Value::Object(record) => {
            let cards = record
                .get("cards")
                .and_then(Value::as_array)
                .ok_or(BoardRejection::MissingCards)?;
            let cards = parse_cards(cards)?;

            if let Some(version) = record.get("schemaVersion").and_then(Value::as_u64) {
                if version != u64::from(crate::types::SCHEMA_VERSION) {
                    log::debug!(
                        "[kanban.validate.board] Reading envelope with schemaVersion {}",
                        version
                    );
                }
            }

            let board_name = record
                .get("boardName")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(fallback_board_name)
                .to_string();

            Ok(BoardState { board_name, cards })
        }
        _ => Err(BoardRejection::NotABoard),
    }
}

/// Decode JSON text and validate it as a board.
pub fn parse_board_text(text: &str, fallback_board_name: &str) -> Result<BoardState, BoardRejection> {
    let payload: Value = serde_json::from_str(text)?;
    parse_board_payload(&payload, fallback_board_name)
}

/// In-memory board mutations and card filtering.
///
/// Every mutation produces a new board state for autosave to pick up. Cards
/// are replaced by id, never patched field by field.
use std::collections::BTreeSet;

use crate::types::{BoardState, Card, Priority, Status};

/// A fresh card with the defaults used by quick-add.
pub fn new_card(title: &str, status: Status, created_at: i64) -> Card {
    Card {
        id: format!("card-{}", created_at),
        title: title.to_string(),
        status,
        priority: Priority::Medium,
        tags: Vec::new(),
        notes: String::new(),
        links: Vec::new(),
        blocked_reason: None,
        evidence_captured: false,
        evidence_notes: None,
        assignee: None,
        due_date: None,
        created_at,
    }
}

impl BoardState {
    pub fn find_card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Append a new card. Ids come from the creation timestamp and get a
    /// numeric suffix when two cards land in the same millisecond.
    pub fn add_card(&mut self, title: &str, status: Status, now: i64) -> &Card {
        let mut card = new_card(title, status, now);
        let mut n = 1;
        while self.find_card(&card.id).is_some() {
            card.id = format!("card-{}-{}", now, n);
            n += 1;
        }
        self.cards.push(card);
        &self.cards[self.cards.len() - 1]
    }

    /// Returns false when no card has the id.
    pub fn move_card(&mut self, id: &str, status: Status) -> bool {
        match self.cards.iter_mut().find(|c| c.id == id) {
            Some(card) => {
                card.status = status;
                true
            }
            None => false,
        }
    }

    pub fn update_card(&mut self, updated: Card) -> bool {
        match self.cards.iter_mut().find(|c| c.id == updated.id) {
            Some(card) => {
                *card = updated;
                true
            }
            None => false,
        }
    }

    pub fn remove_card(&mut self, id: &str) -> Option<Card> {
        let index = self.cards.iter().position(|c| c.id == id)?;
        Some(self.cards.remove(index))
    }

    pub fn rename(&mut self, board_name: impl Into<String>) {
        self.board_name = board_name.into();
    }

    /// Sorted, de-duplicated tags across all cards.
    pub fn all_tags(&self) -> Vec<String> {
        self.cards
            .iter()
            .flat_map(|c| c.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Cards in one lane, oldest first.
    pub fn lane(&self, status: Status) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self.cards.iter().filter(|c| c.status == status).collect();
        cards.sort_by_key(|c| c.created_at);
        cards
    }

    pub fn filtered(&self, filter: &CardFilter) -> Vec<&Card> {
        self.cards.iter().filter(|c| filter.matches(c)).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub blocked_only: bool,
    pub priority: Option<Priority>,
    /// A card matches when it carries at least one of these.
    pub tags: Vec<String>,
    pub search_query: String,
}

impl CardFilter {
    pub fn is_empty(&self) -> bool {
        !self.blocked_only
            && self.priority.is_none()
            && self.tags.is_empty()
            && self.search_query.is_empty()
    }

    pub fn matches(&self, card: &Card) -> bool {
        if self.blocked_only && card.status != Status::Blocked {
            return false;
        }
        if let Some(priority) = self.priority {
            if card.priority != priority {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| card.tags.contains(t)) {
            return false;
        }
        if !self.search_query.is_empty() {
            let query = self.search_query.to_lowercase();
            let mut haystack = vec![
                card.title.as_str(),
                card.notes.as_str(),
                card.blocked_reason.as_deref().unwrap_or(""),
            ];
            haystack.extend(card.tags.iter().map(String::as_str));
            if !haystack.join(" ").to_lowercase().contains(&query) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardStats {
    pub total: usize,
    pub done: usize,
    pub blocked: usize,
}

impl BoardStats {
    pub fn of<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Self {
        cards.into_iter().fold(Self::default(), |mut stats, card| {
            stats.total += 1;
            match card.status {
                Status::Done => stats.done += 1,
                Status::Blocked => stats.blocked += 1,
                Status::NotStarted | Status::InProgress => {}
            }
            stats
        })
    }
}

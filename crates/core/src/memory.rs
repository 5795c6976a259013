//! Conversation continuity: the bounded in-session turn log fed back into
//! the resolver prompt, and the small persisted cross-session shopper hint.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_CAP: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: ConversationRole,
    pub text: String,
}

/// Ordered log of prior turns, capped at the most recent `cap` entries.
/// Oldest turns are evicted first.
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    turns: VecDeque<ConversationTurn>,
    cap: usize,
}

impl ConversationMemory {
    pub fn new(cap: usize) -> Self {
        Self { turns: VecDeque::new(), cap: cap.max(1) }
    }

    pub fn push(&mut self, role: ConversationRole, text: impl Into<String>) {
        self.turns.push_back(ConversationTurn { role, text: text.into() });
        while self.turns.len() > self.cap {
            self.turns.pop_front();
        }
    }

    /// Record a resolved exchange as a user/assistant pair.
    pub fn record_exchange(&mut self, user_text: &str, assistant_text: &str) {
        self.push(ConversationRole::User, user_text);
        self.push(ConversationRole::Assistant, assistant_text);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

/// Persisted once per buyer session, overwritten on every successful
/// provider resolution and read back at prompt-build time. A hint for the
/// model, never validated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopperMemory {
    pub user_want: Option<String>,
    pub intent: String,
    pub summary: String,
    pub at: DateTime<Utc>,
}

impl ShopperMemory {
    /// Summaries are a truncated echo of the user's text, safe for prompts.
    pub fn summarize(text: &str) -> String {
        const MAX: usize = 120;
        let trimmed = text.trim();
        if trimmed.chars().count() <= MAX {
            return trimmed.to_string();
        }
        let cut: String = trimmed.chars().take(MAX).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversationMemory, ConversationRole, ShopperMemory};

    #[test]
    fn memory_never_exceeds_cap_and_evicts_oldest_first() {
        let mut memory = ConversationMemory::new(4);
        for n in 0..6 {
            memory.push(ConversationRole::User, format!("turn {n}"));
        }

        assert_eq!(memory.len(), 4);
        let texts: Vec<&str> = memory.turns().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["turn 2", "turn 3", "turn 4", "turn 5"]);
    }

    #[test]
    fn record_exchange_appends_user_then_assistant() {
        let mut memory = ConversationMemory::new(10);
        memory.record_exchange("mau kopi", "Ini beberapa pilihan kopi");

        let roles: Vec<ConversationRole> = memory.turns().map(|t| t.role).collect();
        assert_eq!(roles, vec![ConversationRole::User, ConversationRole::Assistant]);
    }

    #[test]
    fn clear_resets_the_log() {
        let mut memory = ConversationMemory::default();
        memory.record_exchange("hi", "hello");
        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn summaries_are_truncated_with_ellipsis() {
        let long = "a".repeat(400);
        let summary = ShopperMemory::summarize(&long);
        assert_eq!(summary.chars().count(), 121);
        assert!(summary.ends_with('…'));
        assert_eq!(ShopperMemory::summarize(" short "), "short");
    }
}

//! Per-session conversation history.
//!
//! Each session keeps at most [`HISTORY_LIMIT`] entries, oldest dropped
//! first. A user message and its answer are always written together.

mod memory;
mod sqlite;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::MemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;

use crate::rag::RagError;

pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Entries for `session`, oldest first. Unknown sessions are empty.
    async fn get(&self, session: &str) -> Result<Vec<HistoryEntry>, RagError>;

    /// Pushes one entry and trims to [`HISTORY_LIMIT`].
    async fn append(&self, session: &str, entry: HistoryEntry) -> Result<(), RagError>;

    /// Appends a user message and its answer as one update, trims to
    /// [`HISTORY_LIMIT`] and returns the resulting history.
    async fn append_turn(
        &self,
        session: &str,
        user: &str,
        assistant: &str,
    ) -> Result<Vec<HistoryEntry>, RagError>;

    async fn clear(&self, session: &str) -> Result<(), RagError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::User, Role::Assistant] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("system"), None);
    }

    #[test]
    fn entries_serialize_with_lowercase_roles() {
        let entry = HistoryEntry::new(Role::Assistant, "Rest and fluids.");
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json, serde_json::json!({ "role": "assistant", "content": "Rest and fluids." }));
    }
}

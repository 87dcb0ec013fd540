use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{HistoryEntry, HistoryStore, Role, HISTORY_LIMIT};
use crate::rag::RagError;

/// Process-local history; lost on restart.
#[derive(Default)]
pub struct MemoryHistoryStore {
    sessions: Mutex<HashMap<String, VecDeque<HistoryEntry>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn get(&self, session: &str) -> Result<Vec<HistoryEntry>, RagError> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .get(session)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn append(&self, session: &str, entry: HistoryEntry) -> Result<(), RagError> {
        let mut sessions = self.sessions.lock().await;
        let entries = sessions.entry(session.to_string()).or_default();
        entries.push_back(entry);
        trim(entries);
        Ok(())
    }

    async fn append_turn(
        &self,
        session: &str,
        user: &str,
        assistant: &str,
    ) -> Result<Vec<HistoryEntry>, RagError> {
        let mut sessions = self.sessions.lock().await;
        let entries = sessions.entry(session.to_string()).or_default();
        entries.push_back(HistoryEntry::new(Role::User, user));
        entries.push_back(HistoryEntry::new(Role::Assistant, assistant));
        trim(entries);
        Ok(entries.iter().cloned().collect())
    }

    async fn clear(&self, session: &str) -> Result<(), RagError> {
        self.sessions.lock().await.remove(session);
        Ok(())
    }
}

fn trim(entries: &mut VecDeque<HistoryEntry>) {
    while entries.len() > HISTORY_LIMIT {
        entries.pop_front();
    }
}

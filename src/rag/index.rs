//! Similarity search over embedded chunks.
//!
//! The production backend is the managed Pinecone index in `pinecone`.
//! `InMemoryIndex` backs `index.backend: memory`, filled from local
//! documents at start-up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::documents::Document;
use super::RagError;
use crate::vector_math::rank_descending_by_cosine;

/// A chunk ready to be written to the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Stable identifier within the index.
    pub id: String,
    pub values: Vec<f32>,
    pub text: String,
    pub source: String,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    /// Similarity score (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The `top_k` records most similar to `vector`, best first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredDocument>, RagError>;

    /// Insert or replace records by id.
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<usize, RagError>;
}

#[derive(Default)]
pub struct InMemoryIndex {
    records: RwLock<Vec<IndexRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredDocument>, RagError> {
        let records = self.records.read().await;
        let candidates: Vec<Vec<f32>> = records.iter().map(|r| r.values.clone()).collect();
        let ranked = rank_descending_by_cosine(vector, &candidates)?;

        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| {
                let record = &records[idx];
                ScoredDocument {
                    document: Document::new(record.text.clone(), record.source.clone()),
                    score,
                }
            })
            .collect())
    }

    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<usize, RagError> {
        let count = records.len();
        let mut stored = self.records.write().await;
        for record in records {
            match stored.iter_mut().find(|existing| existing.id == record.id) {
                Some(existing) => *existing = record,
                None => stored.push(record),
            }
        }
        Ok(count)
    }
}

use std::sync::Arc;

use super::documents::Document;
use super::embedding::Embedder;
use super::index::VectorIndex;
use super::RagError;

/// Number of chunks handed to the answer model per question.
pub const TOP_K: usize = 3;

/// Similarity search with a fixed `k`.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RagError> {
        let vector = self.embedder.embed_query(query).await?;
        let hits = self.index.query(&vector, TOP_K).await?;
        tracing::debug!(
            "Retrieved {} chunks (scores: {:?})",
            hits.len(),
            hits.iter().map(|h| h.score).collect::<Vec<_>>()
        );
        Ok(hits.into_iter().map(|hit| hit.document).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::index::{IndexRecord, InMemoryIndex};
    use async_trait::async_trait;

    /// Maps text to a vector by counting a few keywords.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    ["fever", "rash", "fracture"]
                        .iter()
                        .map(|k| t.matches(k).count() as f32 + 0.01)
                        .collect()
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn returns_at_most_three_most_similar_chunks() {
        let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
        let index = Arc::new(InMemoryIndex::new());
        let texts = [
            "fever and chills",
            "high fever in children",
            "rash on the arm",
            "fracture of the wrist",
            "fever with rash",
        ];
        let vectors = embedder
            .embed_documents(&texts.iter().map(|t| t.to_string()).collect::<Vec<_>>())
            .await
            .expect("embed");
        let records = texts
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, values))| IndexRecord {
                id: i.to_string(),
                values,
                text: text.to_string(),
                source: "book.pdf".to_string(),
            })
            .collect();
        index.upsert(records).await.expect("upsert");

        let retriever = Retriever::new(embedder, index);
        let docs = retriever.retrieve("what causes fever?").await.expect("retrieve");

        assert_eq!(docs.len(), TOP_K);
        assert!(docs.iter().all(|d| d.text.contains("fever")));
    }
}

//! Offline index build: load → filter → split → embed → upsert.

use std::path::Path;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::documents::{filter_to_minimal_docs, DirectoryLoader, Document};
use super::embedding::Embedder;
use super::index::{IndexRecord, VectorIndex};
use super::splitter::{Chunk, TextSplitter};
use super::RagError;

/// Embedding requests in flight at once.
const EMBED_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub upserted: usize,
}

pub struct Ingestor {
    loader: DirectoryLoader,
    splitter: TextSplitter,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        loader: DirectoryLoader,
        splitter: TextSplitter,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        batch_size: usize,
    ) -> Self {
        Self {
            loader,
            splitter,
            embedder,
            index,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestReport, RagError> {
        let documents = self.loader.load_directory(dir)?;
        self.ingest_documents(documents).await
    }

    pub async fn ingest_documents(&self, documents: Vec<Document>) -> Result<IngestReport, RagError> {
        let documents = filter_to_minimal_docs(documents);
        let chunks = self.splitter.split_documents(&documents);

        let mut report = IngestReport {
            documents: documents.len(),
            chunks: chunks.len(),
            upserted: 0,
        };
        if chunks.is_empty() {
            tracing::warn!("No chunks to index");
            return Ok(report);
        }

        let batches: Vec<Vec<IndexRecord>> = stream::iter(chunks.chunks(self.batch_size))
            .map(|batch| self.embed_batch(batch))
            .buffered(EMBED_CONCURRENCY)
            .try_collect()
            .await?;

        for records in batches {
            report.upserted += self.index.upsert(records).await?;
            tracing::info!("Upserted {}/{} chunks", report.upserted, report.chunks);
        }

        Ok(report)
    }

    async fn embed_batch(&self, batch: &[Chunk]) -> Result<Vec<IndexRecord>, RagError> {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_documents(&texts).await?;

        Ok(batch
            .iter()
            .zip(vectors)
            .map(|(chunk, values)| IndexRecord {
                id: chunk_id(chunk),
                values,
                text: chunk.text.clone(),
                source: chunk.source().to_string(),
            })
            .collect())
    }
}

/// Stable id so re-running ingestion overwrites rather than duplicates.
fn chunk_id(chunk: &Chunk) -> String {
    let digest = Sha256::digest(format!("{}#{}", chunk.source(), chunk.chunk_index).as_bytes());
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::index::InMemoryIndex;
    use crate::rag::splitter::SplitterConfig;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Err(RagError::Embedding("connection refused".to_string()))
        }
    }

    fn ingestor(embedder: Arc<dyn Embedder>, index: Arc<InMemoryIndex>) -> Ingestor {
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 40,
            chunk_overlap: 5,
        })
        .expect("splitter");
        Ingestor::new(DirectoryLoader::all_formats(), splitter, embedder, index, 3)
    }

    #[tokio::test]
    async fn directory_is_chunked_embedded_and_upserted() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("anemia.md"),
            "Anemia is a lack of healthy red blood cells. Iron helps. Rest helps too.",
        )
        .expect("write");
        std::fs::write(dir.path().join("notes.bin"), [0u8, 1, 2]).expect("write");

        let index = Arc::new(InMemoryIndex::new());
        let report = ingestor(Arc::new(LengthEmbedder), index.clone())
            .ingest_directory(dir.path())
            .await
            .expect("ingest");

        assert_eq!(report.documents, 1);
        assert!(report.chunks > 1);
        assert_eq!(report.upserted, report.chunks);
        assert_eq!(index.len().await, report.chunks);
    }

    #[tokio::test]
    async fn reingesting_overwrites_existing_chunks() {
        let index = Arc::new(InMemoryIndex::new());
        let ingestor = ingestor(Arc::new(LengthEmbedder), index.clone());
        let docs = vec![Document::new("Short note on asthma inhalers and triggers.", "asthma.pdf")];

        let first = ingestor.ingest_documents(docs.clone()).await.expect("first");
        ingestor.ingest_documents(docs).await.expect("second");

        assert_eq!(index.len().await, first.chunks);
    }

    #[tokio::test]
    async fn embedding_failure_aborts_before_upsert() {
        let index = Arc::new(InMemoryIndex::new());
        let docs = vec![Document::new("Gout affects joints.", "gout.pdf")];

        let err = ingestor(Arc::new(FailingEmbedder), index.clone())
            .ingest_documents(docs)
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Embedding(_)));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn empty_input_is_not_an_error() {
        let report = ingestor(Arc::new(LengthEmbedder), Arc::new(InMemoryIndex::new()))
            .ingest_documents(Vec::new())
            .await
            .expect("ingest");
        assert_eq!(report, IngestReport::default());
    }

    #[test]
    fn chunk_ids_are_stable_and_distinct() {
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 10,
            chunk_overlap: 2,
        })
        .expect("splitter");
        let chunks = splitter.split_document(&Document::new("abcdefghij klmnopqrst uvwxyz", "a.pdf"));

        assert_eq!(chunk_id(&chunks[0]), chunk_id(&chunks[0].clone()));
        assert_ne!(chunk_id(&chunks[0]), chunk_id(&chunks[1]));
        assert_eq!(chunk_id(&chunks[0]).len(), 32);
    }
}

//! Text embeddings from an OpenAI-compatible `/embeddings` endpoint
//! (text-embeddings-inference, LM Studio, OpenAI itself).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::RagError;
use crate::core::config::settings::EmbeddingSettings;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// One vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("empty embedding response".to_string()))
    }
}

#[derive(Clone)]
pub struct HttpEmbedder {
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    client: Client,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings, client: Client) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: settings.model.clone(),
            dimension: settings.dimension,
            client,
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": texts,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let res = request.send().await.map_err(RagError::embedding)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("{}: {}", status, text)));
        }

        let payload: EmbeddingsResponse = res.json().await.map_err(RagError::embedding)?;
        order_and_check(payload.data, texts.len(), self.dimension)
    }
}

fn order_and_check(
    mut items: Vec<EmbeddingItem>,
    expected_count: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, RagError> {
    if items.len() != expected_count {
        return Err(RagError::Embedding(format!(
            "expected {} vectors, got {}",
            expected_count,
            items.len()
        )));
    }

    if items.iter().all(|item| item.index.is_some()) {
        items.sort_by_key(|item| item.index);
    }

    items
        .into_iter()
        .map(|item| {
            if item.embedding.len() == dimension {
                Ok(item.embedding)
            } else {
                Err(RagError::Embedding(format!(
                    "expected {} dimensions, got {}",
                    dimension,
                    item.embedding.len()
                )))
            }
        })
        .collect()
}

//! Pinecone REST client (control plane for host lookup, data plane for
//! query and upsert).
//!
//! Chunk text lives in the `text` metadata field next to `source`, the
//! layout the ingestion step writes.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::documents::Document;
use super::index::{IndexRecord, ScoredDocument, VectorIndex};
use super::RagError;
use crate::core::config::settings::PineconeSettings;

const API_KEY_HEADER: &str = "Api-Key";
const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";
const UPSERT_BATCH_SIZE: usize = 100;

#[derive(Clone)]
pub struct PineconeIndex {
    host: String,
    api_key: String,
    api_version: String,
    client: Client,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
    #[serde(default)]
    dimension: Option<usize>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<ChunkMetadata>,
}

#[derive(Serialize, Deserialize)]
struct ChunkMetadata {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

impl PineconeIndex {
    /// Connects to an existing index, resolving its data-plane host from the
    /// control plane when none is configured.
    pub async fn connect(
        settings: &PineconeSettings,
        api_key: &str,
        client: Client,
    ) -> Result<Self, RagError> {
        let host = match settings.host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => describe_index_host(settings, api_key, &client).await?,
        };

        let index = Self {
            host: normalize_host(&host),
            api_key: api_key.to_string(),
            api_version: settings.api_version.clone(),
            client,
        };
        tracing::info!("Using Pinecone index '{}' at {}", settings.index_name, index.host);
        Ok(index)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_VERSION_HEADER, &self.api_version)
    }
}

async fn describe_index_host(
    settings: &PineconeSettings,
    api_key: &str,
    client: &Client,
) -> Result<String, RagError> {
    let url = format!(
        "{}/indexes/{}",
        settings.control_url.trim_end_matches('/'),
        settings.index_name
    );
    let res = client
        .get(&url)
        .header(API_KEY_HEADER, api_key)
        .header(API_VERSION_HEADER, &settings.api_version)
        .send()
        .await
        .map_err(RagError::vector_index)?;

    if !res.status().is_success() {
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        return Err(RagError::VectorIndex(format!(
            "describe index '{}' failed ({}): {}",
            settings.index_name, status, text
        )));
    }

    let described: DescribeIndexResponse = res.json().await.map_err(RagError::vector_index)?;
    if let Some(dimension) = described.dimension {
        tracing::debug!("Index '{}' dimension: {}", settings.index_name, dimension);
    }
    Ok(described.host)
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn matches_to_documents(matches: Vec<QueryMatch>) -> Vec<ScoredDocument> {
    matches
        .into_iter()
        .filter_map(|m| {
            let metadata = m.metadata?;
            let Some(text) = metadata.text else {
                tracing::warn!("Match {} has no text metadata; skipping", m.id);
                return None;
            };
            let source = metadata
                .source
                .unwrap_or_else(|| super::documents::UNKNOWN_SOURCE.to_string());
            Some(ScoredDocument {
                document: Document::new(text, source),
                score: m.score,
            })
        })
        .collect()
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredDocument>, RagError> {
        let url = format!("{}/query", self.host);
        let body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });

        let res = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(RagError::vector_index)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::VectorIndex(format!("query failed ({}): {}", status, text)));
        }

        let payload: QueryResponse = res.json().await.map_err(RagError::vector_index)?;
        Ok(matches_to_documents(payload.matches))
    }

    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<usize, RagError> {
        let url = format!("{}/vectors/upsert", self.host);
        let mut upserted = 0;

        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let vectors: Vec<_> = batch
                .iter()
                .map(|record| {
                    let metadata = ChunkMetadata {
                        text: Some(record.text.clone()),
                        source: Some(record.source.clone()),
                    };
                    json!({
                        "id": record.id,
                        "values": record.values,
                        "metadata": metadata,
                    })
                })
                .collect();

            let res = self
                .authorized(self.client.post(&url))
                .json(&json!({ "vectors": vectors }))
                .send()
                .await
                .map_err(RagError::vector_index)?;

            if !res.status().is_success() {
                let status = res.status();
                let text = res.text().await.unwrap_or_default();
                return Err(RagError::VectorIndex(format!(
                    "upsert failed ({}): {}",
                    status, text
                )));
            }

            let payload: UpsertResponse = res.json().await.map_err(RagError::vector_index)?;
            upserted += payload.upserted_count;
        }

        Ok(upserted)
    }
}

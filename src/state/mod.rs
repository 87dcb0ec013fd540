use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use reqwest::Client;

use crate::core::config::{AppPaths, HistoryBackend, Settings};
use crate::core::config::settings::RagSettings;
use crate::core::security::derive_cookie_key;
use crate::history::{HistoryStore, MemoryHistoryStore, SqliteHistoryStore};
use crate::rag::{
    DirectoryLoader, Embedder, HttpEmbedder, InMemoryIndex, Ingestor, OpenAiChatModel,
    PineconeIndex, PromptAssembler, RagPipeline, Retriever, SplitterConfig, TextSplitter,
    VectorIndex,
};

pub mod error;

use error::InitializationError;

/// Shared application state handed to every route.
///
/// Holds the loaded settings, the chat pipeline (with its external
/// clients and history store) and the cookie signing key.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pipeline: Arc<RagPipeline>,
    cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl AppState {
    pub fn new(settings: Settings, pipeline: RagPipeline) -> Self {
        let (secret, insecure) = settings.secret_key();
        if insecure {
            tracing::warn!(
                "SECRET_KEY is not set; session cookies are signed with an insecure default key"
            );
        }

        Self {
            cookie_key: derive_cookie_key(&secret),
            settings: Arc::new(settings),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Builds the production state.
    ///
    /// 1. Checks the required API keys
    /// 2. Builds one HTTP client shared by all external services
    /// 3. Resolves the Pinecone index, or indexes the local documents
    /// 4. Opens the configured history backend
    pub async fn initialize(settings: Settings, paths: &AppPaths) -> Result<Self, InitializationError> {
        let secrets = settings.require_secrets()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.http.timeout_secs))
            .build()
            .map_err(InitializationError::HttpClient)?;

        let embedder: Arc<dyn Embedder> =
            Arc::new(HttpEmbedder::new(&settings.embedding, client.clone()));

        let index: Arc<dyn VectorIndex> = match secrets.pinecone_api_key.as_deref() {
            Some(api_key) => Arc::new(
                PineconeIndex::connect(&settings.pinecone, api_key, client.clone())
                    .await
                    .map_err(InitializationError::VectorIndex)?,
            ),
            None => {
                let documents_dir = paths.project_root.join(&settings.index.documents_dir);
                build_local_index(
                    &documents_dir,
                    &settings.rag,
                    settings.embedding.batch_size,
                    embedder.clone(),
                )
                .await?
            }
        };
        let generator = OpenAiChatModel::new(&settings.openai, &secrets.openai_api_key, client);

        let history: Arc<dyn HistoryStore> = match settings.history.backend {
            HistoryBackend::Memory => Arc::new(MemoryHistoryStore::new()),
            HistoryBackend::Sqlite => Arc::new(
                SqliteHistoryStore::new(&paths.db_path)
                    .await
                    .map_err(InitializationError::History)?,
            ),
        };

        let pipeline = RagPipeline::new(
            Retriever::new(embedder, index),
            PromptAssembler::new(settings.rag.system_prompt.clone()),
            Arc::new(generator),
            history,
        )
        .with_retrieval_query(settings.rag.retrieval_query)
        .with_fallback_answer(settings.rag.fallback_answer.clone());

        tracing::info!(
            "Chat pipeline ready (model={}, index={:?}, history={:?}, retrieval_query={:?})",
            settings.openai.model,
            settings.index.backend,
            settings.history.backend,
            settings.rag.retrieval_query
        );

        Ok(Self::new(settings, pipeline))
    }
}

/// Embeds every document under `documents_dir` into a fresh in-process
/// index. An unreadable directory fails start-up.
async fn build_local_index(
    documents_dir: &Path,
    rag: &RagSettings,
    batch_size: usize,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<InMemoryIndex>, InitializationError> {
    let splitter = TextSplitter::new(SplitterConfig {
        chunk_size: rag.chunk_size,
        chunk_overlap: rag.chunk_overlap,
    })
    .map_err(InitializationError::VectorIndex)?;

    let index = Arc::new(InMemoryIndex::new());
    let ingestor = Ingestor::new(
        DirectoryLoader::all_formats(),
        splitter,
        embedder,
        index.clone(),
        batch_size,
    );
    let report = ingestor
        .ingest_directory(documents_dir)
        .await
        .map_err(InitializationError::VectorIndex)?;

    tracing::info!(
        "Local index built from {}: {} documents, {} chunks",
        documents_dir.display(),
        report.documents,
        report.chunks
    );
    Ok(index)
}

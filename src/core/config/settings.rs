use serde::{Deserialize, Serialize};

use super::defaults::*;
use super::ConfigError;

/// Which text is sent to the retriever for a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalQuery {
    /// The trimmed user message on its own.
    #[default]
    Message,
    /// The full "Conversation so far" input, history included.
    Conversation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Where retrieval runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// The hosted Pinecone index filled by `aariv-ingest`.
    #[default]
    Pinecone,
    /// Process-local index built from `index.documents_dir` at start-up.
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub index: IndexSettings,
    pub pinecone: PineconeSettings,
    pub openai: OpenAiSettings,
    pub embedding: EmbeddingSettings,
    pub rag: RagSettings,
    pub history: HistorySettings,
    pub http: HttpSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub secret_key: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_allowed_origins: Vec::new(),
            secret_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    pub documents_dir: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            documents_dir: DEFAULT_DOCUMENTS_DIR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeSettings {
    pub api_key: Option<String>,
    pub index_name: String,
    /// Data-plane host. Resolved from the control plane when absent.
    pub host: Option<String>,
    pub control_url: String,
    pub api_version: String,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: DEFAULT_PINECONE_INDEX.to_string(),
            host: None,
            control_url: DEFAULT_PINECONE_CONTROL_URL.to_string(),
            api_version: DEFAULT_PINECONE_API_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub retrieval_query: RetrievalQuery,
    pub system_prompt: String,
    pub fallback_answer: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            retrieval_query: RetrievalQuery::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            fallback_answer: FALLBACK_ANSWER.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub backend: HistoryBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

/// Secrets the server cannot start without.
#[derive(Debug, Clone)]
pub struct RequiredSecrets {
    /// `None` only with the memory index backend.
    pub pinecone_api_key: Option<String>,
    pub openai_api_key: String,
}

impl Settings {
    pub fn require_secrets(&self) -> Result<RequiredSecrets, ConfigError> {
        let pinecone_api_key = match self.index.backend {
            IndexBackend::Pinecone => Some(
                non_empty(self.pinecone.api_key.as_deref())
                    .ok_or(ConfigError::MissingSecret("PINECONE_API_KEY"))?,
            ),
            IndexBackend::Memory => None,
        };
        let openai_api_key = non_empty(self.openai.api_key.as_deref())
            .ok_or(ConfigError::MissingSecret("OPENAI_API_KEY"))?;
        Ok(RequiredSecrets {
            pinecone_api_key,
            openai_api_key,
        })
    }

    /// Cookie signing secret and whether it is the insecure fallback.
    pub fn secret_key(&self) -> (String, bool) {
        match non_empty(self.server.secret_key.as_deref()) {
            Some(key) => (key, false),
            None => (INSECURE_SECRET_KEY.to_string(), true),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_openai_key_is_reported_by_name() {
        let mut settings = Settings::default();
        settings.pinecone.api_key = Some("pc".to_string());
        settings.openai.api_key = Some("   ".to_string());

        let err = settings.require_secrets().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("OPENAI_API_KEY")));
    }

    #[test]
    fn pinecone_key_is_required_by_default() {
        let mut settings = Settings::default();
        settings.openai.api_key = Some("sk".to_string());

        let err = settings.require_secrets().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("PINECONE_API_KEY")));
    }

    #[test]
    fn memory_index_needs_only_the_openai_key() {
        let mut settings = Settings::default();
        settings.index.backend = IndexBackend::Memory;
        settings.openai.api_key = Some("sk".to_string());

        let secrets = settings.require_secrets().expect("secrets");
        assert_eq!(secrets.pinecone_api_key, None);
        assert_eq!(secrets.openai_api_key, "sk");
    }

    #[test]
    fn secret_key_falls_back_to_insecure_default() {
        let settings = Settings::default();
        let (key, insecure) = settings.secret_key();
        assert_eq!(key, INSECURE_SECRET_KEY);
        assert!(insecure);
    }

    #[test]
    fn defaults_match_the_hosted_stack() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.index.backend, IndexBackend::Pinecone);
        assert_eq!(settings.index.documents_dir, "Data");
        assert_eq!(settings.pinecone.index_name, "aariv-medical-chatbot");
        assert_eq!(settings.openai.model, "gpt-4o");
        assert_eq!(settings.embedding.dimension, 384);
        assert_eq!(settings.rag.retrieval_query, RetrievalQuery::Message);
    }
}

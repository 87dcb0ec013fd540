use thiserror::Error;

use crate::core::config::ConfigError;
use crate::rag::RagError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Failed to connect to vector index: {0}")]
    VectorIndex(#[source] RagError),

    #[error("Failed to initialize history store: {0}")]
    History(#[source] RagError),
}

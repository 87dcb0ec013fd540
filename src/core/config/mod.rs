pub mod defaults;
pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

use thiserror::Error;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::{HistoryBackend, IndexBackend, RequiredSecrets, RetrievalQuery, Settings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config at '{path}': expected {expected}")]
    InvalidType { path: String, expected: &'static str },

    #[error("Invalid config at '{path}': {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("Missing {0}; set it in the environment or .env file")]
    MissingSecret(&'static str),

    #[error("Failed to deserialize settings: {0}")]
    Deserialize(#[from] serde_json::Error),
}

use std::error::Error as StdError;

use thiserror::Error;

/// Failures of the retrieval-augmented pipeline and its collaborators.
///
/// Everything except `EmptyMessage` is an upstream or infrastructure
/// failure and surfaces to HTTP callers as a generic 500.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load documents: {0}")]
    Loader(String),

    #[error("embedding service error: {0}")]
    Embedding(String),

    #[error("vector index error: {0}")]
    VectorIndex(String),

    #[error("answer generation error: {0}")]
    Generation(String),

    #[error("history store error: {0}")]
    History(String),
}

impl RagError {
    pub fn embedding<E: StdError>(err: E) -> Self {
        RagError::Embedding(describe_chain(&err))
    }

    pub fn vector_index<E: StdError>(err: E) -> Self {
        RagError::VectorIndex(describe_chain(&err))
    }

    pub fn generation<E: StdError>(err: E) -> Self {
        RagError::Generation(describe_chain(&err))
    }

    pub fn history<E: StdError>(err: E) -> Self {
        RagError::History(describe_chain(&err))
    }
}

/// `err` followed by every `source()` below it, joined with `": "`.
/// Transport errors keep the actual cause (refused connection, TLS,
/// DNS) in their sources rather than in their own message.
fn describe_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

//! Retrieval-augmented answering over the medical knowledge base.
//!
//! Query side: [`Retriever`] → [`PromptAssembler`] → [`AnswerGenerator`],
//! composed by [`RagPipeline`]. Index side: [`Ingestor`].

pub mod documents;
pub mod embedding;
mod error;
pub mod generator;
pub mod index;
pub mod ingest;
pub mod pinecone;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod splitter;

pub use documents::{DirectoryLoader, Document};
pub use embedding::{Embedder, HttpEmbedder};
pub use error::RagError;
pub use generator::{AnswerGenerator, ChatMessage, OpenAiChatModel};
pub use index::{InMemoryIndex, IndexRecord, ScoredDocument, VectorIndex};
pub use ingest::{IngestReport, Ingestor};
pub use pinecone::PineconeIndex;
pub use pipeline::{ChatTurn, RagPipeline};
pub use prompt::PromptAssembler;
pub use retriever::{Retriever, TOP_K};
pub use splitter::{SplitterConfig, TextSplitter};

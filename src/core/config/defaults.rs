pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8081;

pub const DEFAULT_PINECONE_INDEX: &str = "aariv-medical-chatbot";
pub const DEFAULT_PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_PINECONE_API_VERSION: &str = "2024-07";
/// Source documents, relative to the project root.
pub const DEFAULT_DOCUMENTS_DIR: &str = "Data";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://127.0.0.1:8080/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 64;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Insecure fallback for cookie signing when `SECRET_KEY` is unset.
pub const INSECURE_SECRET_KEY: &str = "super-secret-key";

pub const FALLBACK_ANSWER: &str = "Sorry, I could not generate an answer.";

pub const BANNER: &str = "Aariv";

/// Persona instruction for the answer model. `{context}` receives the
/// retrieved chunks.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Aariv, a medical assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\n{context}";

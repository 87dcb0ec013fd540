use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aariv_backend::core::config::{AppPaths, ConfigService};
use aariv_backend::core::logging;
use aariv_backend::rag::{
    DirectoryLoader, HttpEmbedder, Ingestor, PineconeIndex, SplitterConfig, TextSplitter,
};
use anyhow::Context;
use clap::Parser;
use reqwest::Client;

/// Builds the Pinecone index from a directory of source documents.
#[derive(Parser, Debug)]
#[command(name = "aariv-ingest")]
#[command(about = "Load, chunk, embed and upsert the medical knowledge base", long_about = None)]
struct Args {
    /// Directory holding the source documents; defaults to index.documents_dir
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Also index .txt and .md files
    #[arg(long)]
    all_formats: bool,

    /// Overrides rag.chunk_size
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Overrides rag.chunk_overlap
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Overrides embedding.batch_size
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let settings = ConfigService::new(paths.clone())
        .load_settings()
        .context("Failed to load configuration")?;
    let api_key = settings
        .pinecone
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .context("PINECONE_API_KEY is not set")?;

    let splitter = TextSplitter::new(SplitterConfig {
        chunk_size: args.chunk_size.unwrap_or(settings.rag.chunk_size),
        chunk_overlap: args.chunk_overlap.unwrap_or(settings.rag.chunk_overlap),
    })?;
    let loader = if args.all_formats {
        DirectoryLoader::all_formats()
    } else {
        DirectoryLoader::pdf_only()
    };

    let client = Client::builder()
        .timeout(Duration::from_secs(settings.http.timeout_secs))
        .build()?;
    let index = PineconeIndex::connect(&settings.pinecone, api_key, client.clone()).await?;
    let embedder = HttpEmbedder::new(&settings.embedding, client);

    let ingestor = Ingestor::new(
        loader,
        splitter,
        Arc::new(embedder),
        Arc::new(index),
        args.batch_size.unwrap_or(settings.embedding.batch_size),
    );
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| paths.project_root.join(&settings.index.documents_dir));
    let report = ingestor
        .ingest_directory(&data_dir)
        .await
        .with_context(|| format!("Failed to ingest {}", data_dir.display()))?;

    tracing::info!(
        "Indexed {} chunks from {} documents ({} upserted)",
        report.chunks,
        report.documents,
        report.upserted
    );
    Ok(())
}

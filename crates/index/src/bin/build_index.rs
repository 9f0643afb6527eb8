use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use index::{EmbeddingClient, QdrantIndexer};
use ingest::ChunkerConfig;

/// Populate the knowledge base from a directory of company documents.
#[derive(Parser, Debug)]
#[command(name = "build_index")]
struct Args {
    /// Directory of company documents (.txt / .md), searched recursively
    #[arg(long)]
    docs: PathBuf,

    #[arg(long, default_value = "http://localhost:6333")]
    qdrant_url: String,

    #[arg(long, default_value = "company_documents")]
    collection: String,

    #[arg(long, default_value = "http://localhost:11434")]
    ollama_url: String,

    #[arg(long, default_value = "nomic-embed-text")]
    embedding_model: String,

    #[arg(long, default_value_t = 400)]
    max_tokens: usize,

    #[arg(long, default_value_t = 60)]
    overlap_tokens: usize,

    #[arg(long, default_value_t = 32)]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let chunks = ingest::ingest_directory(
        &args.docs,
        ChunkerConfig {
            max_tokens: args.max_tokens,
            overlap_tokens: args.overlap_tokens,
        },
    )
    .await
    .with_context(|| format!("Failed to ingest {:?}", args.docs))?;

    if chunks.is_empty() {
        anyhow::bail!("No .txt or .md documents found under {:?}", args.docs);
    }

    let embeddings = EmbeddingClient::new(
        args.ollama_url,
        args.embedding_model,
        Duration::from_secs(60),
    )?;
    let indexer = QdrantIndexer::new(args.qdrant_url, embeddings, args.collection.clone());
    indexer.init_collection().await?;

    let indexed = indexer.index_chunks(&chunks, args.batch_size).await?;
    info!(collection = %args.collection, chunks = indexed, "Knowledge base ready");
    Ok(())
}

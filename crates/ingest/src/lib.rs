pub mod boilerplate;
pub mod chunk;
pub mod chunker;
pub mod extractor;
pub mod reader;
pub mod sections;
pub mod text;

pub use boilerplate::TemplateFilter;
pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig};
pub use extractor::TextExtractor;
pub use reader::FileReader;
pub use sections::parse_markdown_sections;
pub use text::{clean_text, split_sentences};

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// Generate a stable document ID from file path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Chunks one company document for the knowledge base.
pub async fn ingest_file(file_path: &Path, config: ChunkerConfig) -> Result<Vec<Chunk>> {
    let content = FileReader::read_file(file_path).await?;
    let path_str = file_path.to_string_lossy().to_string();
    let doc_id = generate_doc_id(&path_str);

    let chunker = Chunker::new(config);
    Ok(chunker.chunk_text(&doc_id, &content, &path_str))
}

/// Chunks every supported company document below `dir_path`.
pub async fn ingest_directory(dir_path: &Path, config: ChunkerConfig) -> Result<Vec<Chunk>> {
    let files = FileReader::read_directory(dir_path).await?;
    let chunker = Chunker::new(config);

    let mut all_chunks = Vec::new();
    for (path, content) in &files {
        let doc_id = generate_doc_id(path);
        all_chunks.extend(chunker.chunk_text(&doc_id, content, path));
    }

    info!(
        documents = files.len(),
        chunks = all_chunks.len(),
        "Ingested company documents"
    );
    Ok(all_chunks)
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::info;

use ingest::Chunk;

use crate::embeddings::EmbeddingClient;

pub struct QdrantIndexer {
    base_url: String,
    client: reqwest::Client,
    embedding_client: EmbeddingClient,
    collection_name: String,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct UpsertPoints {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: u64,
    vector: Vec<f32>,
    payload: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct CollectionInfo {
    result: CollectionResult,
}

#[derive(Deserialize)]
struct CollectionResult {
    collections: Vec<Collection>,
}

#[derive(Deserialize)]
struct Collection {
    name: String,
}

impl QdrantIndexer {
    pub fn new(
        base_url: impl Into<String>,
        embedding_client: EmbeddingClient,
        collection_name: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            embedding_client,
            collection_name: collection_name.into(),
        }
    }

    /// Creates the collection if missing, sized to the embedding model.
    pub async fn init_collection(&self) -> Result<()> {
        let url = format!("{}/collections", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach Qdrant")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to list collections: {}", response.status());
        }

        let collections: CollectionInfo = response.json().await?;
        let exists = collections
            .result
            .collections
            .iter()
            .any(|c| c.name == self.collection_name);

        if exists {
            info!(collection = %self.collection_name, "Collection already exists");
            return Ok(());
        }

        let dimension = self.embedding_client.get_dimension().await?;
        let url = format!("{}/collections/{}", self.base_url, self.collection_name);
        let create_req = CreateCollection {
            vectors: VectorParams {
                size: dimension,
                distance: "Cosine".to_string(),
            },
        };

        let response = self.client.put(&url).json(&create_req).send().await?;
        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to create collection: {}", error_text);
        }

        info!(collection = %self.collection_name, dimension, "Collection created");
        Ok(())
    }

    /// Embeds and upserts chunks in groups of `batch_size`.
    pub async fn index_chunks(&self, chunks: &[Chunk], batch_size: usize) -> Result<usize> {
        let mut indexed = 0;
        for batch in chunks.chunks(batch_size.max(1)) {
            let mut points = Vec::with_capacity(batch.len());
            for chunk in batch {
                let vector = self
                    .embedding_client
                    .embed(&chunk.embedding_text())
                    .await
                    .with_context(|| format!("Failed to embed chunk {}", chunk.chunk_id))?;
                points.push(Point {
                    id: point_id(&chunk.chunk_id),
                    vector,
                    payload: payload(chunk),
                });
            }

            let url = format!(
                "{}/collections/{}/points?wait=true",
                self.base_url, self.collection_name
            );
            let response = self
                .client
                .put(&url)
                .json(&UpsertPoints { points })
                .send()
                .await?;
            if !response.status().is_success() {
                let error_text = response.text().await?;
                anyhow::bail!("Failed to upsert points: {}", error_text);
            }

            indexed += batch.len();
            info!(indexed, total = chunks.len(), "Upserted batch");
        }
        Ok(indexed)
    }
}

/// Qdrant point IDs must be integers or UUIDs; the chunk hash is reduced to
/// a u64 so re-indexing the same chunk overwrites its point.
fn point_id(chunk_id: &str) -> u64 {
    let digest = Sha256::digest(chunk_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn payload(chunk: &Chunk) -> HashMap<String, Value> {
    HashMap::from([
        ("chunk_id".to_string(), json!(chunk.chunk_id)),
        ("doc_id".to_string(), json!(chunk.doc_id)),
        ("text".to_string(), json!(chunk.text)),
        ("source".to_string(), json!(chunk.source)),
        ("heading".to_string(), json!(chunk.heading)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_deterministic() {
        assert_eq!(point_id("abc"), point_id("abc"));
        assert_ne!(point_id("abc"), point_id("abd"));
    }

    #[test]
    fn test_payload_carries_text_and_source() {
        let chunk = Chunk::new("doc", "10-Q.md", Some("Liquidity"), 3, "Cash rose.".into());
        let payload = payload(&chunk);
        assert_eq!(payload["text"], "Cash rose.");
        assert_eq!(payload["source"], "10-Q.md");
        assert_eq!(payload["heading"], "Liquidity");
    }
}

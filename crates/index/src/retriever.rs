use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use model::Retriever;

use crate::embeddings::EmbeddingClient;

/// Knowledge-base search over a Qdrant collection populated by `build_index`.
pub struct QdrantRetriever {
    base_url: String,
    collection_name: String,
    client: reqwest::Client,
    embedding_client: EmbeddingClient,
    top_k: usize,
    score_threshold: Option<f32>,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Map<String, serde_json::Value>>,
}

impl QdrantRetriever {
    pub fn new(
        base_url: impl Into<String>,
        collection_name: impl Into<String>,
        embedding_client: EmbeddingClient,
        top_k: usize,
        score_threshold: Option<f32>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection_name: collection_name.into(),
            client: reqwest::Client::new(),
            embedding_client,
            top_k,
            score_threshold,
        }
    }

    fn evidence_from(response: SearchResponse) -> Vec<String> {
        response
            .result
            .into_iter()
            .filter_map(|point| {
                let text = point.payload?.get("text")?.as_str()?.trim().to_string();
                debug!(score = point.score, "Retrieved passage");
                (!text.is_empty()).then_some(text)
            })
            .collect()
    }
}

#[async_trait]
impl Retriever for QdrantRetriever {
    fn id(&self) -> String {
        format!(
            "qdrant:{}/{}:top{}",
            self.collection_name,
            self.embedding_client.model(),
            self.top_k
        )
    }

    async fn query(&self, text: &str) -> Result<Vec<String>> {
        let vector = self
            .embedding_client
            .embed(text)
            .await
            .context("Failed to embed query")?;

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection_name
        );
        let mut body = json!({
            "vector": vector,
            "limit": self.top_k,
            "with_payload": true
        });
        if let Some(threshold) = self.score_threshold {
            body["score_threshold"] = json!(threshold);
        }

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send search request to Qdrant")?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Qdrant search failed: {}", error_text);
        }

        let response: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Qdrant response")?;
        Ok(Self::evidence_from(response))
    }
}

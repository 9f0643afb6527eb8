use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use model::{Classification, Classifier};

use crate::client::OllamaClient;
use crate::normalizer::LabelNormalizer;
use crate::prompt::{CLASSIFICATION_SYSTEM, build_classification_prompt};
use crate::schema::ClassificationResponse;

pub struct LlmClassifier {
    client: OllamaClient,
    max_repairs: usize,
}

impl LlmClassifier {
    pub fn new(client: OllamaClient, max_repairs: usize) -> Self {
        Self {
            client,
            max_repairs,
        }
    }

    /// One classification per sentence, or an error for the whole batch.
    pub fn parse_response(value: Value, expected: usize) -> Result<Vec<Classification>> {
        let response: ClassificationResponse =
            serde_json::from_value(value).context("Classification response has wrong shape")?;
        if response.results.len() != expected {
            anyhow::bail!(
                "Expected {} classifications, model returned {}",
                expected,
                response.results.len()
            );
        }
        response
            .results
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                LabelNormalizer::classification(raw)
                    .with_context(|| format!("Invalid classification for sentence {}", i + 1))
            })
            .collect()
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn model_id(&self) -> String {
        format!("ollama:{}", self.client.model())
    }

    async fn classify(&self, texts: &[String]) -> Result<Vec<Classification>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = build_classification_prompt(texts);
        let value = self
            .client
            .generate_json_with_retry(Some(CLASSIFICATION_SYSTEM), &prompt, self.max_repairs)
            .await
            .context("Failed to classify sentences")?;
        Self::parse_response(value, texts.len())
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::json::extract_json;
use crate::prompt::build_retry_prompt;

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    format: &'a str, // "json" for structured output
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            format: "json",
            options: OllamaOptions { temperature: 0.0 },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(ollama_response.response)
    }

    /// Generates and parses a JSON object. Unparseable output is sent back
    /// with a repair prompt up to `max_repairs` times.
    pub async fn generate_json_with_retry(
        &self,
        system: Option<&str>,
        prompt: &str,
        max_repairs: usize,
    ) -> Result<Value> {
        let mut response = self.generate(system, prompt).await?;

        for attempt in 0..=max_repairs {
            match extract_json(&response) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_repairs => {
                    debug!(model = %self.model, attempt = attempt + 1, error = %e, "Invalid JSON, asking model to repair");
                    response = self.generate(None, &build_retry_prompt(&response)).await?;
                }
                Err(e) => {
                    return Err(e).context(format!(
                        "Failed to get valid JSON after {} repair attempts",
                        max_repairs
                    ));
                }
            }
        }

        anyhow::bail!("Failed to get valid JSON from {}", self.model)
    }
}

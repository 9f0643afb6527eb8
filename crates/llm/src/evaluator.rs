use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use model::{Evaluation, EvaluationLabel, Evaluator};

use crate::client::OllamaClient;
use crate::normalizer::LabelNormalizer;
use crate::prompt::{DELTA_SYSTEM, EVALUATION_SYSTEM, build_delta_prompt, build_evaluation_prompt};
use crate::schema::{DeltaResponse, RawEvaluation};

pub struct LlmEvaluator {
    client: OllamaClient,
    max_repairs: usize,
    delta_analysis: bool,
}

impl LlmEvaluator {
    pub fn new(client: OllamaClient, max_repairs: usize, delta_analysis: bool) -> Self {
        Self {
            client,
            max_repairs,
            delta_analysis,
        }
    }

    async fn delta(&self, text: &str, section: &str, evidence: &[String]) -> Result<String> {
        let prompt = build_delta_prompt(text, section, evidence);
        let value = self
            .client
            .generate_json_with_retry(Some(DELTA_SYSTEM), &prompt, self.max_repairs)
            .await?;
        let response: DeltaResponse =
            serde_json::from_value(value).context("Delta response has wrong shape")?;
        Ok(response.delta_analysis)
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    fn model_id(&self) -> String {
        format!("ollama:{}", self.client.model())
    }

    async fn evaluate(
        &self,
        text: &str,
        section: &str,
        evidence: &[String],
    ) -> Result<Evaluation> {
        if evidence.iter().all(|e| e.trim().is_empty()) {
            return Ok(Evaluation::no_evidence());
        }

        let prompt = build_evaluation_prompt(text, section, evidence);
        let value = self
            .client
            .generate_json_with_retry(Some(EVALUATION_SYSTEM), &prompt, self.max_repairs)
            .await
            .context("Failed to evaluate snippet")?;
        let raw: RawEvaluation =
            serde_json::from_value(value).context("Evaluation response has wrong shape")?;
        let mut evaluation = LabelNormalizer::evaluation(&raw)?;
        debug!(section, label = %evaluation.label, score = ?evaluation.support_score, "Evaluated snippet");

        // The verdict stands even if the follow-up call fails.
        if self.delta_analysis && evaluation.label == EvaluationLabel::PartiallySupported {
            match self.delta(text, section, evidence).await {
                Ok(delta) => evaluation.delta_analysis = Some(delta),
                Err(e) => warn!(section, error = %e, "Delta analysis failed"),
            }
        }

        Ok(evaluation)
    }
}

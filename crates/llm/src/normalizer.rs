use anyhow::{Result, anyhow};

use model::{
    ClaimType, Classification, ContentType, Evaluation, EvaluationLabel, Labeled, Relevance,
    SubjectScope,
};

use crate::schema::{RawClassification, RawEvaluation};

const DEFAULT_CONFIDENCE: f32 = 0.5;
const SUPPORTED_THRESHOLD: f32 = 0.9;

/// Maps free-form model labels onto the closed label sets. Unrecognised
/// values are errors rather than silent defaults.
pub struct LabelNormalizer;

impl LabelNormalizer {
    pub fn classification(raw: &RawClassification) -> Result<Classification> {
        Ok(Classification {
            claim_type: labeled(
                ClaimType::parse(&raw.claim_type),
                "claim_type",
                &raw.claim_type,
                raw.claim_type_confidence,
            )?,
            subject_scope: labeled(
                SubjectScope::parse(&raw.subject_scope),
                "subject_scope",
                &raw.subject_scope,
                raw.subject_scope_confidence,
            )?,
            content_type: labeled(
                ContentType::parse(&raw.content_type),
                "content_type",
                &raw.content_type,
                raw.content_type_confidence,
            )?,
            relevance: labeled(
                Relevance::parse(&raw.content_relevance),
                "content_relevance",
                &raw.content_relevance,
                raw.content_relevance_confidence,
            )?,
        })
    }

    /// A Partially Supported verdict scored at or above 0.9 is promoted to
    /// Supported. The model may not return `Unknown`.
    pub fn evaluation(raw: &RawEvaluation) -> Result<Evaluation> {
        let mut label = EvaluationLabel::parse(&raw.evaluation)
            .ok_or_else(|| anyhow!("unrecognised evaluation label '{}'", raw.evaluation))?;
        if label == EvaluationLabel::Unknown {
            anyhow::bail!("model returned the reserved label 'Unknown'");
        }

        let support_score = raw.support_score.filter(|s| s.is_finite());
        if label == EvaluationLabel::PartiallySupported
            && support_score.is_some_and(|s| s >= SUPPORTED_THRESHOLD)
        {
            label = EvaluationLabel::Supported;
        }

        Ok(Evaluation {
            label,
            rationale: raw.reason.trim().to_string(),
            support_score,
            delta_analysis: None,
        })
    }
}

fn labeled<T>(
    value: Option<T>,
    facet: &str,
    raw: &str,
    confidence: Option<f32>,
) -> Result<Labeled<T>> {
    let value = value.ok_or_else(|| anyhow!("unrecognised {} '{}'", facet, raw))?;
    Ok(Labeled::new(value, confidence.unwrap_or(DEFAULT_CONFIDENCE)))
}

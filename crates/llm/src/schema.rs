use serde::Deserialize;

/// One classifier result as the model returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawClassification {
    pub claim_type: String,
    pub claim_type_confidence: Option<f32>,
    pub subject_scope: String,
    pub subject_scope_confidence: Option<f32>,
    #[serde(alias = "sentence_type")]
    pub content_type: String,
    #[serde(alias = "sentence_type_confidence")]
    pub content_type_confidence: Option<f32>,
    #[serde(alias = "relevance")]
    pub content_relevance: String,
    #[serde(alias = "relevance_confidence")]
    pub content_relevance_confidence: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationResponse {
    pub results: Vec<RawClassification>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEvaluation {
    #[serde(alias = "label")]
    pub evaluation: String,
    #[serde(default, alias = "rationale")]
    pub reason: String,
    pub support_score: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeltaResponse {
    pub delta_analysis: String,
}

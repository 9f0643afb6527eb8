use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stage::Stage;

/// Result of one collaborator call for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok(T),
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn from_result(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(e) => Outcome::Failed(format!("{e:#}")),
        }
    }

    pub fn ok(&self) -> Option<&T> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Failed(reason) => Some(reason),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Declares a closed set of facet values with a stable wire name.
macro_rules! facet_value {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Lenient parse: case, spaces and hyphens are ignored.
            pub fn parse(value: &str) -> Option<Self> {
                let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
                match normalized.as_str() {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

facet_value!(
    /// Whether the claim is stated as fact or as a forward-looking view.
    ClaimType {
        Assertion => "assertion",
        Hypothesis => "hypothesis",
    }
);

facet_value!(
    /// What the claim is about.
    SubjectScope {
        Company => "company",
        Industry => "industry",
        Macro => "macro",
        Other => "other",
    }
);

facet_value!(
    ContentType {
        Quantitative => "quantitative",
        Qualitative => "qualitative",
    }
);

facet_value!(
    /// Boilerplate items are out of scope for retrieval and statistics.
    Relevance {
        CompanyRelevant => "company_relevant",
        TemplateBoilerplate => "template_boilerplate",
    }
);

/// The four independent classification facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    ClaimType,
    SubjectScope,
    ContentType,
    Relevance,
}

impl Facet {
    pub const ALL: [Facet; 4] = [
        Facet::ClaimType,
        Facet::SubjectScope,
        Facet::ContentType,
        Facet::Relevance,
    ];

    /// Every value the facet can take, in declaration order.
    pub fn values(self) -> Vec<&'static str> {
        match self {
            Facet::ClaimType => ClaimType::ALL.iter().map(|v| v.as_str()).collect(),
            Facet::SubjectScope => SubjectScope::ALL.iter().map(|v| v.as_str()).collect(),
            Facet::ContentType => ContentType::ALL.iter().map(|v| v.as_str()).collect(),
            Facet::Relevance => Relevance::ALL.iter().map(|v| v.as_str()).collect(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Facet::ClaimType => "claim_type",
            Facet::SubjectScope => "subject_scope",
            Facet::ContentType => "content_type",
            Facet::Relevance => "relevance",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Labeled<T> {
    pub value: T,
    pub confidence: f32,
}

impl<T> Labeled<T> {
    /// Confidence is clamped to [0, 1]; NaN becomes 0.5.
    pub fn new(value: T, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.5
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { value, confidence }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub claim_type: Labeled<ClaimType>,
    pub subject_scope: Labeled<SubjectScope>,
    pub content_type: Labeled<ContentType>,
    pub relevance: Labeled<Relevance>,
}

impl Classification {
    pub fn is_in_scope(&self) -> bool {
        self.relevance.value == Relevance::CompanyRelevant
    }

    /// `(facet, value, confidence)` in `Facet::ALL` order.
    pub fn facets(&self) -> [(Facet, &'static str, f32); 4] {
        [
            (
                Facet::ClaimType,
                self.claim_type.value.as_str(),
                self.claim_type.confidence,
            ),
            (
                Facet::SubjectScope,
                self.subject_scope.value.as_str(),
                self.subject_scope.confidence,
            ),
            (
                Facet::ContentType,
                self.content_type.value.as_str(),
                self.content_type.confidence,
            ),
            (
                Facet::Relevance,
                self.relevance.value.as_str(),
                self.relevance.confidence,
            ),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EvaluationLabel {
    #[serde(rename = "Supported")]
    Supported,
    #[serde(rename = "Partially Supported")]
    PartiallySupported,
    #[serde(rename = "Not Supported")]
    NotSupported,
    #[serde(rename = "Contradicted")]
    Contradicted,
    #[serde(rename = "No Evidence")]
    NoEvidence,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl EvaluationLabel {
    pub const ALL: [EvaluationLabel; 6] = [
        EvaluationLabel::Supported,
        EvaluationLabel::PartiallySupported,
        EvaluationLabel::NotSupported,
        EvaluationLabel::Contradicted,
        EvaluationLabel::NoEvidence,
        EvaluationLabel::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationLabel::Supported => "Supported",
            EvaluationLabel::PartiallySupported => "Partially Supported",
            EvaluationLabel::NotSupported => "Not Supported",
            EvaluationLabel::Contradicted => "Contradicted",
            EvaluationLabel::NoEvidence => "No Evidence",
            EvaluationLabel::Unknown => "Unknown",
        }
    }

    /// Accepts `Partially Supported`, `partially_supported`, `PARTIALLY-SUPPORTED`, ...
    pub fn parse(value: &str) -> Option<Self> {
        let wanted: String = value
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        EvaluationLabel::ALL.into_iter().find(|label| {
            let name: String = label
                .as_str()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_lowercase())
                .collect();
            name == wanted
        })
    }
}

impl fmt::Display for EvaluationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub label: EvaluationLabel,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_score: Option<f32>,
    /// What the evidence is missing, for partially supported claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_analysis: Option<String>,
}

impl Evaluation {
    pub fn new(label: EvaluationLabel, rationale: impl Into<String>) -> Self {
        Self {
            label,
            rationale: rationale.into(),
            support_score: None,
            delta_analysis: None,
        }
    }

    pub fn no_evidence() -> Self {
        Self {
            support_score: Some(0.0),
            ..Self::new(
                EvaluationLabel::NoEvidence,
                "No evidence found in knowledge base",
            )
        }
    }
}

/// A sentence or snippet from the analyst report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub section: String,
    pub index: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Outcome<Classification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Outcome<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Outcome<Evaluation>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("item {section}#{index}: {field} is set but {missing} is not")]
pub struct EnrichmentError {
    pub section: String,
    pub index: usize,
    pub field: &'static str,
    pub missing: &'static str,
}

impl Item {
    pub fn new(section: impl Into<String>, index: usize, text: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            index,
            text: text.into(),
            classification: None,
            evidence: None,
            evaluation: None,
        }
    }

    /// Boilerplate is out of scope. A failed or missing classification
    /// cannot prove that, so those items stay in scope.
    pub fn is_in_scope(&self) -> bool {
        match &self.classification {
            Some(Outcome::Ok(classification)) => classification.is_in_scope(),
            Some(Outcome::Failed(_)) | None => true,
        }
    }

    /// Checks monotonic enrichment: later fields require earlier ones.
    pub fn check_enrichment(&self) -> Result<(), EnrichmentError> {
        let violation = |field, missing| EnrichmentError {
            section: self.section.clone(),
            index: self.index,
            field,
            missing,
        };
        if self.evaluation.is_some() {
            if self.evidence.is_none() {
                return Err(violation("evaluation", "evidence"));
            }
            if self.classification.is_none() {
                return Err(violation("evaluation", "classification"));
            }
        }
        if self.evidence.is_some() && self.classification.is_none() {
            return Err(violation("evidence", "classification"));
        }
        Ok(())
    }

    /// Whether this item has exactly the shape `stage` produces.
    pub fn satisfies(&self, stage: Stage) -> bool {
        if self.text.trim().is_empty() || self.check_enrichment().is_err() {
            return false;
        }
        let classified = self.classification.is_some();
        let in_scope = self.is_in_scope();
        match stage {
            Stage::Extract => !classified && self.evidence.is_none() && self.evaluation.is_none(),
            Stage::Classify => classified && self.evidence.is_none() && self.evaluation.is_none(),
            Stage::Match => {
                classified && self.evidence.is_some() == in_scope && self.evaluation.is_none()
            }
            Stage::Evaluate | Stage::Analyze => {
                classified
                    && self.evidence.is_some() == in_scope
                    && self.evaluation.is_some() == in_scope
            }
        }
    }
}

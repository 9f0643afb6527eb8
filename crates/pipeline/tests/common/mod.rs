//! Mock collaborators driven by markers embedded in item text.
//!
//! - `[boilerplate]` classifies as template boilerplate
//! - `[classify-fail]` / `[retrieve-fail]` / `[eval-fail]` fail that call
//! - `[no-evidence]` retrieves nothing
//! - `[partial]`, `[not-supported]`, `[contradicted]`, `[unknown]` pick the
//!   evaluation label; anything else is `Supported`
//! - `[slow:N]` delays retrieval by N milliseconds

#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use model::{
    ClaimType, Classification, Classifier, ContentType, Evaluation, EvaluationLabel, Evaluator,
    ExtractedSection, Extractor, Labeled, Relevance, Retriever, SubjectScope,
};
use pipeline::{Collaborators, PipelineConfig};

pub struct MockExtractor {
    sections: Vec<ExtractedSection>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Extractor for MockExtractor {
    fn id(&self) -> String {
        "mock-extractor".to_string()
    }

    async fn extract(&self, _path: &Path) -> Result<Vec<ExtractedSection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sections.clone())
    }
}

#[derive(Default)]
pub struct MockClassifier {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Classifier for MockClassifier {
    fn model_id(&self) -> String {
        "mock-classifier".to_string()
    }

    async fn classify(&self, texts: &[String]) -> Result<Vec<Classification>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if texts.iter().any(|t| t.contains("[classify-fail]")) {
            bail!("classifier returned malformed JSON");
        }
        Ok(texts
            .iter()
            .map(|text| {
                let relevance = if text.contains("[boilerplate]") {
                    Relevance::TemplateBoilerplate
                } else {
                    Relevance::CompanyRelevant
                };
                let content_type = if text.chars().any(|c| c.is_ascii_digit()) {
                    ContentType::Quantitative
                } else {
                    ContentType::Qualitative
                };
                Classification {
                    claim_type: Labeled::new(ClaimType::Assertion, 0.9),
                    subject_scope: Labeled::new(SubjectScope::Company, 0.8),
                    content_type: Labeled::new(content_type, 0.7),
                    relevance: Labeled::new(relevance, 0.95),
                }
            })
            .collect())
    }
}

#[derive(Default)]
pub struct MockRetriever {
    pub calls: AtomicUsize,
}

fn slow_marker(text: &str) -> Option<u64> {
    let start = text.find("[slow:")? + "[slow:".len();
    let end = text[start..].find(']')? + start;
    text[start..end].parse().ok()
}

#[async_trait]
impl Retriever for MockRetriever {
    fn id(&self) -> String {
        "mock-retriever".to_string()
    }

    async fn query(&self, text: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ms) = slow_marker(text) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if text.contains("[retrieve-fail]") {
            bail!("knowledge base unavailable");
        }
        if text.contains("[no-evidence]") {
            return Ok(Vec::new());
        }
        Ok(vec![format!("evidence for {text}")])
    }
}

#[derive(Default)]
pub struct MockEvaluator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Evaluator for MockEvaluator {
    fn model_id(&self) -> String {
        "mock-evaluator".to_string()
    }

    async fn evaluate(&self, text: &str, _section: &str, _evidence: &[String]) -> Result<Evaluation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("[eval-fail]") {
            bail!("evaluator timed out");
        }
        let label = if text.contains("[partial]") {
            EvaluationLabel::PartiallySupported
        } else if text.contains("[not-supported]") {
            EvaluationLabel::NotSupported
        } else if text.contains("[contradicted]") {
            EvaluationLabel::Contradicted
        } else if text.contains("[unknown]") {
            EvaluationLabel::Unknown
        } else {
            EvaluationLabel::Supported
        };
        Ok(Evaluation::new(label, "mock judgement"))
    }
}

pub struct Mocks {
    pub extractor: Arc<MockExtractor>,
    pub classifier: Arc<MockClassifier>,
    pub retriever: Arc<MockRetriever>,
    pub evaluator: Arc<MockEvaluator>,
}

impl Mocks {
    pub fn new(sections: Vec<ExtractedSection>) -> Self {
        Self {
            extractor: Arc::new(MockExtractor {
                sections,
                calls: AtomicUsize::new(0),
            }),
            classifier: Arc::default(),
            retriever: Arc::default(),
            evaluator: Arc::default(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            extractor: self.extractor.clone(),
            classifier: self.classifier.clone(),
            retriever: self.retriever.clone(),
            evaluator: self.evaluator.clone(),
        }
    }

    /// Extract, classify, retrieve and evaluate call counts.
    pub fn calls(&self) -> [usize; 4] {
        [
            self.extractor.calls.load(Ordering::SeqCst),
            self.classifier.calls.load(Ordering::SeqCst),
            self.retriever.calls.load(Ordering::SeqCst),
            self.evaluator.calls.load(Ordering::SeqCst),
        ]
    }
}

pub fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.retry.max_retries = 1;
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 2;
    config.concurrency.request_timeout_secs = 5;
    config.classification.batch_size = 4;
    config.matching.batch_size = 3;
    config.evaluation.batch_size = 3;
    config
}

/// Ten items: two boilerplate, four supported, one partially supported,
/// one not supported, one without evidence and one contradicted.
pub fn scenario() -> Vec<ExtractedSection> {
    vec![
        ExtractedSection::new(
            "Investment Thesis",
            vec![
                "Revenue grew 12% year over year.".into(),
                "Gross margin expanded to 41%.".into(),
                "Management reiterated full-year guidance.".into(),
                "The new plant doubles capacity [partial].".into(),
            ],
        ),
        ExtractedSection::new(
            "Risks",
            vec![
                "Churn is rising in the SMB segment [not-supported].".into(),
                "A rival is preparing a price war [no-evidence].".into(),
                "Net debt fell to zero last quarter [contradicted].".into(),
                "Supply contracts run through 2027.".into(),
            ],
        ),
        ExtractedSection::new(
            "Disclosures",
            vec![
                "This report is for informational purposes only [boilerplate].".into(),
                "Past performance is no guarantee of future results [boilerplate].".into(),
            ],
        ),
    ]
}

/// Same ten items, but retrieval finds evidence for only five of the eight
/// in-scope ones; the evaluator still judges all eight: four supported, one
/// partially supported, two not supported, one contradicted.
pub fn scenario_sparse_evidence() -> Vec<ExtractedSection> {
    vec![
        ExtractedSection::new(
            "Investment Thesis",
            vec![
                "Revenue grew 12% year over year.".into(),
                "Gross margin expanded to 41%.".into(),
                "Management reiterated full-year guidance [no-evidence].".into(),
                "The new plant doubles capacity [partial].".into(),
            ],
        ),
        ExtractedSection::new(
            "Risks",
            vec![
                "Churn is rising in the SMB segment [not-supported] [no-evidence].".into(),
                "A rival is preparing a price war [not-supported] [no-evidence].".into(),
                "Net debt fell to zero last quarter [contradicted].".into(),
                "Supply contracts run through 2027.".into(),
            ],
        ),
        ExtractedSection::new(
            "Disclosures",
            vec![
                "This report is for informational purposes only [boilerplate].".into(),
                "Past performance is no guarantee of future results [boilerplate].".into(),
            ],
        ),
    ]
}

/// `count` plain claims in one section; `marker` is appended to item
/// `marked` (zero-based).
pub fn numbered(count: usize, marked: usize, marker: &str) -> Vec<ExtractedSection> {
    let sentences = (0..count)
        .map(|i| {
            if i == marked {
                format!("Claim number {i} {marker}.")
            } else {
                format!("Claim number {i}.")
            }
        })
        .collect();
    vec![ExtractedSection::new("Body", sentences)]
}

//! External services each stage wraps. Implementations live in `ingest`,
//! `llm` and `index`; tests substitute mocks.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::document::ExtractedSection;
use crate::item::{Classification, Evaluation};

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Identifier recorded in cache metadata.
    fn id(&self) -> String;

    async fn extract(&self, path: &Path) -> Result<Vec<ExtractedSection>>;
}

#[async_trait]
pub trait Classifier: Send + Sync {
    fn model_id(&self) -> String;

    /// Must return exactly one classification per input text, in order.
    async fn classify(&self, texts: &[String]) -> Result<Vec<Classification>>;
}

#[async_trait]
pub trait Retriever: Send + Sync {
    fn id(&self) -> String;

    /// Evidence snippets, most relevant first. Empty means nothing matched.
    async fn query(&self, text: &str) -> Result<Vec<String>>;
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    fn model_id(&self) -> String;

    async fn evaluate(&self, text: &str, section: &str, evidence: &[String])
    -> Result<Evaluation>;
}

pub mod classifier;
pub mod client;
pub mod evaluator;
pub mod json;
pub mod normalizer;
pub mod prompt;
pub mod schema;

pub use classifier::LlmClassifier;
pub use client::OllamaClient;
pub use evaluator::LlmEvaluator;
pub use json::extract_json;
pub use normalizer::LabelNormalizer;

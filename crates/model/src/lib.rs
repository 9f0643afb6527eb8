pub mod collaborator;
pub mod document;
pub mod item;
pub mod stage;

pub use collaborator::{Classifier, Evaluator, Extractor, Retriever};
pub use document::{DocumentKey, DocumentResult, ExtractedSection, Section};
pub use item::{
    ClaimType, Classification, ContentType, EnrichmentError, Evaluation, EvaluationLabel, Facet,
    Item, Labeled, Outcome, Relevance, SubjectScope,
};
pub use stage::{Checkpoint, Stage, UnknownCheckpoint};

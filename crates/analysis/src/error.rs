use model::{DocumentKey, EnrichmentError};

/// Violations of the analyzer's input contract. All are fatal.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("document '{document}' has no items to analyze")]
    EmptyInput { document: DocumentKey },

    #[error("document '{document}': in-scope item {section}#{index} has no evaluation")]
    Unlabeled {
        document: DocumentKey,
        section: String,
        index: usize,
    },

    #[error("document '{document}': {source}")]
    OutOfOrder {
        document: DocumentKey,
        #[source]
        source: EnrichmentError,
    },
}

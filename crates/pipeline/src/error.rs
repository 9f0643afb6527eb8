use std::path::PathBuf;

use analysis::AnalysisError;
use model::{Checkpoint, DocumentKey, Stage};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {stage} cache entry: {source}")]
    Serialize {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(
        "checkpoint '{checkpoint}' needs the {stage} cache of document '{document}' at {location}: {reason}"
    )]
    MissingCheckpoint {
        document: DocumentKey,
        checkpoint: Checkpoint,
        stage: Stage,
        location: String,
        reason: String,
    },

    #[error("extraction failed for document '{document}'")]
    Extraction {
        document: DocumentKey,
        #[source]
        source: anyhow::Error,
    },

    #[error("{stage} stage received malformed input for document '{document}': {reason}")]
    Contract {
        document: DocumentKey,
        stage: Stage,
        reason: String,
    },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

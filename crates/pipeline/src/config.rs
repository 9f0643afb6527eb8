use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub document: DocumentConfig,
    pub extraction: ExtractionConfig,
    pub llm: LlmConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub classification: ClassificationConfig,
    pub matching: MatchingConfig,
    pub evaluation: EvaluationConfig,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Analyst report to analyze (.md or .txt).
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub filter_boilerplate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub classification_model: String,
    pub evaluation_model: String,
    /// Repair prompts sent when a model answers with invalid JSON.
    pub max_json_repairs: usize,
    pub delta_analysis: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub qdrant_url: String,
    pub collection: String,
    pub embedding_model: String,
    pub top_k: usize,
    pub score_threshold: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub batch_size: usize,
    /// Label items without evidence `No Evidence` instead of asking the evaluator.
    pub skip_without_evidence: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_concurrent_calls: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    /// When false every stage executes and overwrites its cache entry.
    pub reuse: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            filter_boilerplate: true,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            classification_model: "llama3".to_string(),
            evaluation_model: "llama3".to_string(),
            max_json_repairs: 2,
            delta_analysis: true,
        }
    }
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6333".to_string(),
            collection: "company_documents".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            top_k: 5,
            score_threshold: None,
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            skip_without_evidence: true,
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 4,
            request_timeout_secs: 120,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            reuse: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

impl PipelineConfig {
    /// Reads a TOML config. Relative paths are resolved against the
    /// directory containing the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.document.path,
            &mut self.cache.dir,
            &mut self.output.dir,
        ] {
            if path.is_relative() && !path.as_os_str().is_empty() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.document.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("document.path is not set".to_string()));
        }
        if !self.document.path.is_file() {
            return Err(ConfigError::Invalid(format!(
                "document.path {:?} does not exist or is not a file",
                self.document.path
            )));
        }

        let positive = [
            ("classification.batch_size", self.classification.batch_size),
            ("matching.batch_size", self.matching.batch_size),
            ("evaluation.batch_size", self.evaluation.batch_size),
            (
                "concurrency.max_concurrent_calls",
                self.concurrency.max_concurrent_calls,
            ),
            ("knowledge_base.top_k", self.knowledge_base.top_k),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if self.concurrency.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "concurrency.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms exceeds retry.max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = PipelineConfig::from_toml(
            r#"
            [document]
            path = "reports/acme.md"

            [evaluation]
            skip_without_evidence = false
            "#,
        )
        .unwrap();
        assert_eq!(config.classification.batch_size, 10);
        assert_eq!(config.evaluation.batch_size, 10);
        assert!(!config.evaluation.skip_without_evidence);
        assert!(config.cache.reuse);
        assert_eq!(config.knowledge_base.top_k, 5);
    }

    #[test]
    fn test_unknown_field_types_rejected() {
        assert!(PipelineConfig::from_toml("[classification]\nbatch_size = \"ten\"").is_err());
    }

    #[test]
    fn test_relative_paths_resolved_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("acme.md"), "# Thesis\nBuy.").unwrap();
        let config_path = dir.path().join("infodelta.toml");
        std::fs::write(
            &config_path,
            "[document]\npath = \"acme.md\"\n[cache]\ndir = \"/tmp/absolute-cache\"\n",
        )
        .unwrap();

        let config = PipelineConfig::load(&config_path).unwrap();
        assert_eq!(config.document.path, dir.path().join("acme.md"));
        assert_eq!(config.cache.dir, PathBuf::from("/tmp/absolute-cache"));
        assert_eq!(config.output.dir, dir.path().join("output"));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("acme.md");
        std::fs::write(&doc, "Buy.").unwrap();

        let mut config = PipelineConfig::default();
        config.document.path = doc;
        config.matching.batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("matching.batch_size"));
    }

    #[test]
    fn test_validate_rejects_missing_document() {
        let mut config = PipelineConfig::default();
        config.document.path = PathBuf::from("/definitely/not/here.md");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}

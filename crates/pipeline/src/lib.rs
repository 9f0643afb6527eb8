pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod stages;

pub use cache::{FsStageStore, Lookup, MemoryStageStore, StageMetadata, StageStore};
pub use config::PipelineConfig;
pub use error::{CacheError, ConfigError, PipelineError};
pub use metrics::{MetricsSnapshot, RunMetrics, TimedOperation};
pub use orchestrator::{
    Collaborators, Pipeline, PipelineOutput, RunSummary, StageSource, StageSummary,
};
pub use retry::RetryPolicy;
pub use stages::{StageContext, StageReport, StageRun};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use analysis::{CoverageAnalyzer, CoverageStatistics};
use model::{
    Checkpoint, Classifier, DocumentKey, DocumentResult, Evaluator, Extractor, Retriever, Stage,
};

use crate::cache::{CacheEntry, Lookup, StageStore};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::metrics::{MetricsSnapshot, RunMetrics, TimedOperation};
use crate::stages::{StageContext, StageReport, StageRun, classify, evaluate, extract, matching};

pub struct Collaborators {
    pub extractor: Arc<dyn Extractor>,
    pub classifier: Arc<dyn Classifier>,
    pub retriever: Arc<dyn Retriever>,
    pub evaluator: Arc<dyn Evaluator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageSource {
    Executed,
    Cache,
    Checkpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub source: StageSource,
    pub items: usize,
    pub failures: usize,
    pub calls: usize,
    pub elapsed_ms: u64,
    /// Whether the stage output is in the cache after this run.
    pub cached: bool,
}

impl StageSummary {
    fn from_entry(entry: &CacheEntry, source: StageSource) -> Self {
        Self {
            stage: entry.metadata.stage,
            source,
            items: entry.metadata.item_count,
            failures: entry.metadata.failure_count,
            calls: 0,
            elapsed_ms: 0,
            cached: true,
        }
    }

    fn from_report(report: &StageReport, cached: bool) -> Self {
        Self {
            stage: report.stage,
            source: StageSource::Executed,
            items: report.items,
            failures: report.failures,
            calls: report.calls,
            elapsed_ms: report.elapsed_ms,
            cached,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub document: DocumentKey,
    pub checkpoint: Option<Checkpoint>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageSummary>,
    pub metrics: MetricsSnapshot,
}

impl RunSummary {
    pub fn stage(&self, stage: Stage) -> Option<&StageSummary> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Items that ended up `Failed` in any stage that produced output.
    pub fn is_degraded(&self) -> bool {
        self.stages.iter().any(|s| s.failures > 0)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub document: DocumentResult,
    pub statistics: CoverageStatistics,
    pub summary: RunSummary,
}

/// Runs one document through every stage, taking stage outputs from the
/// cache where allowed and persisting the ones it computes.
pub struct Pipeline {
    config: PipelineConfig,
    collaborators: Collaborators,
    store: Arc<dyn StageStore>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        collaborators: Collaborators,
        store: Arc<dyn StageStore>,
    ) -> Self {
        Self {
            config,
            collaborators,
            store,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(
        &self,
        source: &Path,
        checkpoint: Option<Checkpoint>,
    ) -> Result<PipelineOutput, PipelineError> {
        let key = DocumentKey::from_path(source);
        let metrics = RunMetrics::new();
        let ctx = StageContext::from_config(&self.config, metrics.clone());
        let started_at = Utc::now();
        let mut stages = Vec::new();

        info!(
            document = %key,
            source = %source.display(),
            checkpoint = checkpoint.map(|c| c.name()).unwrap_or("none"),
            "Starting pipeline run"
        );

        let (mut document, mut pending) = match checkpoint {
            Some(checkpoint) => {
                let entry = self.load_checkpoint(&key, checkpoint, &metrics).await?;
                stages.push(StageSummary::from_entry(&entry, StageSource::Checkpoint));
                (entry.document, checkpoint.stage().next())
            }
            None => {
                let document = self.extract(&key, source, &ctx, &mut stages).await?;
                (document, Stage::Extract.next())
            }
        };

        // Nothing to enrich; the analyzer reports the empty input.
        if !document.is_empty() {
            while let Some(stage) = pending.filter(|stage| stage.is_cached()) {
                document = self.advance(stage, document, &ctx, &mut stages).await?;
                pending = stage.next();
            }
        }

        let timer = TimedOperation::start();
        let statistics = CoverageAnalyzer::analyze(&document)?;
        stages.push(StageSummary {
            stage: Stage::Analyze,
            source: StageSource::Executed,
            items: statistics.total_items,
            failures: 0,
            calls: 0,
            elapsed_ms: timer.elapsed_ms(),
            cached: false,
        });

        let summary = RunSummary {
            document: key,
            checkpoint,
            started_at,
            finished_at: Utc::now(),
            stages,
            metrics: metrics.snapshot(),
        };
        info!(
            document = %summary.document,
            novelty = statistics.rates.novelty,
            coverage = statistics.rates.coverage,
            degraded = summary.is_degraded(),
            calls = summary.metrics.collaborator_calls,
            cache_hits = summary.metrics.cache_hits,
            "Pipeline run complete"
        );

        Ok(PipelineOutput {
            document,
            statistics,
            summary,
        })
    }

    /// Loads the checkpoint stage before anything else runs. A missing or
    /// unusable entry aborts the run without touching the cache.
    async fn load_checkpoint(
        &self,
        key: &DocumentKey,
        checkpoint: Checkpoint,
        metrics: &RunMetrics,
    ) -> Result<CacheEntry, PipelineError> {
        let stage = checkpoint.stage();
        let reason = match self.store.load(key, stage).await {
            Lookup::Hit(entry) => {
                metrics.record_cache_hit();
                info!(
                    document = %key,
                    checkpoint = checkpoint.name(),
                    items = entry.metadata.item_count,
                    "Resuming from checkpoint"
                );
                return Ok(*entry);
            }
            Lookup::Miss => {
                metrics.record_cache_miss();
                "no cache entry".to_string()
            }
            Lookup::Corrupt(reason) => {
                metrics.record_cache_corrupt();
                reason
            }
        };

        Err(PipelineError::MissingCheckpoint {
            document: key.clone(),
            checkpoint,
            stage,
            location: self.store.location(key, stage),
            reason,
        })
    }

    async fn cached(&self, key: &DocumentKey, stage: Stage, metrics: &RunMetrics) -> Option<CacheEntry> {
        if !self.config.cache.reuse {
            debug!(document = %key, stage = %stage, "Cache reuse disabled");
            return None;
        }
        match self.store.load(key, stage).await {
            Lookup::Hit(entry) => {
                metrics.record_cache_hit();
                info!(document = %key, stage = %stage, items = entry.metadata.item_count, "Using cached stage output");
                Some(*entry)
            }
            Lookup::Miss => {
                metrics.record_cache_miss();
                None
            }
            Lookup::Corrupt(reason) => {
                metrics.record_cache_corrupt();
                warn!(document = %key, stage = %stage, reason = %reason, "Recomputing stage");
                None
            }
        }
    }

    async fn extract(
        &self,
        key: &DocumentKey,
        source: &Path,
        ctx: &StageContext,
        stages: &mut Vec<StageSummary>,
    ) -> Result<DocumentResult, PipelineError> {
        if let Some(entry) = self.cached(key, Stage::Extract, ctx.metrics()).await {
            stages.push(StageSummary::from_entry(&entry, StageSource::Cache));
            return Ok(entry.document);
        }

        let timer = TimedOperation::start();
        let calls_before = ctx.metrics().snapshot().collaborator_calls;
        let run = extract::run(&*self.collaborators.extractor, ctx, key.clone(), source).await?;

        if run.document.is_empty() {
            // an empty entry would never load back as a hit
            stages.push(StageSummary::from_report(&run.report, false));
            return Ok(run.document);
        }
        Ok(self.commit(run, timer, calls_before, ctx, stages).await)
    }

    async fn advance(
        &self,
        stage: Stage,
        upstream: DocumentResult,
        ctx: &StageContext,
        stages: &mut Vec<StageSummary>,
    ) -> Result<DocumentResult, PipelineError> {
        if let Some(entry) = self.cached(&upstream.key, stage, ctx.metrics()).await {
            stages.push(StageSummary::from_entry(&entry, StageSource::Cache));
            return Ok(entry.document);
        }

        let timer = TimedOperation::start();
        let calls_before = ctx.metrics().snapshot().collaborator_calls;
        let c = &self.collaborators;
        let run = match stage {
            Stage::Classify => {
                classify::run(
                    &*c.classifier,
                    ctx,
                    upstream,
                    self.config.classification.batch_size,
                )
                .await?
            }
            Stage::Match => {
                matching::run(&*c.retriever, ctx, upstream, self.config.matching.batch_size)
                    .await?
            }
            Stage::Evaluate => {
                evaluate::run(
                    &*c.evaluator,
                    ctx,
                    upstream,
                    self.config.evaluation.batch_size,
                    self.config.evaluation.skip_without_evidence,
                )
                .await?
            }
            Stage::Extract | Stage::Analyze => {
                return Err(PipelineError::Contract {
                    document: upstream.key,
                    stage,
                    reason: "not an enrichment stage".to_string(),
                });
            }
        };
        Ok(self.commit(run, timer, calls_before, ctx, stages).await)
    }

    /// Persists a freshly executed stage. A failed write is logged and the
    /// run continues with the in-memory result.
    async fn commit(
        &self,
        mut run: StageRun,
        timer: TimedOperation,
        calls_before: usize,
        ctx: &StageContext,
        stages: &mut Vec<StageSummary>,
    ) -> DocumentResult {
        let metrics = ctx.metrics();
        run.report.elapsed_ms = timer.elapsed_ms();
        run.report.calls = metrics.snapshot().collaborator_calls - calls_before;

        let stage = run.report.stage;
        let cached = match self.store.save(stage, &run.document, &run.report).await {
            Ok(metadata) => {
                metrics.record_cache_write();
                debug!(
                    document = %metadata.document,
                    stage = %stage,
                    digest = %metadata.items_sha256,
                    "Stage output cached"
                );
                true
            }
            Err(e) => {
                warn!(document = %run.document.key, stage = %stage, error = %e, "Failed to cache stage output");
                false
            }
        };

        info!(
            document = %run.document.key,
            stage = %stage,
            items = run.report.items,
            failures = run.report.failures,
            calls = run.report.calls,
            elapsed_ms = run.report.elapsed_ms,
            "Stage complete"
        );
        stages.push(StageSummary::from_report(&run.report, cached));
        run.document
    }
}

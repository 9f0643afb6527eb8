//! Stage executors. Each takes the upstream document and returns the
//! enriched document plus a report that feeds the cache metadata.

pub mod classify;
pub mod evaluate;
pub mod extract;
pub mod matching;

use anyhow::{Context, Result};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use model::{DocumentResult, Stage};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::metrics::RunMetrics;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    pub collaborator: String,
    pub batch_size: Option<usize>,
    pub items: usize,
    pub failures: usize,
    /// Filled in by the orchestrator.
    pub calls: usize,
    pub elapsed_ms: u64,
    pub label_distribution: BTreeMap<String, usize>,
}

impl StageReport {
    pub fn new(stage: Stage, collaborator: impl Into<String>, batch_size: Option<usize>) -> Self {
        Self {
            stage,
            collaborator: collaborator.into(),
            batch_size,
            items: 0,
            failures: 0,
            calls: 0,
            elapsed_ms: 0,
            label_distribution: BTreeMap::new(),
        }
    }

    pub fn count(&mut self, label: impl Into<String>) {
        *self.label_distribution.entry(label.into()).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone)]
pub struct StageRun {
    pub document: DocumentResult,
    pub report: StageReport,
}

/// Shared by every executor of one run: retry policy, per-call timeout,
/// the limit on in-flight collaborator calls and the run's counters.
#[derive(Clone)]
pub struct StageContext {
    retry: RetryPolicy,
    timeout: Duration,
    limiter: Arc<Semaphore>,
    metrics: Arc<RunMetrics>,
}

impl StageContext {
    pub fn new(
        retry: RetryPolicy,
        timeout: Duration,
        max_concurrent_calls: usize,
        metrics: Arc<RunMetrics>,
    ) -> Self {
        Self {
            retry,
            timeout,
            limiter: Arc::new(Semaphore::new(max_concurrent_calls.max(1))),
            metrics,
        }
    }

    pub fn from_config(config: &PipelineConfig, metrics: Arc<RunMetrics>) -> Self {
        Self::new(
            RetryPolicy::from_config(&config.retry),
            Duration::from_secs(config.concurrency.request_timeout_secs),
            config.concurrency.max_concurrent_calls,
            metrics,
        )
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// One logical collaborator call: waits for a permit, then retries with
    /// backoff and a per-attempt timeout.
    pub async fn call<F, Fut, T>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self
            .limiter
            .acquire()
            .await
            .context("collaborator call limiter closed")?;

        let metrics = &self.metrics;
        let result = self
            .retry
            .retry(operation, self.timeout, || metrics.record_retry(), f)
            .await;
        metrics.record_call(result.is_ok());
        result
    }
}

/// Splits `items` into batches of `batch_size`, runs `f` on all of them
/// concurrently and concatenates the results in input order.
pub async fn map_batches<T, U, F, Fut>(items: Vec<T>, batch_size: usize, f: F) -> Vec<U>
where
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Vec<U>>,
{
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(batch_size).collect::<Vec<_>>());
    }

    join_all(batches.into_iter().map(&f))
        .await
        .into_iter()
        .flatten()
        .collect()
}

/// Executors only accept documents in exactly the shape of the stage before.
pub(crate) fn ensure_shape(
    document: &DocumentResult,
    upstream: Stage,
    stage: Stage,
) -> Result<(), PipelineError> {
    if document.satisfies(upstream) {
        return Ok(());
    }
    Err(PipelineError::Contract {
        document: document.key.clone(),
        stage,
        reason: format!("items are not in {} shape", upstream),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_map_batches_preserves_order() {
        let items: Vec<u64> = (0..23).collect();
        let out = map_batches(items, 5, |batch| async move {
            // later batches finish first
            let delay = 20 - batch[0].min(20);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            batch.into_iter().map(|n| n * 10).collect::<Vec<_>>()
        })
        .await;

        assert_eq!(out, (0..23).map(|n| n * 10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_call_limits_concurrency() {
        let ctx = test_support::context(2);
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let (in_flight, peak_ref) = (&in_flight, &peak);

        let calls = (0..8).map(|_| {
            ctx.call("probe", || async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak_ref.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
        });
        for result in join_all(calls).await {
            result.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(ctx.metrics().snapshot().collaborator_calls, 8);
    }

    #[test]
    fn test_report_counts_labels() {
        let mut report = StageReport::new(Stage::Match, "mock", Some(10));
        report.count("with_evidence");
        report.count("with_evidence");
        report.count("skipped");
        assert_eq!(report.label_distribution["with_evidence"], 2);
        assert_eq!(report.label_distribution["skipped"], 1);
    }
}

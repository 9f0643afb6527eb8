use tracing::info;

use model::{DocumentResult, Item, Outcome, Retriever, Stage};

use super::{StageContext, StageReport, StageRun, ensure_shape, map_batches};
use crate::error::PipelineError;

/// Attaches knowledge-base evidence to in-scope items. Boilerplate passes
/// through untouched.
pub async fn run(
    retriever: &dyn Retriever,
    ctx: &StageContext,
    upstream: DocumentResult,
    batch_size: usize,
) -> Result<StageRun, PipelineError> {
    ensure_shape(&upstream, Stage::Classify, Stage::Match)?;

    let (key, items) = upstream.into_items();
    let items = map_batches(items, batch_size, |batch| {
        match_batch(retriever, ctx, batch)
    })
    .await;

    let mut report = StageReport::new(Stage::Match, retriever.id(), Some(batch_size));
    report.items = items.len();
    for item in &items {
        let label = match &item.evidence {
            None => "skipped",
            Some(Outcome::Failed(_)) => {
                report.failures += 1;
                "failed"
            }
            Some(Outcome::Ok(evidence)) if evidence.is_empty() => "no_evidence",
            Some(Outcome::Ok(_)) => "with_evidence",
        };
        report.count(label);
    }

    info!(
        document = %key,
        items = report.items,
        queried = report.items - report.label_distribution.get("skipped").copied().unwrap_or(0),
        failures = report.failures,
        "Matched items against knowledge base"
    );
    Ok(StageRun {
        document: DocumentResult::from_items(key, items),
        report,
    })
}

async fn match_batch(retriever: &dyn Retriever, ctx: &StageContext, mut batch: Vec<Item>) -> Vec<Item> {
    for item in batch.iter_mut().filter(|item| item.is_in_scope()) {
        let text = item.text.as_str();
        let result = ctx
            .call("retrieve", || async move { retriever.query(text).await })
            .await
            .map(|evidence| {
                evidence
                    .into_iter()
                    .filter(|snippet| !snippet.trim().is_empty())
                    .collect::<Vec<_>>()
            });
        item.evidence = Some(Outcome::from_result(result));
    }
    batch
}

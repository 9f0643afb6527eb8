use anyhow::{Result, bail};
use tracing::{info, warn};

use model::{Classification, Classifier, DocumentResult, Item, Outcome, Stage};

use super::{StageContext, StageReport, StageRun, ensure_shape, map_batches};
use crate::error::PipelineError;

pub async fn run(
    classifier: &dyn Classifier,
    ctx: &StageContext,
    upstream: DocumentResult,
    batch_size: usize,
) -> Result<StageRun, PipelineError> {
    ensure_shape(&upstream, Stage::Extract, Stage::Classify)?;

    let (key, items) = upstream.into_items();
    let items = map_batches(items, batch_size, |batch| {
        classify_batch(classifier, ctx, batch)
    })
    .await;

    let mut report = StageReport::new(Stage::Classify, classifier.model_id(), Some(batch_size));
    report.items = items.len();
    for item in &items {
        match &item.classification {
            Some(Outcome::Ok(classification)) => {
                for (facet, value, _) in classification.facets() {
                    report.count(format!("{}:{}", facet, value));
                }
            }
            Some(Outcome::Failed(_)) | None => {
                report.failures += 1;
                report.count("failed");
            }
        }
    }

    info!(
        document = %key,
        items = report.items,
        failures = report.failures,
        "Classified items"
    );
    Ok(StageRun {
        document: DocumentResult::from_items(key, items),
        report,
    })
}

/// One call for the whole batch; if that fails after retries, each item is
/// classified on its own so a single bad item does not fail its neighbours.
async fn classify_batch(
    classifier: &dyn Classifier,
    ctx: &StageContext,
    mut batch: Vec<Item>,
) -> Vec<Item> {
    let texts: Vec<String> = batch.iter().map(|item| item.text.clone()).collect();
    let texts = &texts;

    let result = ctx
        .call("classify_batch", || async move {
            checked(classifier.classify(texts).await?, texts.len())
        })
        .await;

    match result {
        Ok(classifications) => {
            for (item, classification) in batch.iter_mut().zip(classifications) {
                item.classification = Some(Outcome::Ok(classification));
            }
        }
        Err(e) if batch.len() == 1 => {
            batch[0].classification = Some(Outcome::Failed(format!("{e:#}")));
        }
        Err(e) => {
            warn!(
                items = batch.len(),
                error = %format!("{e:#}"),
                "Batch classification failed, classifying items individually"
            );
            for item in batch.iter_mut() {
                let text = std::slice::from_ref(&item.text);
                let result = ctx
                    .call("classify_item", || async move {
                        let mut single = checked(classifier.classify(text).await?, 1)?;
                        // checked() guarantees exactly one
                        single.pop().ok_or_else(|| anyhow::anyhow!("classifier returned nothing"))
                    })
                    .await;
                item.classification = Some(Outcome::from_result(result));
            }
        }
    }
    batch
}

fn checked(classifications: Vec<Classification>, expected: usize) -> Result<Vec<Classification>> {
    if classifications.len() != expected {
        bail!(
            "classifier returned {} results for {} texts",
            classifications.len(),
            expected
        );
    }
    Ok(classifications)
}

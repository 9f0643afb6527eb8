use tracing::info;

use model::{DocumentResult, Evaluation, Evaluator, Item, Outcome, Stage};

use super::{StageContext, StageReport, StageRun, ensure_shape, map_batches};
use crate::error::PipelineError;

pub async fn run(
    evaluator: &dyn Evaluator,
    ctx: &StageContext,
    upstream: DocumentResult,
    batch_size: usize,
    skip_without_evidence: bool,
) -> Result<StageRun, PipelineError> {
    ensure_shape(&upstream, Stage::Match, Stage::Evaluate)?;

    let (key, items) = upstream.into_items();
    let items = map_batches(items, batch_size, |batch| {
        evaluate_batch(evaluator, ctx, batch, skip_without_evidence)
    })
    .await;

    let mut report = StageReport::new(Stage::Evaluate, evaluator.model_id(), Some(batch_size));
    report.items = items.len();
    for item in &items {
        match &item.evaluation {
            Some(Outcome::Ok(evaluation)) => report.count(evaluation.label.as_str()),
            Some(Outcome::Failed(_)) => {
                report.failures += 1;
                report.count("failed");
            }
            None => {}
        }
    }

    info!(
        document = %key,
        items = report.items,
        failures = report.failures,
        "Evaluated items"
    );
    Ok(StageRun {
        document: DocumentResult::from_items(key, items),
        report,
    })
}

async fn evaluate_batch(
    evaluator: &dyn Evaluator,
    ctx: &StageContext,
    mut batch: Vec<Item>,
    skip_without_evidence: bool,
) -> Vec<Item> {
    for item in batch.iter_mut().filter(|item| item.is_in_scope()) {
        let outcome = match &item.evidence {
            Some(Outcome::Failed(reason)) => Outcome::Failed(format!("retrieval failed: {reason}")),
            Some(Outcome::Ok(evidence)) if evidence.is_empty() && skip_without_evidence => {
                Outcome::Ok(Evaluation::no_evidence())
            }
            Some(Outcome::Ok(evidence)) => {
                let (text, section) = (item.text.as_str(), item.section.as_str());
                let evidence = evidence.as_slice();
                Outcome::from_result(
                    ctx.call("evaluate", || async move {
                        evaluator.evaluate(text, section, evidence).await
                    })
                    .await,
                )
            }
            // ensure_shape rules this out for in-scope items
            None => Outcome::Failed("no retrieval result recorded".to_string()),
        };
        item.evaluation = Some(outcome);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::context;
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use model::{
        ClaimType, Classification, ContentType, DocumentKey, EvaluationLabel, Labeled, Relevance,
        SubjectScope,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MarkerEvaluator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Evaluator for MarkerEvaluator {
        fn model_id(&self) -> String {
            "marker".to_string()
        }

        async fn evaluate(&self, text: &str, _section: &str, evidence: &[String]) -> Result<Evaluation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("garbled") {
                bail!("invalid JSON from model");
            }
            let label = if evidence.is_empty() {
                EvaluationLabel::NotSupported
            } else {
                EvaluationLabel::Supported
            };
            Ok(Evaluation::new(label, "checked"))
        }
    }

    fn matched(rows: &[(&str, bool, Option<Result<Vec<String>, String>>)]) -> DocumentResult {
        let items = rows
            .iter()
            .enumerate()
            .map(|(index, (text, in_scope, evidence))| {
                let mut item = Item::new("Body", index, *text);
                let relevance = if *in_scope {
                    Relevance::CompanyRelevant
                } else {
                    Relevance::TemplateBoilerplate
                };
                item.classification = Some(Outcome::Ok(Classification {
                    claim_type: Labeled::new(ClaimType::Assertion, 0.9),
                    subject_scope: Labeled::new(SubjectScope::Company, 0.9),
                    content_type: Labeled::new(ContentType::Qualitative, 0.9),
                    relevance: Labeled::new(relevance, 0.9),
                }));
                item.evidence = evidence.clone().map(|e| match e {
                    Ok(snippets) => Outcome::Ok(snippets),
                    Err(reason) => Outcome::Failed(reason),
                });
                item
            })
            .collect();
        DocumentResult::from_items(DocumentKey::new("acme"), items)
    }

    #[tokio::test]
    async fn test_evaluate_routes_by_evidence() {
        let evaluator = MarkerEvaluator {
            calls: AtomicUsize::new(0),
        };
        let upstream = matched(&[
            ("Backed claim.", true, Some(Ok(vec!["10-K says so.".into()]))),
            ("Unbacked claim.", true, Some(Ok(Vec::new()))),
            ("Lost claim.", true, Some(Err("timed out".into()))),
            ("Boilerplate.", false, None),
        ]);
        let run = run(&evaluator, &context(2), upstream, 10, true).await.unwrap();

        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
        assert!(run.document.satisfies(Stage::Evaluate));

        let items: Vec<_> = run.document.items().collect();
        let label = |i: usize| items[i].evaluation.as_ref().unwrap().ok().map(|e| e.label);
        assert_eq!(label(0), Some(EvaluationLabel::Supported));
        assert_eq!(label(1), Some(EvaluationLabel::NoEvidence));
        assert!(
            items[2].evaluation.as_ref().unwrap().failure().unwrap().contains("retrieval failed")
        );
        assert!(items[3].evaluation.is_none());
        assert_eq!(run.report.failures, 1);
    }

    #[tokio::test]
    async fn test_evaluator_called_without_evidence_when_not_skipping() {
        let evaluator = MarkerEvaluator {
            calls: AtomicUsize::new(0),
        };
        let upstream = matched(&[("Unbacked claim.", true, Some(Ok(Vec::new())))]);
        let run = run(&evaluator, &context(1), upstream, 10, false).await.unwrap();

        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(run.report.label_distribution["Not Supported"], 1);
    }

    #[tokio::test]
    async fn test_evaluator_failure_is_isolated() {
        let evaluator = MarkerEvaluator {
            calls: AtomicUsize::new(0),
        };
        let upstream = matched(&[
            ("A garbled claim.", true, Some(Ok(vec!["x".into()]))),
            ("Fine claim.", true, Some(Ok(vec!["y".into()]))),
        ]);
        let run = run(&evaluator, &context(1), upstream, 1, true).await.unwrap();

        let items: Vec<_> = run.document.items().collect();
        assert!(items[0].evaluation.as_ref().unwrap().is_failed());
        assert!(!items[1].evaluation.as_ref().unwrap().is_failed());
    }
}

use std::collections::BTreeMap;
use tracing::info;

use model::{DocumentResult, EvaluationLabel, Facet, Item, Outcome};

use crate::error::AnalysisError;
use crate::partition::{Bucket, Partition, percentage};
use crate::statistics::{
    ConfidenceStats, CoverageStatistics, EvidenceStatistics, FacetCoverage, FailureCounts,
    LabelShare, SectionStatistics, ValueShare,
};

/// Facets whose values are broken down by coverage. Relevance is constant
/// over in-scope items.
const COVERAGE_FACETS: [Facet; 3] = [Facet::ClaimType, Facet::SubjectScope, Facet::ContentType];

pub struct CoverageAnalyzer;

impl CoverageAnalyzer {
    pub fn analyze(document: &DocumentResult) -> Result<CoverageStatistics, AnalysisError> {
        if document.is_empty() {
            return Err(AnalysisError::EmptyInput {
                document: document.key.clone(),
            });
        }

        let mut evaluated: Vec<(&Item, Bucket)> = Vec::new();
        let mut out_of_scope = 0;
        for item in document.items() {
            item.check_enrichment()
                .map_err(|source| AnalysisError::OutOfOrder {
                    document: document.key.clone(),
                    source,
                })?;
            if !item.is_in_scope() {
                out_of_scope += 1;
                continue;
            }
            let bucket = Bucket::of_item(item).ok_or_else(|| AnalysisError::Unlabeled {
                document: document.key.clone(),
                section: item.section.clone(),
                index: item.index,
            })?;
            evaluated.push((item, bucket));
        }

        let partition: Partition = evaluated.iter().map(|(_, bucket)| *bucket).collect();
        let in_scope = evaluated.len();

        let statistics = CoverageStatistics {
            document: document.key.clone(),
            total_items: document.item_count(),
            in_scope,
            out_of_scope,
            assessed: partition.assessed(),
            partition,
            rates: partition.rates(),
            labels: label_shares(&evaluated),
            facets: facet_shares(&evaluated),
            coverage_by_facet: coverage_by_facet(&evaluated),
            confidence: confidence_stats(&evaluated),
            evidence: evidence_stats(&evaluated),
            sections: section_stats(document, &evaluated),
            failures: failure_counts(&evaluated),
        };

        info!(
            document = %statistics.document,
            in_scope = statistics.in_scope,
            assessed = statistics.assessed,
            coverage = statistics.rates.coverage,
            novelty = statistics.rates.novelty,
            "Coverage analysis complete"
        );
        Ok(statistics)
    }
}

fn label_of(item: &Item) -> Option<EvaluationLabel> {
    item.evaluation.as_ref()?.ok().map(|e| e.label)
}

fn label_shares(evaluated: &[(&Item, Bucket)]) -> Vec<LabelShare> {
    EvaluationLabel::ALL
        .into_iter()
        .map(|label| {
            let count = evaluated
                .iter()
                .filter(|(item, _)| label_of(item) == Some(label))
                .count();
            LabelShare {
                label,
                count,
                percentage: percentage(count, evaluated.len()),
            }
        })
        .collect()
}

/// `(facet, value, confidence)` for each successfully classified item.
fn facet_values<'a>(
    evaluated: &'a [(&'a Item, Bucket)],
) -> impl Iterator<Item = (Facet, &'static str, f32, Bucket)> + 'a {
    evaluated.iter().flat_map(|(item, bucket)| {
        let bucket = *bucket;
        item.classification
            .as_ref()
            .and_then(|c| c.ok())
            .map(|c| c.facets())
            .into_iter()
            .flatten()
            .map(move |(facet, value, confidence)| (facet, value, confidence, bucket))
    })
}

fn facet_shares(evaluated: &[(&Item, Bucket)]) -> BTreeMap<Facet, Vec<ValueShare>> {
    let classified = evaluated
        .iter()
        .filter(|(item, _)| matches!(item.classification, Some(Outcome::Ok(_))))
        .count();

    Facet::ALL
        .into_iter()
        .map(|facet| {
            let shares = facet
                .values()
                .into_iter()
                .map(|value| {
                    let count = facet_values(evaluated)
                        .filter(|(f, v, _, _)| *f == facet && *v == value)
                        .count();
                    ValueShare {
                        value: value.to_string(),
                        count,
                        percentage: percentage(count, classified),
                    }
                })
                .collect();
            (facet, shares)
        })
        .collect()
}

fn coverage_by_facet(evaluated: &[(&Item, Bucket)]) -> BTreeMap<Facet, Vec<FacetCoverage>> {
    COVERAGE_FACETS
        .into_iter()
        .map(|facet| {
            let rows = facet
                .values()
                .into_iter()
                .map(|value| {
                    let partition: Partition = facet_values(evaluated)
                        .filter(|(f, v, _, _)| *f == facet && *v == value)
                        .map(|(_, _, _, bucket)| bucket)
                        .collect();
                    FacetCoverage {
                        value: value.to_string(),
                        partition,
                        rates: partition.rates(),
                    }
                })
                .collect();
            (facet, rows)
        })
        .collect()
}

fn confidence_stats(evaluated: &[(&Item, Bucket)]) -> BTreeMap<Facet, ConfidenceStats> {
    let mut by_facet: BTreeMap<Facet, Vec<f64>> = BTreeMap::new();
    for (facet, _, confidence, _) in facet_values(evaluated) {
        by_facet.entry(facet).or_default().push(f64::from(confidence));
    }

    by_facet
        .into_iter()
        .map(|(facet, values)| {
            let mean = statistical::mean(&values);
            let stats = ConfidenceStats {
                count: values.len(),
                mean,
                std: statistical::population_standard_deviation(&values, Some(mean)),
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            };
            (facet, stats)
        })
        .collect()
}

fn evidence_stats(evaluated: &[(&Item, Bucket)]) -> EvidenceStatistics {
    let counts: Vec<usize> = evaluated
        .iter()
        .filter_map(|(item, _)| item.evidence.as_ref()?.ok().map(Vec::len))
        .collect();

    let mut distribution = BTreeMap::new();
    for count in &counts {
        *distribution.entry(*count).or_insert(0) += 1;
    }

    EvidenceStatistics {
        mean_per_item: if counts.is_empty() {
            0.0
        } else {
            counts.iter().sum::<usize>() as f64 / counts.len() as f64
        },
        items_without_evidence: counts.iter().filter(|c| **c == 0).count(),
        distribution,
    }
}

fn section_stats(
    document: &DocumentResult,
    evaluated: &[(&Item, Bucket)],
) -> Vec<SectionStatistics> {
    document
        .sections
        .iter()
        .map(|section| {
            let rows: Vec<(&Item, Bucket)> = evaluated
                .iter()
                .filter(|(item, _)| item.section == section.name)
                .copied()
                .collect();

            let mut labels = BTreeMap::new();
            for label in rows.iter().filter_map(|(item, _)| label_of(item)) {
                *labels.entry(label).or_insert(0) += 1;
            }

            let mut facets: BTreeMap<Facet, BTreeMap<String, usize>> = BTreeMap::new();
            for (facet, value, _, _) in facet_values(&rows) {
                *facets
                    .entry(facet)
                    .or_default()
                    .entry(value.to_string())
                    .or_insert(0) += 1;
            }

            let partition: Partition = rows.iter().map(|(_, bucket)| *bucket).collect();
            SectionStatistics {
                section: section.name.clone(),
                items: section.items.len(),
                in_scope: rows.len(),
                labels,
                facets,
                coverage_by_facet: coverage_by_facet(&rows),
                partition,
                rates: partition.rates(),
            }
        })
        .collect()
}

fn failure_counts(evaluated: &[(&Item, Bucket)]) -> FailureCounts {
    let failed = |outcome_failed: fn(&Item) -> bool| {
        evaluated.iter().filter(|(item, _)| outcome_failed(item)).count()
    };
    FailureCounts {
        classification: failed(|item| item.classification.as_ref().is_some_and(|o| o.is_failed())),
        retrieval: failed(|item| item.evidence.as_ref().is_some_and(|o| o.is_failed())),
        evaluation: failed(|item| item.evaluation.as_ref().is_some_and(|o| o.is_failed())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        ClaimType, Classification, ContentType, DocumentKey, Evaluation, Labeled, Relevance,
        Section, SubjectScope,
    };

    fn classification(relevance: Relevance, claim: ClaimType) -> Classification {
        Classification {
            claim_type: Labeled::new(claim, 0.8),
            subject_scope: Labeled::new(SubjectScope::Company, 0.6),
            content_type: Labeled::new(ContentType::Qualitative, 1.0),
            relevance: Labeled::new(relevance, 0.9),
        }
    }

    fn evaluated_item(section: &str, index: usize, label: EvaluationLabel) -> Item {
        let mut item = Item::new(section, index, format!("claim {index}"));
        item.classification = Some(Outcome::Ok(classification(
            Relevance::CompanyRelevant,
            ClaimType::Assertion,
        )));
        item.evidence = Some(Outcome::Ok(vec!["evidence".to_string()]));
        item.evaluation = Some(Outcome::Ok(Evaluation::new(label, "because")));
        item
    }

    fn boilerplate_item(section: &str, index: usize) -> Item {
        let mut item = Item::new(section, index, "This report is not advice.");
        item.classification = Some(Outcome::Ok(classification(
            Relevance::TemplateBoilerplate,
            ClaimType::Assertion,
        )));
        item
    }

    fn document(sections: Vec<(&str, Vec<Item>)>) -> DocumentResult {
        DocumentResult {
            key: DocumentKey::new("acme"),
            sections: sections
                .into_iter()
                .map(|(name, items)| Section {
                    name: name.to_string(),
                    items,
                })
                .collect(),
        }
    }

    /// 10 items: 2 boilerplate, then 4 Supported, 1 Partially Supported,
    /// 2 Not Supported, 1 Contradicted.
    fn scenario() -> DocumentResult {
        use EvaluationLabel::*;
        let thesis = [Supported, Supported, Supported, PartiallySupported]
            .into_iter()
            .enumerate()
            .map(|(i, l)| evaluated_item("Thesis", i, l))
            .collect();
        let mut risks: Vec<Item> = [Supported, NotSupported, NotSupported, Contradicted]
            .into_iter()
            .enumerate()
            .map(|(i, l)| evaluated_item("Risks", i, l))
            .collect();
        risks.push(boilerplate_item("Risks", 4));
        risks.push(boilerplate_item("Risks", 5));
        document(vec![("Thesis", thesis), ("Risks", risks)])
    }

    #[test]
    fn test_scenario_rates() {
        let stats = CoverageAnalyzer::analyze(&scenario()).unwrap();
        assert_eq!(stats.total_items, 10);
        assert_eq!(stats.in_scope, 8);
        assert_eq!(stats.out_of_scope, 2);
        assert_eq!(stats.assessed, 8);
        assert_eq!(stats.rates.coverage, 62.5);
        assert_eq!(stats.rates.not_covered, 25.0);
        assert_eq!(stats.rates.contradicted, 12.5);
        assert_eq!(stats.rates.novelty, 25.0);
    }

    #[test]
    fn test_partition_invariant() {
        let stats = CoverageAnalyzer::analyze(&scenario()).unwrap();
        let p = stats.partition;
        assert_eq!(p.covered + p.not_covered + p.contradicted + p.unknown, stats.in_scope);
        let label_total: usize = stats.labels.iter().map(|l| l.count).sum();
        assert_eq!(label_total + stats.failures.evaluation, stats.in_scope);
        let section_total: usize = stats.sections.iter().map(|s| s.in_scope).sum();
        assert_eq!(section_total, stats.in_scope);
    }

    #[test]
    fn test_unknown_excluded_from_assessed() {
        let mut doc = scenario();
        doc.sections[0].items[0].evaluation = Some(Outcome::Failed("timeout".into()));
        doc.sections[0].items[1].evaluation =
            Some(Outcome::Ok(Evaluation::new(EvaluationLabel::Unknown, "")));

        let stats = CoverageAnalyzer::analyze(&doc).unwrap();
        assert_eq!(stats.partition.unknown, 2);
        assert_eq!(stats.assessed, 6);
        assert_eq!(stats.failures.evaluation, 1);
        // 3 covered, 2 not covered, 1 contradicted
        assert_eq!(stats.rates.coverage, 50.0);
        assert_eq!(stats.rates.unknown, 25.0);
    }

    #[test]
    fn test_section_breakdown() {
        let stats = CoverageAnalyzer::analyze(&scenario()).unwrap();
        let risks = &stats.sections[1];
        assert_eq!(risks.section, "Risks");
        assert_eq!(risks.items, 6);
        assert_eq!(risks.in_scope, 4);
        assert_eq!(risks.labels[&EvaluationLabel::NotSupported], 2);
        assert_eq!(risks.facets[&Facet::ClaimType]["assertion"], 4);
        assert_eq!(stats.sections[0].rates.coverage, 100.0);

        let assertions = &risks.coverage_by_facet[&Facet::ClaimType][0];
        assert_eq!(assertions.value, "assertion");
        assert_eq!(assertions.partition.covered, 1);
        assert_eq!(assertions.partition.not_covered, 2);
        assert_eq!(assertions.partition.contradicted, 1);
        assert_eq!(assertions.rates.novelty, 50.0);
        let company = &risks.coverage_by_facet[&Facet::SubjectScope][0];
        assert_eq!(company.value, "company");
        assert_eq!(company.partition.total(), 4);
        assert!(!risks.coverage_by_facet.contains_key(&Facet::Relevance));

        let section_rows: usize = stats
            .sections
            .iter()
            .flat_map(|s| &s.coverage_by_facet[&Facet::ClaimType])
            .map(|row| row.partition.total())
            .sum();
        assert_eq!(section_rows, stats.in_scope);
    }

    #[test]
    fn test_facet_breakdowns() {
        let mut doc = scenario();
        doc.sections[0].items[3].classification = Some(Outcome::Ok(classification(
            Relevance::CompanyRelevant,
            ClaimType::Hypothesis,
        )));

        let stats = CoverageAnalyzer::analyze(&doc).unwrap();
        let claims = &stats.facets[&Facet::ClaimType];
        assert_eq!(claims[0].value, "assertion");
        assert_eq!(claims[0].count, 7);
        assert_eq!(claims[1].count, 1);
        assert_eq!(claims[1].percentage, 12.5);

        let hypothesis = &stats.coverage_by_facet[&Facet::ClaimType][1];
        assert_eq!(hypothesis.partition.covered, 1);
        assert_eq!(hypothesis.rates.coverage, 100.0);
        assert!(!stats.coverage_by_facet.contains_key(&Facet::Relevance));

        let confidence = &stats.confidence[&Facet::ContentType];
        assert_eq!(confidence.count, 8);
        assert_eq!(confidence.mean, 1.0);
        assert_eq!(confidence.std, 0.0);
    }

    #[test]
    fn test_evidence_distribution() {
        let mut doc = scenario();
        doc.sections[0].items[0].evidence = Some(Outcome::Ok(vec![]));
        doc.sections[0].items[0].evaluation = Some(Outcome::Ok(Evaluation::no_evidence()));

        let stats = CoverageAnalyzer::analyze(&doc).unwrap();
        assert_eq!(stats.evidence.distribution[&0], 1);
        assert_eq!(stats.evidence.distribution[&1], 7);
        assert_eq!(stats.evidence.items_without_evidence, 1);
    }

    #[test]
    fn test_empty_input() {
        let err = CoverageAnalyzer::analyze(&document(vec![])).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput { .. }));
    }

    #[test]
    fn test_unlabeled_in_scope_item() {
        let mut doc = scenario();
        doc.sections[1].items[2].evaluation = None;
        let err = CoverageAnalyzer::analyze(&doc).unwrap_err();
        match err {
            AnalysisError::Unlabeled { section, index, .. } => {
                assert_eq!(section, "Risks");
                assert_eq!(index, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_order_item() {
        let mut doc = scenario();
        doc.sections[0].items[1].evidence = None;
        let err = CoverageAnalyzer::analyze(&doc).unwrap_err();
        assert!(matches!(err, AnalysisError::OutOfOrder { .. }));
    }

    #[test]
    fn test_failed_classification_counts_in_scope() {
        let mut doc = scenario();
        doc.sections[1].items[4].classification = Some(Outcome::Failed("bad json".into()));
        doc.sections[1].items[4].evidence = Some(Outcome::Ok(vec![]));
        doc.sections[1].items[4].evaluation = Some(Outcome::Ok(Evaluation::no_evidence()));

        let stats = CoverageAnalyzer::analyze(&doc).unwrap();
        assert_eq!(stats.in_scope, 9);
        assert_eq!(stats.failures.classification, 1);
        assert_eq!(stats.partition.not_covered, 3);
    }
}

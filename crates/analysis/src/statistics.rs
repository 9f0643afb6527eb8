use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use model::{DocumentKey, EvaluationLabel, Facet};

use crate::partition::{CoverageRates, Partition};

/// Delta metrics for one document. Derived on every run, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageStatistics {
    pub document: DocumentKey,
    pub total_items: usize,
    pub in_scope: usize,
    pub out_of_scope: usize,
    pub assessed: usize,
    pub partition: Partition,
    pub rates: CoverageRates,
    /// Per label over in-scope items; failed evaluations are counted in `failures`.
    pub labels: Vec<LabelShare>,
    /// Per facet value over in-scope items with a classification.
    pub facets: BTreeMap<Facet, Vec<ValueShare>>,
    pub coverage_by_facet: BTreeMap<Facet, Vec<FacetCoverage>>,
    pub confidence: BTreeMap<Facet, ConfidenceStats>,
    pub evidence: EvidenceStatistics,
    /// Document order.
    pub sections: Vec<SectionStatistics>,
    pub failures: FailureCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelShare {
    pub label: EvaluationLabel,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueShare {
    pub value: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetCoverage {
    pub value: String,
    pub partition: Partition,
    pub rates: CoverageRates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceStatistics {
    /// Evidence snippets per item -> number of in-scope items.
    pub distribution: BTreeMap<usize, usize>,
    pub mean_per_item: f64,
    pub items_without_evidence: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionStatistics {
    pub section: String,
    pub items: usize,
    pub in_scope: usize,
    pub labels: BTreeMap<EvaluationLabel, usize>,
    pub facets: BTreeMap<Facet, BTreeMap<String, usize>>,
    /// Claim type, subject scope and content type values within this section.
    pub coverage_by_facet: BTreeMap<Facet, Vec<FacetCoverage>>,
    pub partition: Partition,
    pub rates: CoverageRates,
}

/// Per-item collaborator failures among in-scope items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCounts {
    pub classification: usize,
    pub retrieval: usize,
    pub evaluation: usize,
}

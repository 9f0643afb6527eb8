use serde::{Deserialize, Serialize};

use model::{EvaluationLabel, Item, Outcome};

/// Coverage bucket of one evaluated in-scope item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Covered,
    NotCovered,
    Contradicted,
    Unknown,
}

impl Bucket {
    pub fn of_label(label: EvaluationLabel) -> Self {
        match label {
            EvaluationLabel::Supported | EvaluationLabel::PartiallySupported => Bucket::Covered,
            EvaluationLabel::NotSupported | EvaluationLabel::NoEvidence => Bucket::NotCovered,
            EvaluationLabel::Contradicted => Bucket::Contradicted,
            EvaluationLabel::Unknown => Bucket::Unknown,
        }
    }

    /// `None` when the item carries no evaluation at all.
    pub fn of_item(item: &Item) -> Option<Self> {
        match item.evaluation.as_ref()? {
            Outcome::Ok(evaluation) => Some(Self::of_label(evaluation.label)),
            Outcome::Failed(_) => Some(Bucket::Unknown),
        }
    }
}

/// Counts per bucket. Every rate in the statistics is derived from one of these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub covered: usize,
    pub not_covered: usize,
    pub contradicted: usize,
    pub unknown: usize,
}

impl Partition {
    pub fn add(&mut self, bucket: Bucket) {
        match bucket {
            Bucket::Covered => self.covered += 1,
            Bucket::NotCovered => self.not_covered += 1,
            Bucket::Contradicted => self.contradicted += 1,
            Bucket::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.assessed() + self.unknown
    }

    /// In-scope items with a usable verdict.
    pub fn assessed(&self) -> usize {
        self.covered + self.not_covered + self.contradicted
    }

    pub fn rates(&self) -> CoverageRates {
        let assessed = self.assessed();
        CoverageRates {
            coverage: percentage(self.covered, assessed),
            not_covered: percentage(self.not_covered, assessed),
            contradicted: percentage(self.contradicted, assessed),
            novelty: percentage(self.not_covered, assessed),
            unknown: percentage(self.unknown, self.total()),
        }
    }
}

impl FromIterator<Bucket> for Partition {
    fn from_iter<I: IntoIterator<Item = Bucket>>(iter: I) -> Self {
        let mut partition = Partition::default();
        for bucket in iter {
            partition.add(bucket);
        }
        partition
    }
}

/// Percentages in [0, 100]. Bucket rates and novelty use the assessed
/// denominator; `unknown` is relative to all in-scope items.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageRates {
    pub coverage: f64,
    pub not_covered: f64,
    pub contradicted: f64,
    pub novelty: f64,
    pub unknown: f64,
}

pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

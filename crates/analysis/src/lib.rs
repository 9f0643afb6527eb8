pub mod analyzer;
pub mod error;
pub mod partition;
pub mod report;
pub mod statistics;

pub use analyzer::CoverageAnalyzer;
pub use error::AnalysisError;
pub use partition::{Bucket, CoverageRates, Partition};
pub use report::{ReportEmitter, TextReport};
pub use statistics::{
    ConfidenceStats, CoverageStatistics, EvidenceStatistics, FacetCoverage, FailureCounts,
    LabelShare, SectionStatistics, ValueShare,
};

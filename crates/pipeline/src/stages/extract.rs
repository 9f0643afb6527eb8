use std::path::Path;
use tracing::{info, warn};

use model::{DocumentKey, DocumentResult, Extractor, Stage};

use super::{StageContext, StageRun, StageReport};
use crate::error::PipelineError;

/// Reads the source document into sections of items. Not retried: the
/// extractor reads local files, so a failure is an input error.
pub async fn run(
    extractor: &dyn Extractor,
    ctx: &StageContext,
    key: DocumentKey,
    source: &Path,
) -> Result<StageRun, PipelineError> {
    let sections = extractor.extract(source).await;
    ctx.metrics().record_call(sections.is_ok());
    let sections = sections.map_err(|source| PipelineError::Extraction {
        document: key.clone(),
        source,
    })?;

    let document = DocumentResult::from_sections(key, sections);
    let mut report = StageReport::new(Stage::Extract, extractor.id(), None);
    report.items = document.item_count();
    for section in &document.sections {
        report
            .label_distribution
            .insert(section.name.clone(), section.items.len());
    }

    if document.is_empty() {
        warn!(document = %document.key, source = %source.display(), "Extraction produced no items");
    } else {
        info!(
            document = %document.key,
            sections = document.sections.len(),
            items = report.items,
            "Extracted document"
        );
    }

    Ok(StageRun { document, report })
}

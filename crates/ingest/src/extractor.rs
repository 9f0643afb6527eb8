use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use model::{ExtractedSection, Extractor};

use crate::boilerplate::TemplateFilter;
use crate::reader::FileReader;
use crate::sections::parse_markdown_sections;

/// Extractor for text and Markdown analyst reports.
pub struct TextExtractor {
    filter_boilerplate: bool,
}

impl TextExtractor {
    pub fn new(filter_boilerplate: bool) -> Self {
        Self { filter_boilerplate }
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Extractor for TextExtractor {
    fn id(&self) -> String {
        if self.filter_boilerplate {
            "text-markdown+template-filter".to_string()
        } else {
            "text-markdown".to_string()
        }
    }

    async fn extract(&self, path: &Path) -> Result<Vec<ExtractedSection>> {
        let content = FileReader::read_file(path).await?;
        let mut sections = parse_markdown_sections(&content);
        if self.filter_boilerplate {
            sections = TemplateFilter::filter(sections);
        }
        info!(
            path = %path.display(),
            sections = sections.len(),
            sentences = sections.iter().map(|s| s.sentences.len()).sum::<usize>(),
            "Extracted document"
        );
        Ok(sections)
    }
}

use model::ExtractedSection;
use tracing::{debug, warn};

use crate::text::{clean_text, split_sentences};

const LEADING_SECTION: &str = "Introduction";
const WHOLE_DOCUMENT: &str = "Full Document";

/// Splits Markdown (or plain text) into sections at `#` headings and each
/// section body into sentences. Text before the first heading belongs to
/// "Introduction". When no heading has a body (OCR output often marks every
/// line as a heading) the heading text itself becomes one "Full Document"
/// section.
pub fn parse_markdown_sections(markdown: &str) -> Vec<ExtractedSection> {
    let mut sections = Vec::new();
    let mut current = LEADING_SECTION.to_string();
    let mut body: Vec<&str> = Vec::new();

    for line in markdown.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            flush(&mut sections, &current, &body);
            let heading = clean_text(line.trim_start_matches('#'));
            current = if heading.is_empty() {
                "Untitled Section".to_string()
            } else {
                heading
            };
            body.clear();
        } else if !line.is_empty() {
            body.push(line);
        }
    }
    flush(&mut sections, &current, &body);

    if sections.is_empty() {
        let stripped: Vec<&str> = markdown
            .lines()
            .map(|l| l.trim().trim_start_matches('#'))
            .collect();
        let sentences = split_sentences(&stripped.join(" "));
        if !sentences.is_empty() {
            warn!("No headed content found, treating document as a single section");
            sections.push(ExtractedSection::new(WHOLE_DOCUMENT, sentences));
        }
    }
    sections
}

fn flush(sections: &mut Vec<ExtractedSection>, name: &str, body: &[&str]) {
    if body.is_empty() {
        return;
    }
    let sentences = split_sentences(&body.join(" "));
    if !sentences.is_empty() {
        debug!(section = name, sentences = sentences.len(), "Parsed section");
        sections.push(ExtractedSection::new(name, sentences));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_sections() {
        let md = "Acme is a widget maker.\n\n# Thesis\nWe rate Acme a buy.\nMargins expand.\n\n## Risks\nSupply is tight.";
        let sections = parse_markdown_sections(md);
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Introduction", "Thesis", "Risks"]);
        assert_eq!(sections[1].sentences, vec!["We rate Acme a buy.", "Margins expand."]);
    }

    #[test]
    fn test_headings_without_bodies_are_skipped() {
        let sections = parse_markdown_sections("# Cover\n\n# Summary\nDemand is strong.");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Summary");
    }

    #[test]
    fn test_plain_text_is_introduction() {
        let sections = parse_markdown_sections("Just one line of text.");
        assert_eq!(sections[0].name, "Introduction");
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_markdown_sections("\n\n").is_empty());
    }

    #[test]
    fn test_headings_only_fall_back_to_full_document() {
        let sections = parse_markdown_sections("# Revenue rose 8%.\n# Guidance is unchanged.");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Full Document");
        assert_eq!(sections[0].sentences.len(), 2);
    }
}

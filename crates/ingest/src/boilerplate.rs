use regex::RegexSet;
use std::sync::LazyLock;
use tracing::{debug, info};

use model::ExtractedSection;

static TEMPLATE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        // disclaimers and legal notices
        r"\bdisclaimer\b",
        r"\blegal notice\b",
        r"\brisk warning\b",
        r"\bforward-looking statements?\b",
        r"\bcautionary statement\b",
        r"\bimportant notice\b",
        r"\bconfidential\b",
        // rating system explanations
        r"\brating (?:system|scale|methodology)\b",
        r"\b(?:out|under)perform\b.*\brating\b",
        // analyst firm information
        r"\bthis report\b.*\bprepared by\b",
        r"\bprepared by\b.*\banalyst\b",
        r"\bfor more information\b",
        r"\bcontact us\b",
        r"\bvisit our website\b",
        // headers and footers
        r"\bpage \d+\b",
        r"\bnot for distribution\b",
        r"\bfor internal use only\b",
    ])
    .unwrap()
});

const BOILERPLATE_SECTIONS: &[&str] = &[
    "disclaimer",
    "legal notice",
    "risk warning",
    "important notice",
    "rating system",
    "rating methodology",
    "about the analyst",
    "contact information",
    "confidentiality notice",
];

const LEGAL_INDICATORS: &[&str] = &[
    "disclaimer",
    "legal",
    "risk",
    "warning",
    "confidential",
    "proprietary",
];

/// Drops report template content (disclaimers, rating legends, contact
/// blocks) before it reaches the classifier.
pub struct TemplateFilter;

impl TemplateFilter {
    pub fn is_boilerplate_section(name: &str) -> bool {
        let name = name.to_lowercase();
        BOILERPLATE_SECTIONS.iter().any(|k| name.contains(k))
    }

    pub fn is_boilerplate_text(text: &str) -> bool {
        let text = text.trim();
        if text.len() < 20 {
            return false;
        }
        let lower = text.to_lowercase();

        if TEMPLATE_PATTERNS.matches(&lower).iter().count() >= 2 {
            return true;
        }

        let legal = LEGAL_INDICATORS.iter().filter(|w| lower.contains(*w)).count();
        text.len() < 200 && legal >= 2
    }

    pub fn filter(sections: Vec<ExtractedSection>) -> Vec<ExtractedSection> {
        let total: usize = sections.iter().map(|s| s.sentences.len()).sum();
        let mut removed_sections = 0;
        let mut removed_sentences = 0;

        let filtered: Vec<ExtractedSection> = sections
            .into_iter()
            .filter_map(|section| {
                if Self::is_boilerplate_section(&section.name) {
                    debug!(section = %section.name, sentences = section.sentences.len(), "Dropping boilerplate section");
                    removed_sections += 1;
                    removed_sentences += section.sentences.len();
                    return None;
                }
                let before = section.sentences.len();
                let sentences: Vec<String> = section
                    .sentences
                    .into_iter()
                    .filter(|s| !Self::is_boilerplate_text(s))
                    .collect();
                removed_sentences += before - sentences.len();
                (!sentences.is_empty()).then(|| ExtractedSection::new(section.name, sentences))
            })
            .collect();

        info!(
            removed_sections,
            removed_sentences,
            total_sentences = total,
            "Template filtering complete"
        );
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boilerplate_section_names() {
        assert!(TemplateFilter::is_boilerplate_section("Important Disclaimer"));
        assert!(TemplateFilter::is_boilerplate_section("About the Analyst"));
        assert!(!TemplateFilter::is_boilerplate_section("Investment Thesis"));
    }

    #[test]
    fn test_boilerplate_text() {
        assert!(TemplateFilter::is_boilerplate_text(
            "This report contains forward-looking statements and is confidential."
        ));
        assert!(!TemplateFilter::is_boilerplate_text(
            "Revenue grew 12% year over year on strong datacenter demand."
        ));
        assert!(!TemplateFilter::is_boilerplate_text("Confidential."));
    }

    #[test]
    fn test_filter_drops_sections_and_sentences() {
        let sections = vec![
            ExtractedSection::new("Disclaimer", vec!["Anything at all goes here.".into()]),
            ExtractedSection::new(
                "Thesis",
                vec![
                    "We expect margins to expand in 2025.".into(),
                    "Risk warning: this legal notice applies to all readers.".into(),
                ],
            ),
        ];
        let filtered = TemplateFilter::filter(sections);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].sentences, vec!["We expect margins to expand in 2025."]);
    }
}

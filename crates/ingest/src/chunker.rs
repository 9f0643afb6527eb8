use crate::chunk::{Chunk, estimate_tokens};
use crate::text::clean_text;

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 400,
            overlap_tokens: 60,
        }
    }
}

/// Splits company documents into heading-scoped passages for the knowledge base.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn chunk_text(&self, doc_id: &str, text: &str, source: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for (heading, body) in split_by_headings(text) {
            let mut buffer = String::new();
            for paragraph in split_by_paragraphs(&body) {
                let candidate_tokens = estimate_tokens(&buffer) + estimate_tokens(&paragraph);
                if candidate_tokens > self.config.max_tokens && !buffer.is_empty() {
                    let overlap = tail_words(&buffer, self.config.overlap_tokens);
                    let ordinal = chunks.len();
                    chunks.push(Chunk::new(
                        doc_id,
                        source,
                        heading.as_deref(),
                        ordinal,
                        std::mem::replace(&mut buffer, overlap),
                    ));
                }
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(&paragraph);
            }
            if !buffer.trim().is_empty() {
                let ordinal = chunks.len();
                chunks.push(Chunk::new(doc_id, source, heading.as_deref(), ordinal, buffer));
            }
        }

        chunks
    }
}

/// `(heading, body)` pairs; text before the first heading has no heading.
fn split_by_headings(text: &str) -> Vec<(Option<String>, String)> {
    let mut sections = Vec::new();
    let mut heading: Option<String> = None;
    let mut body = String::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            if !body.trim().is_empty() {
                sections.push((heading.take(), std::mem::take(&mut body)));
            }
            body.clear();
            let title = clean_text(trimmed.trim_start_matches('#'));
            heading = (!title.is_empty()).then_some(title);
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }
    if !body.trim().is_empty() {
        sections.push((heading, body));
    }
    sections
}

fn split_by_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .collect()
}

fn tail_words(text: &str, target_tokens: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let target_words = (target_tokens as f64 / 1.3) as usize;
    if target_words == 0 {
        return String::new();
    }
    words[words.len().saturating_sub(target_words)..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_chunking() {
        let chunker = Chunker::new(ChunkerConfig::default());
        let text = "This is a test paragraph.\n\nThis is another paragraph.";
        let chunks = chunker.chunk_text("test-doc", text, "test.txt");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].doc_id, "test-doc");
        assert_eq!(chunks[0].heading, None);
        assert_eq!(
            chunks[0].text,
            "This is a test paragraph. This is another paragraph."
        );
    }

    #[test]
    fn test_chunks_scoped_by_heading() {
        let chunker = Chunker::new(ChunkerConfig::default());
        let text = "# Results\nRevenue rose.\n\n# Outlook\nGuidance unchanged.";
        let chunks = chunker.chunk_text("d", text, "s");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].heading.as_deref(), Some("Results"));
        assert_eq!(chunks[1].heading.as_deref(), Some("Outlook"));
        assert_eq!(chunks[1].ordinal, 1);
    }

    #[test]
    fn test_long_section_split_with_overlap() {
        let chunker = Chunker::new(ChunkerConfig {
            max_tokens: 10,
            overlap_tokens: 3,
        });
        let text = "one two three four five six\n\nseven eight nine ten eleven twelve";
        let chunks = chunker.chunk_text("d", text, "s");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "one two three four five six");
        assert!(chunks[1].text.starts_with("five six seven"));
    }
}

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A retrievable passage of a company document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
    pub source: String,
    /// Nearest preceding heading, if any.
    pub heading: Option<String>,
    pub ordinal: usize,
}

impl Chunk {
    pub fn new(
        doc_id: &str,
        source: &str,
        heading: Option<&str>,
        ordinal: usize,
        text: String,
    ) -> Self {
        let chunk_id = Self::generate_chunk_id(doc_id, ordinal, &text);
        Self {
            doc_id: doc_id.to_string(),
            chunk_id,
            text,
            source: source.to_string(),
            heading: heading.map(str::to_string),
            ordinal,
        }
    }

    fn generate_chunk_id(doc_id: &str, ordinal: usize, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(ordinal.to_le_bytes());
        hasher.update(text.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }

    /// Text sent to the embedding model: heading plus body.
    pub fn embedding_text(&self) -> String {
        match &self.heading {
            Some(heading) => format!("{}\n{}", heading, self.text),
            None => self.text.clone(),
        }
    }

    /// Rough estimate: 1.3 tokens per word.
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.text)
    }
}

pub(crate) fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f64 * 1.3) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_stable() {
        let a = Chunk::new("doc", "10-K.md", None, 0, "Revenue was $5B.".into());
        let b = Chunk::new("doc", "10-K.md", None, 0, "Revenue was $5B.".into());
        let c = Chunk::new("doc", "10-K.md", None, 1, "Revenue was $5B.".into());
        assert_eq!(a.chunk_id, b.chunk_id);
        assert_ne!(a.chunk_id, c.chunk_id);
        assert_eq!(a.chunk_id.len(), 32);
    }

    #[test]
    fn test_embedding_text_includes_heading() {
        let chunk = Chunk::new("doc", "10-K.md", Some("Liquidity"), 0, "Cash rose.".into());
        assert_eq!(chunk.embedding_text(), "Liquidity\nCash rose.");
    }
}

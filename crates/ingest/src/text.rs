use regex::Regex;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// A segment ending in one of these is not a sentence end.
static TRAILING_ABBREVIATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:vs|Inc|Co|Corp|Ltd|Mr|Ms|Mrs|Dr|Prof|Jr|Sr|St|No|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec|e\.g|i\.e)\.$",
    )
    .unwrap()
});

/// Standalone acronyms such as `CFO.` that belong to the next sentence.
static ACRONYM_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,}\.$").unwrap());

/// Collapses all whitespace, including literal `\n` escapes and NBSP, to single spaces.
pub fn clean_text(text: &str) -> String {
    let text = text.replace("\\n", " ").replace('\u{a0}', " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Splits cleaned text into sentences.
///
/// Unicode sentence boundaries already keep decimals (`4.5%`) and initials
/// (`U.S.`) intact; the remaining false breaks after common abbreviations and
/// bare acronyms are merged back.
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = clean_text(text);
    let mut sentences: Vec<String> = Vec::new();
    let mut pending = String::new();

    for segment in text.split_sentence_bounds() {
        pending.push_str(segment);
        let trimmed = pending.trim_end();
        if trimmed.is_empty() {
            pending.clear();
            continue;
        }
        if TRAILING_ABBREVIATION.is_match(trimmed) || ACRONYM_FRAGMENT.is_match(trimmed) {
            continue;
        }
        sentences.push(trimmed.to_string());
        pending.clear();
    }

    let rest = pending.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

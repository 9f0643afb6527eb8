use anyhow::{Context, Result};
use serde_json::Value;

/// Parses the JSON object in a model response, tolerating code fences and
/// prose around it.
pub fn extract_json(text: &str) -> Result<Value> {
    let mut text = text.trim();

    if text.starts_with("```") {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() >= 2 && lines[lines.len() - 1].trim_start().starts_with("```") {
            let first = lines[0].len();
            let last = text.len() - lines[lines.len() - 1].len();
            if last > first {
                text = text[first..last].trim();
            }
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            text = &text[start..=end];
        }
    }

    serde_json::from_str(text).context("Response is not a JSON object")
}

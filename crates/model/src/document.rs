use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::item::Item;
use crate::stage::Stage;

/// Stable identifier of an input document, used as the cache directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Sanitizes to `[A-Za-z0-9._-]`; everything else becomes `_`.
    pub fn new(raw: &str) -> Self {
        let sanitized: String = raw
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        // "." and ".." would escape the cache directory
        if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
            return Self("document".to_string());
        }
        Self(sanitized)
    }

    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(&stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw extractor output before items are numbered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub name: String,
    pub sentences: Vec<String>,
}

impl ExtractedSection {
    pub fn new(name: impl Into<String>, sentences: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sentences,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub key: DocumentKey,
    pub sections: Vec<Section>,
}

impl DocumentResult {
    /// Builds the extraction result. Blank sentences and the sections they
    /// leave empty are dropped; repeated names get ` (2)`, ` (3)`, ...
    pub fn from_sections(key: DocumentKey, extracted: Vec<ExtractedSection>) -> Self {
        let mut used: HashSet<String> = HashSet::new();
        let mut sections = Vec::new();

        for raw in extracted {
            let sentences: Vec<String> = raw
                .sentences
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if sentences.is_empty() {
                continue;
            }

            let base = match raw.name.trim() {
                "" => "Untitled".to_string(),
                name => name.to_string(),
            };
            let mut name = base.clone();
            let mut suffix = 1;
            while used.contains(&name) {
                suffix += 1;
                name = format!("{} ({})", base, suffix);
            }
            used.insert(name.clone());

            let items = sentences
                .into_iter()
                .enumerate()
                .map(|(index, text)| Item::new(name.clone(), index, text))
                .collect();
            sections.push(Section { name, items });
        }

        Self { key, sections }
    }

    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    /// Flattens to document order, for stage executors.
    pub fn into_items(self) -> (DocumentKey, Vec<Item>) {
        let items = self
            .sections
            .into_iter()
            .flat_map(|s| s.items.into_iter())
            .collect();
        (self.key, items)
    }

    /// Regroups items in document order; consecutive items with the same
    /// section name form one section.
    pub fn from_items(key: DocumentKey, items: Vec<Item>) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        for item in items {
            match sections.last_mut() {
                Some(section) if section.name == item.section => section.items.push(item),
                _ => sections.push(Section {
                    name: item.section.clone(),
                    items: vec![item],
                }),
            }
        }
        Self { key, sections }
    }

    /// Whether every item has the shape `stage` produces and back-references
    /// its own section.
    pub fn satisfies(&self, stage: Stage) -> bool {
        self.sections.iter().all(|section| {
            section.items.iter().enumerate().all(|(index, item)| {
                item.section == section.name && item.index == index && item.satisfies(stage)
            })
        })
    }
}

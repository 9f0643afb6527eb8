//! Per-stage, per-document persistence of stage outputs.
//!
//! An entry is two blobs: the serialized `DocumentResult` and its
//! `StageMetadata`. The metadata carries the SHA-256 of the payload and is
//! always written last, so an entry is visible only once both are in place
//! and a torn write shows up as a digest mismatch.

pub mod fs;
pub mod memory;

pub use fs::FsStageStore;
pub use memory::MemoryStageStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use model::{DocumentKey, DocumentResult, Stage};

use crate::error::CacheError;
use crate::stages::StageReport;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetadata {
    pub format_version: u32,
    pub document: DocumentKey,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub section_count: usize,
    pub item_count: usize,
    pub failure_count: usize,
    pub label_distribution: BTreeMap<String, usize>,
    pub collaborator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    pub items_sha256: String,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub document: DocumentResult,
    pub metadata: StageMetadata,
}

#[derive(Debug, Clone)]
pub enum Lookup {
    Hit(Box<CacheEntry>),
    Miss,
    /// Present but unusable; treated as a miss by callers.
    Corrupt(String),
}

#[async_trait]
pub trait StageStore: Send + Sync {
    async fn load(&self, key: &DocumentKey, stage: Stage) -> Lookup;

    async fn save(
        &self,
        stage: Stage,
        document: &DocumentResult,
        report: &StageReport,
    ) -> Result<StageMetadata, CacheError>;

    /// Returns whether an entry existed.
    async fn remove(&self, key: &DocumentKey, stage: Stage) -> Result<bool, CacheError>;

    async fn contains(&self, key: &DocumentKey, stage: Stage) -> bool {
        matches!(self.load(key, stage).await, Lookup::Hit(_))
    }

    /// Human-readable location of an entry, for error messages.
    fn location(&self, key: &DocumentKey, stage: Stage) -> String;
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Serializes an entry into `(payload, metadata)` bytes.
pub(crate) fn encode_entry(
    stage: Stage,
    document: &DocumentResult,
    report: &StageReport,
) -> Result<(Vec<u8>, Vec<u8>, StageMetadata), CacheError> {
    let payload = serde_json::to_vec_pretty(document)
        .map_err(|source| CacheError::Serialize { stage, source })?;

    let metadata = StageMetadata {
        format_version: FORMAT_VERSION,
        document: document.key.clone(),
        stage,
        created_at: Utc::now(),
        section_count: document.sections.len(),
        item_count: document.item_count(),
        failure_count: report.failures,
        label_distribution: report.label_distribution.clone(),
        collaborator: report.collaborator.clone(),
        batch_size: report.batch_size,
        items_sha256: sha256_hex(&payload),
    };
    let metadata_bytes = serde_json::to_vec_pretty(&metadata)
        .map_err(|source| CacheError::Serialize { stage, source })?;

    Ok((payload, metadata_bytes, metadata))
}

/// Checks an entry read back from a store. Any failure is a reason string
/// for `Lookup::Corrupt`.
pub(crate) fn decode_entry(
    key: &DocumentKey,
    stage: Stage,
    payload: &[u8],
    metadata: &[u8],
) -> Result<CacheEntry, String> {
    let metadata: StageMetadata =
        serde_json::from_slice(metadata).map_err(|e| format!("unreadable metadata: {e}"))?;

    if metadata.format_version != FORMAT_VERSION {
        return Err(format!(
            "format version {} (expected {})",
            metadata.format_version, FORMAT_VERSION
        ));
    }
    if metadata.stage != stage {
        return Err(format!("metadata is for stage {}", metadata.stage));
    }
    if &metadata.document != key {
        return Err(format!("metadata is for document {}", metadata.document));
    }

    let digest = sha256_hex(payload);
    if digest != metadata.items_sha256 {
        return Err("payload digest does not match metadata".to_string());
    }

    let document: DocumentResult =
        serde_json::from_slice(payload).map_err(|e| format!("unreadable payload: {e}"))?;
    if &document.key != key {
        return Err(format!("payload is for document {}", document.key));
    }
    if document.is_empty() {
        return Err("entry has no items".to_string());
    }
    if document.item_count() != metadata.item_count {
        return Err(format!(
            "payload has {} items, metadata records {}",
            document.item_count(),
            metadata.item_count
        ));
    }
    if !document.satisfies(stage) {
        return Err(format!("items are not in {} shape", stage));
    }

    Ok(CacheEntry { document, metadata })
}

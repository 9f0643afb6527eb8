use async_trait::async_trait;
use dashmap::DashMap;

use model::{DocumentKey, DocumentResult, Stage};

use super::{Lookup, StageMetadata, StageStore, decode_entry, encode_entry};
use crate::error::CacheError;
use crate::stages::StageReport;

/// In-process store holding the same encoded bytes the filesystem store
/// writes, so entries go through identical validation on load.
#[derive(Default)]
pub struct MemoryStageStore {
    entries: DashMap<(DocumentKey, Stage), (Vec<u8>, Vec<u8>)>,
}

impl MemoryStageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrites the stored payload without touching the metadata.
    pub fn tamper(&self, key: &DocumentKey, stage: Stage, payload: Vec<u8>) -> bool {
        match self.entries.get_mut(&(key.clone(), stage)) {
            Some(mut entry) => {
                entry.0 = payload;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl StageStore for MemoryStageStore {
    async fn load(&self, key: &DocumentKey, stage: Stage) -> Lookup {
        let Some(entry) = self.entries.get(&(key.clone(), stage)) else {
            return Lookup::Miss;
        };
        let (payload, metadata) = entry.value();
        match decode_entry(key, stage, payload, metadata) {
            Ok(entry) => Lookup::Hit(Box::new(entry)),
            Err(reason) => Lookup::Corrupt(reason),
        }
    }

    async fn save(
        &self,
        stage: Stage,
        document: &DocumentResult,
        report: &StageReport,
    ) -> Result<StageMetadata, CacheError> {
        let (payload, metadata_bytes, metadata) = encode_entry(stage, document, report)?;
        self.entries
            .insert((document.key.clone(), stage), (payload, metadata_bytes));
        Ok(metadata)
    }

    async fn remove(&self, key: &DocumentKey, stage: Stage) -> Result<bool, CacheError> {
        Ok(self.entries.remove(&(key.clone(), stage)).is_some())
    }

    fn location(&self, key: &DocumentKey, stage: Stage) -> String {
        format!("memory://{}/{}", key, stage.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::{extracted, report};

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStageStore::new();
        let document = extracted("acme");
        store.save(Stage::Extract, &document, &report()).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.contains(&document.key, Stage::Extract).await);
        assert!(!store.contains(&document.key, Stage::Classify).await);
    }

    #[tokio::test]
    async fn test_tampered_entry_is_corrupt() {
        let store = MemoryStageStore::new();
        let document = extracted("acme");
        store.save(Stage::Extract, &document, &report()).await.unwrap();

        assert!(store.tamper(&document.key, Stage::Extract, b"garbage".to_vec()));
        assert!(matches!(
            store.load(&document.key, Stage::Extract).await,
            Lookup::Corrupt(_)
        ));
    }
}

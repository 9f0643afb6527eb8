use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use model::{DocumentKey, DocumentResult, Stage};

use super::{Lookup, StageMetadata, StageStore, decode_entry, encode_entry};
use crate::error::CacheError;
use crate::stages::StageReport;

pub const ITEMS_FILE: &str = "items.json";
pub const METADATA_FILE: &str = "metadata.json";

/// `<root>/<document_key>/<stage_name>/{items.json, metadata.json}`
pub struct FsStageStore {
    root: PathBuf,
}

impl FsStageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_dir(&self, key: &DocumentKey, stage: Stage) -> PathBuf {
        self.root.join(key.as_str()).join(stage.name())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Reads a file, mapping "not found" to `None`.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, std::io::Error> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Writes to a uniquely named sibling temp file, syncs it, then renames it
/// over `path`. Readers see either the old file or the complete new one.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(source) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

#[async_trait]
impl StageStore for FsStageStore {
    async fn load(&self, key: &DocumentKey, stage: Stage) -> Lookup {
        let dir = self.entry_dir(key, stage);
        let items_path = dir.join(ITEMS_FILE);
        let metadata_path = dir.join(METADATA_FILE);

        let (payload, metadata) =
            match (read_optional(&items_path).await, read_optional(&metadata_path).await) {
                (Ok(payload), Ok(metadata)) => (payload, metadata),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(document = %key, stage = %stage, error = %e, "Cache entry unreadable");
                    return Lookup::Corrupt(format!("read error: {e}"));
                }
            };

        let (payload, metadata) = match (payload, metadata) {
            (None, None) => return Lookup::Miss,
            (Some(payload), Some(metadata)) => (payload, metadata),
            (Some(_), None) => {
                warn!(document = %key, stage = %stage, "Cache entry has no metadata");
                return Lookup::Corrupt(format!("{} is missing", METADATA_FILE));
            }
            (None, Some(_)) => {
                warn!(document = %key, stage = %stage, "Cache entry has no payload");
                return Lookup::Corrupt(format!("{} is missing", ITEMS_FILE));
            }
        };

        match decode_entry(key, stage, &payload, &metadata) {
            Ok(entry) => {
                debug!(document = %key, stage = %stage, items = entry.metadata.item_count, "Cache hit");
                Lookup::Hit(Box::new(entry))
            }
            Err(reason) => {
                warn!(document = %key, stage = %stage, reason = %reason, "Corrupt cache entry, ignoring");
                Lookup::Corrupt(reason)
            }
        }
    }

    async fn save(
        &self,
        stage: Stage,
        document: &DocumentResult,
        report: &StageReport,
    ) -> Result<StageMetadata, CacheError> {
        let dir = self.entry_dir(&document.key, stage);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(io_error(&dir))?;

        let (payload, metadata_bytes, metadata) = encode_entry(stage, document, report)?;
        write_atomic(&dir.join(ITEMS_FILE), &payload).await?;
        write_atomic(&dir.join(METADATA_FILE), &metadata_bytes).await?;

        debug!(document = %document.key, stage = %stage, path = %dir.display(), "Cache entry written");
        Ok(metadata)
    }

    async fn remove(&self, key: &DocumentKey, stage: Stage) -> Result<bool, CacheError> {
        let dir = self.entry_dir(key, stage);
        let mut existed = false;
        // metadata first: without it the entry is no longer a hit
        for name in [METADATA_FILE, ITEMS_FILE] {
            let path = dir.join(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => existed = true,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&path)(e)),
            }
        }
        let _ = tokio::fs::remove_dir(&dir).await;
        Ok(existed)
    }

    fn location(&self, key: &DocumentKey, stage: Stage) -> String {
        self.entry_dir(key, stage).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::{extracted, report};

    #[tokio::test]
    async fn test_save_then_load_hits() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStageStore::new(dir.path());
        let document = extracted("acme");

        assert!(matches!(store.load(&document.key, Stage::Extract).await, Lookup::Miss));
        store.save(Stage::Extract, &document, &report()).await.unwrap();

        let entry_dir = dir.path().join("acme").join("extraction");
        assert!(entry_dir.join(ITEMS_FILE).is_file());
        assert!(entry_dir.join(METADATA_FILE).is_file());

        match store.load(&document.key, Stage::Extract).await {
            Lookup::Hit(entry) => assert_eq!(entry.document, document),
            other => panic!("expected hit, got {other:?}"),
        }
        assert!(!store.contains(&document.key, Stage::Classify).await);
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStageStore::new(dir.path());
        store.save(Stage::Extract, &extracted("acme"), &report()).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path().join("acme/extraction"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| !n.ends_with(".tmp")));
    }

    #[tokio::test]
    async fn test_payload_without_metadata_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStageStore::new(dir.path());
        let document = extracted("acme");
        store.save(Stage::Extract, &document, &report()).await.unwrap();

        // A crash between the two renames leaves only the payload.
        std::fs::remove_file(dir.path().join("acme/extraction").join(METADATA_FILE)).unwrap();
        assert!(matches!(
            store.load(&document.key, Stage::Extract).await,
            Lookup::Corrupt(_)
        ));
    }

    #[tokio::test]
    async fn test_tampered_payload_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStageStore::new(dir.path());
        let document = extracted("acme");
        store.save(Stage::Extract, &document, &report()).await.unwrap();

        std::fs::write(dir.path().join("acme/extraction").join(ITEMS_FILE), b"{}").unwrap();
        match store.load(&document.key, Stage::Extract).await {
            Lookup::Corrupt(reason) => assert!(reason.contains("digest")),
            other => panic!("expected corrupt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStageStore::new(dir.path());
        let document = extracted("acme");
        store.save(Stage::Extract, &document, &report()).await.unwrap();

        assert!(store.remove(&document.key, Stage::Extract).await.unwrap());
        assert!(!store.remove(&document.key, Stage::Extract).await.unwrap());
        assert!(matches!(store.load(&document.key, Stage::Extract).await, Lookup::Miss));
    }
}

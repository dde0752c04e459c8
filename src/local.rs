use crate::store::{BlobRef, BlobStore, NewNote, NoteFilter, NoteRecord, NoteStore, NoteUpdate};
use crate::{IntakeError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

// ── FsBlobStore ──────────────────────────────────────────────────────────────

/// Blob store backed by a directory on the local filesystem.
///
/// Keys map to paths under the base directory; keys containing `..` or a
/// leading `/` are rejected so a crafted key cannot escape the base.
pub struct FsBlobStore {
    base_dir: PathBuf,
}

impl FsBlobStore {
    /// Open (and create if necessary) a blob store rooted at `base_dir`.
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        if key.contains("..") || key.starts_with('/') {
            return Err(IntakeError::StorageWriteFailed(format!(
                "invalid storage key '{key}'"
            )));
        }
        Ok(self.base_dir.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<BlobRef> {
        let path = self.key_to_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &bytes).await?;
        Ok(BlobRef {
            key: key.to_string(),
            url: format!("file://{}", path.display()),
        })
    }

    async fn download_url(&self, blob: &BlobRef) -> Result<String> {
        let path = self.key_to_path(&blob.key)?;
        if !path.exists() {
            return Err(IntakeError::NotFound(blob.key.clone()));
        }
        Ok(blob.url.clone())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key)?;
        fs::remove_file(&path).await?;
        Ok(())
    }
}

// ── JsonNoteStore ────────────────────────────────────────────────────────────

/// Note store persisting every record into one pretty-printed JSON file.
///
/// Suited to the CLI and to small self-hosted deployments; every mutation
/// rewrites the file.
#[derive(Debug)]
pub struct JsonNoteStore {
    path: PathBuf,
    records: Mutex<Vec<NoteRecord>>,
}

impl JsonNoteStore {
    /// Open the store at `path`, loading existing records if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                IntakeError::MetadataWriteFailed(format!(
                    "cannot parse note store {}: {e}",
                    path.display()
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    async fn persist(&self, records: &[NoteRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| IntakeError::MetadataWriteFailed(e.to_string()))?;
        if let Some(parent) = Path::new(&self.path).parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl NoteStore for JsonNoteStore {
    async fn insert(&self, note: NewNote) -> Result<NoteRecord> {
        let record = NoteRecord {
            id: Uuid::new_v4().to_string(),
            metadata: note.metadata,
            file_url: note.file_url,
            file_name: note.file_name,
            published: false,
            created_at: chrono::Utc::now(),
            original_size: note.original_size,
            compacted_size: note.compacted_size,
            compression_ratio: note.compression_ratio,
        };
        let mut records = self.records.lock().await;
        records.insert(0, record.clone());
        self.persist(&records).await?;
        Ok(record)
    }

    async fn update(&self, id: &str, update: NoteUpdate) -> Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| IntakeError::NotFound(id.to_string()))?;
        update.apply(record);
        self.persist(&records).await
    }

    async fn query(&self, filter: &NoteFilter) -> Result<Vec<NoteRecord>> {
        let records = self.records.lock().await;
        Ok(records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(IntakeError::NotFound(id.to_string()));
        }
        self.persist(&records).await
    }
}

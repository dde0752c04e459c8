use crate::store::{BlobRef, BlobStore, NewNote, NoteFilter, NoteRecord, NoteStore, NoteUpdate};
use crate::{IntakeError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

// ── MemoryBlobStore ──────────────────────────────────────────────────────────

/// Blob store keeping everything in a process-local map.
///
/// Used by the integration tests and by hosts that want to exercise the
/// pipeline without touching disk; the accessors exist so tests can assert
/// on what was written.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    /// The bytes stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    /// The keys of every stored blob.
    pub fn keys(&self) -> Vec<String> {
        self.blobs.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<BlobRef> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes);
        Ok(BlobRef {
            key: key.to_string(),
            url: format!("memory://{key}"),
        })
    }

    async fn download_url(&self, blob: &BlobRef) -> Result<String> {
        if !self.blobs.lock().unwrap().contains_key(&blob.key) {
            return Err(IntakeError::NotFound(blob.key.clone()));
        }
        Ok(blob.url.clone())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

// ── MemoryNoteStore ──────────────────────────────────────────────────────────

/// Note store keeping records in a process-local vector, newest first.
#[derive(Default)]
pub struct MemoryNoteStore {
    records: Mutex<Vec<NoteRecord>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// A snapshot of every record, newest first.
    pub fn all(&self) -> Vec<NoteRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
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
        self.records.lock().unwrap().insert(0, record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, update: NoteUpdate) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| IntakeError::NotFound(id.to_string()))?;
        update.apply(record);
        Ok(())
    }

    async fn query(&self, filter: &NoteFilter) -> Result<Vec<NoteRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(IntakeError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

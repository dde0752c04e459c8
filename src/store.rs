use crate::{Category, NoteMetadata, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── BlobStore ────────────────────────────────────────────────────────────────

/// Retrieval reference returned by a [`BlobStore`] put.
///
/// Opaque to the intake pipeline: it is only ever exchanged back to the same
/// store for a download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    /// The storage key the blob was written under.
    pub key: String,
    /// Backend-specific locator for the stored object.
    pub url: String,
}

/// Object storage collaborator.
///
/// The intake pipeline issues exactly one [`put`](BlobStore::put) followed by
/// one [`download_url`](BlobStore::download_url) per successful upload.
/// [`delete`](BlobStore::delete) exists for administrative cleanup and is
/// never called by the pipeline itself.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key` and return a retrieval reference.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<BlobRef>;

    /// Exchange a retrieval reference for a URL a reader can download from.
    async fn download_url(&self, blob: &BlobRef) -> Result<String>;

    /// Remove the blob stored under `key`.
    async fn delete(&self, key: &str) -> Result<()>;
}

// ── Note records ─────────────────────────────────────────────────────────────

/// A note as handed to [`NoteStore::insert`]. The store assigns the id and
/// the creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNote {
    #[serde(flatten)]
    pub metadata: NoteMetadata,
    pub file_url: String,
    pub file_name: String,
    pub original_size: u64,
    pub compacted_size: u64,
    /// `0` when compaction fell back to the original bytes.
    pub compression_ratio: i32,
}

/// A stored note. Freshly inserted notes are unpublished until an admin
/// toggles them visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: String,
    #[serde(flatten)]
    pub metadata: NoteMetadata,
    pub file_url: String,
    pub file_name: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub original_size: u64,
    pub compacted_size: u64,
    pub compression_ratio: i32,
}

/// Partial update applied by [`NoteStore::update`]. `None` fields are left
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteUpdate {
    pub published: Option<bool>,
    pub subject: Option<String>,
    pub semester: Option<String>,
    pub category: Option<Category>,
}

impl NoteUpdate {
    /// Shorthand for the publish/unpublish toggle.
    pub fn publish(published: bool) -> Self {
        Self {
            published: Some(published),
            ..Self::default()
        }
    }

    /// Apply this update to a record in place.
    pub fn apply(&self, record: &mut NoteRecord) {
        if let Some(published) = self.published {
            record.published = published;
        }
        if let Some(subject) = &self.subject {
            record.metadata.subject = subject.clone();
        }
        if let Some(semester) = &self.semester {
            record.metadata.semester = semester.clone();
        }
        if let Some(category) = self.category {
            record.metadata.category = category;
        }
    }
}

/// Predicate for [`NoteStore::query`]. `None` fields match everything;
/// `search` is a case-insensitive substring match over subject, course,
/// branch, and uploader name.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub published: Option<bool>,
    pub subject: Option<String>,
    pub semester: Option<String>,
    pub category: Option<Category>,
    pub search: Option<String>,
}

impl NoteFilter {
    /// Only records an admin has published.
    pub fn published_only() -> Self {
        Self {
            published: Some(true),
            ..Self::default()
        }
    }

    /// Whether `record` satisfies this filter.
    pub fn matches(&self, record: &NoteRecord) -> bool {
        if let Some(published) = self.published {
            if record.published != published {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if !record.metadata.subject.eq_ignore_ascii_case(subject) {
                return false;
            }
        }
        if let Some(semester) = &self.semester {
            if !record.metadata.semester.eq_ignore_ascii_case(semester) {
                return false;
            }
        }
        if let Some(category) = self.category {
            if record.metadata.category != category {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let m = &record.metadata;
            let haystacks = [&m.subject, &m.course, &m.branch, &m.uploader_name];
            if !haystacks
                .iter()
                .any(|h| h.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

/// Document store collaborator holding one record per uploaded note.
///
/// The intake pipeline issues exactly one [`insert`](NoteStore::insert) per
/// successful upload; the remaining operations back the browse and
/// administration surfaces.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Persist a new, unpublished record. The store assigns id and
    /// `created_at` and returns the full record.
    async fn insert(&self, note: NewNote) -> Result<NoteRecord>;

    /// Apply a partial update to the record with `id`.
    async fn update(&self, id: &str, update: NoteUpdate) -> Result<()>;

    /// All records matching `filter`, newest first.
    async fn query(&self, filter: &NoteFilter) -> Result<Vec<NoteRecord>>;

    /// Remove the record with `id`.
    async fn delete(&self, id: &str) -> Result<()>;
}

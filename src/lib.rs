//! # studyhub-intake
//!
//! The upload intake pipeline of the CU Study Hub note-sharing service:
//! compact a PDF losslessly, then hand the compacted artifact plus its
//! metadata to a blob store and a note store.
//!
//! ## What this crate does
//!
//! 1. **Compact PDF** — parses the selected bytes into a PDF object graph and
//!    re-serialises it with compressed streams, dead objects pruned, and
//!    object/cross-reference streams enabled. Structural only: embedded
//!    images and fonts are never re-encoded, so rendered content is unchanged.
//! 2. **Track the draft** — one [`UploadDraft`] per upload session holds the
//!    selected file, the compacted artifact, the user-entered metadata, and a
//!    [`Phase`] state machine with inline status feedback.
//! 3. **Persist** — on submit, writes one blob keyed
//!    `notes/{subject}-{semester}-{millis}.{ext}` and inserts one
//!    [`NoteRecord`] embedding the blob's download URL.
//!
//! ## Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use studyhub_intake::{FileBlob, IntakeController, MemoryBlobStore, MemoryNoteStore};
//!
//! # async fn demo() -> studyhub_intake::Result<()> {
//! let controller = IntakeController::new(
//!     Arc::new(MemoryBlobStore::new()),
//!     Arc::new(MemoryNoteStore::new()),
//! );
//!
//! let bytes = std::fs::read("algebra-notes.pdf")?;
//! controller
//!     .select_file(FileBlob::new("algebra-notes.pdf", bytes, "application/pdf"))
//!     .await?;
//!
//! controller
//!     .update_metadata(|m| {
//!         m.uploader_name = "Priya".into();
//!         m.roll_number = "20230001".into();
//!         m.course = "BCA".into();
//!         m.branch = "Computer Science".into();
//!         m.subject = "Algebra".into();
//!         m.semester = "3".into();
//!     })
//!     .await;
//!
//! let record = controller.submit().await?;
//! println!(
//!     "stored as {} ({} -> {} bytes)",
//!     record.file_name, record.original_size, record.compacted_size
//! );
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

mod compactor;
mod controller;
mod draft;
mod local;
mod memory;
mod store;

pub use compactor::{compression_ratio, CompactionOutcome, CompactionStage, PdfCompactor};
pub use controller::IntakeController;
pub use draft::{
    format_size, Category, FileBlob, NoteMetadata, Phase, StatusKind, StatusLine, UploadDraft,
};
pub use local::{FsBlobStore, JsonNoteStore};
pub use memory::{MemoryBlobStore, MemoryNoteStore};
pub use store::{BlobRef, BlobStore, NewNote, NoteFilter, NoteRecord, NoteStore, NoteUpdate};

/// The only MIME type accepted by [`IntakeController::select_file`].
pub const PDF_MIME: &str = "application/pdf";

// ── Configuration ────────────────────────────────────────────────────────────

/// Serialisation tuning for [`PdfCompactor`].
///
/// The defaults enable every structural optimisation; disabling the stream
/// options produces a traditional xref-table PDF, which is mostly useful when
/// a downstream reader predates PDF 1.5.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Pack non-stream indirect objects into shared object streams.
    pub use_object_streams: bool,

    /// Write a cross-reference stream instead of a plain xref table.
    pub use_xref_streams: bool,

    /// Upper bound on objects packed into one object stream.
    pub max_objects_per_stream: usize,

    /// Deflate level (0-9) applied when packing object streams.
    pub compression_level: u32,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            use_object_streams: true,
            use_xref_streams: true,
            max_objects_per_stream: 200,
            compression_level: 9,
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Every error that this crate can produce.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// A filesystem I/O error occurred (e.g. when reading the selected file).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The selected file is not `application/pdf`. The draft is left
    /// untouched; compaction never starts.
    #[error("unsupported file type '{0}': only PDF files are accepted")]
    UnsupportedFileType(String),

    /// The input bytes could not be parsed as a PDF object graph. The
    /// controller recovers from this by keeping the original bytes as the
    /// upload artifact; only [`PdfCompactor`] itself surfaces it.
    #[error("malformed PDF document: {0}")]
    MalformedDocument(String),

    /// A required metadata field was empty at submit time. Submit is a no-op
    /// until the field is filled in.
    #[error("required field '{0}' is empty")]
    MissingField(&'static str),

    /// Submit was invoked while a previous submit of the same draft was still
    /// writing. Nothing is written; the in-flight upload is unaffected.
    #[error("an upload is already in progress")]
    UploadInProgress,

    /// The blob store rejected the artifact. Retryable: the draft keeps its
    /// file and metadata so the user can resubmit.
    #[error("blob store write failed: {0}")]
    StorageWriteFailed(String),

    /// The note store rejected the record. Retryable, but the already-written
    /// blob stays behind (a warning naming the orphaned key is logged).
    #[error("note record write failed: {0}")]
    MetadataWriteFailed(String),

    /// A note record lookup failed.
    #[error("note record not found: {0}")]
    NotFound(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, IntakeError>;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── FileBlob ─────────────────────────────────────────────────────────────────

/// An opaque binary blob with a name, a size, and the MIME type the host
/// environment reported for it.
///
/// Ownership of the payload transfers into the [`UploadDraft`] on selection;
/// the payload is a [`Bytes`] handle, so cloning a blob (e.g. for the
/// compaction-failure fallback) never copies the bytes themselves.
#[derive(Debug, Clone)]
pub struct FileBlob {
    /// The filename as reported by the host (file picker or filesystem).
    pub name: String,

    /// The raw file content.
    pub bytes: Bytes,

    /// MIME type reported alongside the file (e.g. `"application/pdf"`).
    pub content_type: String,
}

impl FileBlob {
    /// Build a blob from anything convertible into [`Bytes`].
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Returns the file extension (lowercase), or `None` if the filename has
    /// no extension.
    ///
    /// ```
    /// # use studyhub_intake::FileBlob;
    /// let blob = FileBlob::new("Algebra-Notes.PDF", b"".to_vec(), "application/pdf");
    /// assert_eq!(blob.extension(), Some("pdf".to_string()));
    /// ```
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

// ── Note metadata ─────────────────────────────────────────────────────────────

/// Difficulty/kind bucket a note is filed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Basic,
    Simple,
    Advanced,
    Reference,
}

impl Category {
    /// Parse a category from its display name (case-insensitive).
    /// `"Reference Material"` is accepted as an alias for `Reference`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "simple" => Some(Self::Simple),
            "advanced" => Some(Self::Advanced),
            "reference" | "reference material" => Some(Self::Reference),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Simple => "Simple",
            Self::Advanced => "Advanced",
            Self::Reference => "Reference",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The metadata the uploader fills in for one note.
///
/// Every free-text field is required at submit time; `category` always has a
/// value (defaults to [`Category::Basic`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub uploader_name: String,
    pub roll_number: String,
    pub course: String,
    pub branch: String,
    pub subject: String,
    pub semester: String,
    pub category: Category,
}

impl NoteMetadata {
    /// Returns the name of the first required field that is empty (after
    /// trimming), or `None` when the metadata is complete.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        let required: [(&'static str, &str); 6] = [
            ("uploader_name", &self.uploader_name),
            ("roll_number", &self.roll_number),
            ("course", &self.course),
            ("branch", &self.branch),
            ("subject", &self.subject),
            ("semester", &self.semester),
        ];
        required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
    }
}

// ── Intake state machine ─────────────────────────────────────────────────────

/// The discrete state of one upload session.
///
/// ```text
/// Idle ──select──► Compacting ──resolve──► Ready ──submit──► Uploading ──► Done
///                                            ▲                   │            │
///                                            └──── Failed ◄──────┘      reset to Idle
/// ```
///
/// A compaction failure is *not* fatal: the draft still reaches `Ready`,
/// carrying the original bytes as the artifact and no compression ratio.
///
/// `Done` is held for one scheduler turn after a successful submit, then the
/// draft resets to a fresh `Idle` session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Compacting,
    Ready,
    Uploading,
    Done,
    Failed,
}

// ── Status feedback ──────────────────────────────────────────────────────────

/// Severity of a [`StatusLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

/// One line of inline user feedback, mirroring what the upload form shows
/// above its fields. Feedback only, never consulted for control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: StatusKind::Info }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: StatusKind::Success }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: StatusKind::Warning }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: StatusKind::Error }
    }
}

// ── UploadDraft ──────────────────────────────────────────────────────────────

/// The mutable, session-scoped state of one upload attempt.
///
/// Exactly one draft is live per [`crate::IntakeController`] instance.
/// Selecting a new file replaces the previous payloads outright — drafts are
/// never merged.
///
/// Invariants upheld by the controller:
/// - `compacted_file` is `Some` whenever `phase` is `Ready`, `Uploading`, or
///   `Done`.
/// - `compression_ratio` is `Some` only when compaction actually succeeded;
///   after the malformed-document fallback it stays `None`.
#[derive(Debug, Clone, Default)]
pub struct UploadDraft {
    pub metadata: NoteMetadata,
    pub raw_file: Option<FileBlob>,
    pub compacted_file: Option<Bytes>,
    pub compression_ratio: Option<i32>,
    pub phase: Phase,
    pub status: Option<StatusLine>,
}

impl UploadDraft {
    /// A fresh `Idle` draft carrying an initial status line.
    pub(crate) fn fresh(status: StatusLine) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Render a byte count for humans (`"1.4 MB"`).
///
/// ```
/// assert_eq!(studyhub_intake::format_size(512), "512 B");
/// assert_eq!(studyhub_intake::format_size(2048), "2.0 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

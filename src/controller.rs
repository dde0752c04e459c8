use crate::compactor::PdfCompactor;
use crate::draft::{FileBlob, NoteMetadata, Phase, StatusLine, UploadDraft};
use crate::store::{BlobStore, NewNote, NoteRecord, NoteStore};
use crate::{IntakeError, Result, PDF_MIME};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

// ── IntakeController ─────────────────────────────────────────────────────────

/// Drives one upload attempt from file selection to persisted artifact.
///
/// The controller owns exactly one [`UploadDraft`] and two collaborators: a
/// [`BlobStore`] for the artifact and a [`NoteStore`] for the record. All
/// methods take `&self`; the draft lives behind an async mutex that is never
/// held across a compaction or store await, so a host can keep handling input
/// (including selecting a replacement file) while work is in flight.
///
/// # Replacing a pending selection
///
/// Selecting a new file at any point supersedes the previous one. Each
/// selection takes a monotonically increasing sequence number; when a
/// compaction resolves, its result is applied only if its sequence still
/// matches the current selection. A superseded compaction is not preempted —
/// the parse/serialise steps are not interruptible — its result is simply
/// discarded when it lands.
pub struct IntakeController {
    draft: Mutex<UploadDraft>,
    selection_seq: AtomicU64,
    compactor: PdfCompactor,
    blobs: Arc<dyn BlobStore>,
    notes: Arc<dyn NoteStore>,
}

impl IntakeController {
    /// A controller with a default [`PdfCompactor`].
    pub fn new(blobs: Arc<dyn BlobStore>, notes: Arc<dyn NoteStore>) -> Self {
        Self::with_compactor(PdfCompactor::new(), blobs, notes)
    }

    /// A controller with a custom-tuned compactor.
    pub fn with_compactor(
        compactor: PdfCompactor,
        blobs: Arc<dyn BlobStore>,
        notes: Arc<dyn NoteStore>,
    ) -> Self {
        Self {
            draft: Mutex::new(UploadDraft::default()),
            selection_seq: AtomicU64::new(0),
            compactor,
            blobs,
            notes,
        }
    }

    // ── File selection ────────────────────────────────────────────────────────

    /// Select `blob` as the file for this draft and compact it.
    ///
    /// Rejects anything that is not `application/pdf` with
    /// [`IntakeError::UnsupportedFileType`], leaving the draft untouched.
    ///
    /// On a malformed document the draft still reaches [`Phase::Ready`]: the
    /// original bytes become the upload artifact, no ratio is reported, and a
    /// warning status is set. That is a recovered error, so `Ok(())` is
    /// returned.
    pub async fn select_file(&self, blob: FileBlob) -> Result<()> {
        if blob.content_type != PDF_MIME {
            return Err(IntakeError::UnsupportedFileType(blob.content_type));
        }

        let raw = blob.bytes.clone();

        // The sequence number is taken under the same lock that records the
        // selection, so the draft fields and the current sequence can never
        // describe different selections.
        let seq = {
            let mut draft = self.draft.lock().await;
            let seq = self.selection_seq.fetch_add(1, Ordering::SeqCst) + 1;
            draft.raw_file = Some(blob);
            draft.compacted_file = None;
            draft.compression_ratio = None;
            draft.phase = Phase::Compacting;
            draft.status = Some(StatusLine::info("Compacting PDF…"));
            seq
        };

        // The mutex is released while compaction runs, so a newer selection
        // can come in concurrently.
        let outcome = self.compactor.compact(&raw).await;

        let mut draft = self.draft.lock().await;
        if self.selection_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "discarding superseded compaction result");
            return Ok(());
        }

        match outcome {
            Ok(outcome) => {
                draft.compression_ratio = Some(outcome.ratio);
                draft.status = Some(StatusLine::success(format!(
                    "PDF compacted, size reduced by {}%",
                    outcome.ratio
                )));
                draft.compacted_file = Some(outcome.bytes);
                draft.phase = Phase::Ready;
            }
            Err(e) => {
                // Recovered: upload the original bytes uncompacted.
                tracing::warn!(error = %e, "compaction failed, keeping original bytes");
                draft.compacted_file = Some(raw);
                draft.compression_ratio = None;
                draft.phase = Phase::Ready;
                draft.status = Some(StatusLine::warning(
                    "Compression did not apply; the original file will be uploaded",
                ));
            }
        }
        Ok(())
    }

    // ── Metadata editing ──────────────────────────────────────────────────────

    /// Edit the draft metadata in place. The phase never changes.
    pub async fn update_metadata(&self, edit: impl FnOnce(&mut NoteMetadata)) {
        let mut draft = self.draft.lock().await;
        edit(&mut draft.metadata);
    }

    // ── Submit ────────────────────────────────────────────────────────────────

    /// Persist the draft: one blob put, then one note insert.
    ///
    /// Rejected synchronously with [`IntakeError::MissingField`] when any
    /// required metadata field is empty or no artifact is ready, and with
    /// [`IntakeError::UploadInProgress`] when a previous submit of this draft
    /// is still writing; in both cases the draft is left exactly as it was.
    ///
    /// The two writes are sequential because the record embeds the download
    /// URL returned for the blob. They are not transactional: when the insert
    /// fails after the put succeeded, the blob stays behind and a warning
    /// naming the orphaned key is logged. Either failure leaves the draft in
    /// [`Phase::Failed`] with its file and metadata intact, so the user can
    /// resubmit without re-selecting or re-compacting.
    ///
    /// On success the draft resets to a fresh `Idle` state and the stored
    /// record is returned.
    pub async fn submit(&self) -> Result<NoteRecord> {
        let (metadata, artifact, file_name, original_size, ratio) = {
            let mut draft = self.draft.lock().await;

            if draft.phase == Phase::Uploading {
                return Err(IntakeError::UploadInProgress);
            }
            let artifact = draft
                .compacted_file
                .clone()
                .ok_or(IntakeError::MissingField("file"))?;
            if let Some(field) = draft.metadata.first_missing_field() {
                return Err(IntakeError::MissingField(field));
            }
            let raw = draft.raw_file.as_ref().ok_or(IntakeError::MissingField("file"))?;
            let extracted = (
                draft.metadata.clone(),
                artifact,
                raw.name.clone(),
                raw.size(),
                draft.compression_ratio,
            );

            draft.phase = Phase::Uploading;
            draft.status = Some(StatusLine::info("Uploading your notes…"));
            extracted
        };

        let extension = std::path::Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("pdf")
            .to_ascii_lowercase();
        let timestamp = chrono::Utc::now().timestamp_millis();
        let key = format!(
            "notes/{}-{}-{}.{}",
            metadata.subject, metadata.semester, timestamp, extension
        );
        let compacted_size = artifact.len() as u64;

        let blob_ref = match self.blobs.put(&key, artifact, PDF_MIME).await {
            Ok(blob_ref) => blob_ref,
            Err(e) => return self.fail(IntakeError::StorageWriteFailed(e.to_string())).await,
        };
        let file_url = match self.blobs.download_url(&blob_ref).await {
            Ok(url) => url,
            Err(e) => return self.fail(IntakeError::StorageWriteFailed(e.to_string())).await,
        };

        let note = NewNote {
            metadata,
            file_url,
            file_name: key.rsplit('/').next().unwrap_or(&key).to_string(),
            original_size,
            compacted_size,
            compression_ratio: ratio.unwrap_or(0),
        };

        let record = match self.notes.insert(note).await {
            Ok(record) => record,
            Err(e) => {
                // Accepted inconsistency: the blob was written but the record
                // was not. No compensating delete is issued; the key is logged
                // so an operator can reconcile.
                tracing::warn!(key = %blob_ref.key, error = %e, "note insert failed, blob orphaned");
                return self.fail(IntakeError::MetadataWriteFailed(e.to_string())).await;
            }
        };

        tracing::info!(id = %record.id, file = %record.file_name, "notes uploaded");
        let success = StatusLine::success("Notes uploaded successfully!");
        {
            let mut draft = self.draft.lock().await;
            draft.phase = Phase::Done;
            draft.status = Some(success.clone());
        }

        // Hold Done for one scheduler turn so observers can see it, then
        // reset the draft for the next session. A selection that lands inside
        // that window has already moved the phase on; leave it alone.
        tokio::task::yield_now().await;
        let mut draft = self.draft.lock().await;
        if draft.phase == Phase::Done {
            *draft = UploadDraft::fresh(success);
        }
        Ok(record)
    }

    /// Discard the draft (and any in-flight compaction result) and start over.
    pub async fn reset(&self) {
        self.selection_seq.fetch_add(1, Ordering::SeqCst);
        let mut draft = self.draft.lock().await;
        *draft = UploadDraft::default();
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// A snapshot of the current draft. Payloads are `Bytes` handles, so this
    /// is cheap.
    pub async fn draft(&self) -> UploadDraft {
        self.draft.lock().await.clone()
    }

    /// The current phase of the draft.
    pub async fn phase(&self) -> Phase {
        self.draft.lock().await.phase
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Mark the draft failed-but-retryable and propagate `error`.
    async fn fail(&self, error: IntakeError) -> Result<NoteRecord> {
        let mut draft = self.draft.lock().await;
        draft.phase = Phase::Failed;
        draft.status = Some(StatusLine::error(
            "Failed to upload notes. Please try again.",
        ));
        Err(error)
    }
}

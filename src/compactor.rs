use crate::{IntakeConfig, IntakeError, Result};
use bytes::Bytes;
use lopdf::{Document, SaveOptions};
use std::fmt;

// ── CompactionStage ──────────────────────────────────────────────────────────

/// Coarse progress milestones emitted while a document is being compacted.
///
/// These exist purely so a host UI can show feedback during a long-running
/// compaction; nothing in the pipeline depends on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionStage {
    /// About to parse the input bytes.
    ParseStart,
    /// The object graph is in memory.
    ParseDone,
    /// Streams compressed and unreachable objects pruned.
    OptimizeDone,
    /// The output bytes have been written.
    Serialized,
}

impl fmt::Display for CompactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ParseStart => "parsing",
            Self::ParseDone => "parsed",
            Self::OptimizeDone => "optimized",
            Self::Serialized => "serialized",
        };
        f.write_str(s)
    }
}

// ── CompactionOutcome ────────────────────────────────────────────────────────

/// The result of one successful compaction run.
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    /// The re-serialised document. Parses as a valid PDF in its own right.
    pub bytes: Bytes,

    /// Size of the input, in bytes.
    pub original_size: u64,

    /// Size of [`CompactionOutcome::bytes`].
    pub compacted_size: u64,

    /// `round(100 * (1 - compacted/original))`. Zero or negative when the
    /// input was already optimally packed — callers must not assume savings.
    pub ratio: i32,
}

// ── PdfCompactor ─────────────────────────────────────────────────────────────

/// Lossless structural PDF compaction.
///
/// Given raw PDF bytes, [`compact`](PdfCompactor::compact) parses them into an
/// object graph and re-serialises it with:
///
/// - every stream deflate-compressed,
/// - objects unreachable from the document catalog pruned and the remaining
///   objects renumbered densely,
/// - non-stream objects packed into shared object streams and the
///   cross-reference table rewritten as a cross-reference stream.
///
/// Content streams are recompressed losslessly; embedded images and fonts are
/// carried over byte-for-byte, so a compliant reader renders the output
/// identically to the input.
///
/// The whole run is a cooperative computation: it yields to the task scheduler
/// between stages, so a current-thread runtime stays responsive while a large
/// document is being processed.
///
/// # Example
///
/// ```no_run
/// use studyhub_intake::PdfCompactor;
///
/// # async fn demo() -> studyhub_intake::Result<()> {
/// let input = bytes::Bytes::from(std::fs::read("notes.pdf")?);
/// let outcome = PdfCompactor::new().compact(&input).await?;
/// println!("{} -> {} bytes ({}%)", outcome.original_size, outcome.compacted_size, outcome.ratio);
/// # Ok(())
/// # }
/// ```
pub struct PdfCompactor {
    config: IntakeConfig,
    observer: Option<Box<dyn Fn(CompactionStage) + Send + Sync>>,
}

impl Default for PdfCompactor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfCompactor {
    /// A compactor with the default [`IntakeConfig`] (all optimisations on).
    pub fn new() -> Self {
        Self {
            config: IntakeConfig::default(),
            observer: None,
        }
    }

    /// A compactor with custom serialisation tuning.
    pub fn with_config(config: IntakeConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Register a milestone observer. Called synchronously from within
    /// [`compact`](Self::compact); keep it cheap.
    pub fn on_stage(mut self, observer: impl Fn(CompactionStage) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Compact `input` and return the re-serialised bytes with size stats.
    ///
    /// Fails with [`IntakeError::MalformedDocument`] when the bytes cannot be
    /// parsed as a PDF object graph (empty input, corrupt header, unbalanced
    /// xref, unsupported encryption). Pure beyond its return value: no
    /// network, no storage.
    ///
    /// The input is borrowed; at peak, memory holds the input, one working
    /// object graph, and the output buffer.
    pub async fn compact(&self, input: &Bytes) -> Result<CompactionOutcome> {
        let original_size = input.len() as u64;

        self.notify(CompactionStage::ParseStart);
        tracing::debug!(bytes = original_size, "parsing PDF");

        let mut doc = Document::load_mem(input)
            .map_err(|e| IntakeError::MalformedDocument(e.to_string()))?;

        self.notify(CompactionStage::ParseDone);
        tokio::task::yield_now().await;

        let objects_before = doc.objects.len();
        doc.compress();
        doc.prune_objects();
        doc.renumber_objects();
        tracing::debug!(
            objects_before,
            objects_after = doc.objects.len(),
            "streams compressed, dead objects pruned"
        );

        self.notify(CompactionStage::OptimizeDone);
        tokio::task::yield_now().await;

        let options = SaveOptions::builder()
            .use_object_streams(self.config.use_object_streams)
            .use_xref_streams(self.config.use_xref_streams)
            .max_objects_per_stream(self.config.max_objects_per_stream)
            .compression_level(self.config.compression_level)
            .build();

        let mut output: Vec<u8> = Vec::new();
        doc.save_with_options(&mut output, options)
            .map_err(|e| IntakeError::MalformedDocument(e.to_string()))?;

        self.notify(CompactionStage::Serialized);

        let compacted_size = output.len() as u64;
        let ratio = compression_ratio(original_size, compacted_size);
        tracing::debug!(original_size, compacted_size, ratio, "compaction finished");

        Ok(CompactionOutcome {
            bytes: Bytes::from(output),
            original_size,
            compacted_size,
            ratio,
        })
    }

    fn notify(&self, stage: CompactionStage) {
        if let Some(observer) = &self.observer {
            observer(stage);
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Percentage saved by compaction: `round(100 * (1 - output/input))`.
///
/// Negative when the output grew (possible for already-optimal inputs).
///
/// ```
/// assert_eq!(studyhub_intake::compression_ratio(1000, 800), 20);
/// assert_eq!(studyhub_intake::compression_ratio(1000, 1000), 0);
/// assert_eq!(studyhub_intake::compression_ratio(1000, 1100), -10);
/// ```
pub fn compression_ratio(input: u64, output: u64) -> i32 {
    if input == 0 {
        return 0;
    }
    (100.0 * (1.0 - output as f64 / input as f64)).round() as i32
}

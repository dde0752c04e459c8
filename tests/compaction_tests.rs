// Compaction engine tests.
//
// No binary fixtures: the input documents are built programmatically with
// lopdf, saved in the traditional (uncompressed, xref-table) format so the
// structural optimisations have room to work.

use bytes::Bytes;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::sync::{Arc, Mutex};
use studyhub_intake::{compression_ratio, CompactionStage, IntakeError, PdfCompactor};

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Build a text document with `pages` pages sharing one font resource, plus
/// `dead_objects` indirect objects that nothing references. Saved without any
/// stream compression or object streams.
fn build_pdf(pages: usize, dead_objects: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    for i in 0..dead_objects {
        doc.add_object(dictionary! {
            "Type" => "Orphan",
            "Index" => i as i64,
            "Payload" => Object::string_literal(format!(
                "unreferenced object number {i} with some padding text"
            )),
        });
    }

    let mut kids: Vec<Object> = Vec::new();
    for page in 0..pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 750.into()]),
        ];
        for line in 0..40 {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(format!(
                    "Lecture notes, page {page} line {line}: the quick brown fox jumps over the lazy dog"
                ))],
            ));
            operations.push(Operation::new("Td", vec![0.into(), (-18).into()]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save fixture");
    buffer
}

// ── Round-trip validity ──────────────────────────────────────────────────────

#[tokio::test]
async fn output_parses_as_pdf() {
    let input = Bytes::from(build_pdf(3, 0));
    let outcome = PdfCompactor::new().compact(&input).await.unwrap();

    let reloaded = Document::load_mem(&outcome.bytes).expect("output must re-parse");
    assert_eq!(reloaded.get_pages().len(), 3, "page count must survive");
}

#[tokio::test]
async fn dead_objects_are_pruned() {
    let input = Bytes::from(build_pdf(1, 50));
    let outcome = PdfCompactor::new().compact(&input).await.unwrap();

    let reloaded = Document::load_mem(&outcome.bytes).unwrap();
    let orphans = reloaded
        .objects
        .values()
        .filter(|o| o.type_name().ok() == Some(b"Orphan".as_slice()))
        .count();
    assert_eq!(orphans, 0, "unreachable objects must not survive compaction");
}

// ── Ratio reporting ──────────────────────────────────────────────────────────

#[tokio::test]
async fn ratio_matches_formula_exactly() {
    let input = Bytes::from(build_pdf(2, 10));
    let outcome = PdfCompactor::new().compact(&input).await.unwrap();

    assert_eq!(outcome.original_size, input.len() as u64);
    assert_eq!(outcome.compacted_size, outcome.bytes.len() as u64);

    let expected = (100.0
        * (1.0 - outcome.compacted_size as f64 / outcome.original_size as f64))
        .round() as i32;
    assert_eq!(outcome.ratio, expected);
}

#[tokio::test]
async fn redundant_document_yields_measurable_savings() {
    // Repetitive text + dead objects + no prior stream compression: the
    // structural pass must win here.
    let input = Bytes::from(build_pdf(8, 30));
    let outcome = PdfCompactor::new().compact(&input).await.unwrap();

    assert!(
        outcome.compacted_size < outcome.original_size,
        "expected savings, got {} -> {}",
        outcome.original_size,
        outcome.compacted_size
    );
    assert!(outcome.ratio > 0);
    assert_eq!(
        outcome.ratio,
        compression_ratio(outcome.original_size, outcome.compacted_size)
    );
}

#[tokio::test]
async fn tiny_input_may_report_nonpositive_ratio() {
    // A minimal document can legitimately grow; only the formula is promised.
    let input = Bytes::from(build_pdf(1, 0));
    let outcome = PdfCompactor::new().compact(&input).await.unwrap();

    assert_eq!(
        outcome.ratio,
        compression_ratio(outcome.original_size, outcome.compacted_size)
    );
}

// ── Malformed input ──────────────────────────────────────────────────────────

#[tokio::test]
async fn zero_byte_input_is_malformed() {
    let err = PdfCompactor::new()
        .compact(&Bytes::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::MalformedDocument(_)), "{err:?}");
}

#[tokio::test]
async fn junk_bytes_are_malformed() {
    let err = PdfCompactor::new()
        .compact(&Bytes::from_static(b"0123456789"))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::MalformedDocument(_)), "{err:?}");
}

// ── Progress milestones ──────────────────────────────────────────────────────

#[tokio::test]
async fn stages_are_reported_in_order() {
    let seen: Arc<Mutex<Vec<CompactionStage>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let compactor = PdfCompactor::new().on_stage(move |stage| {
        sink.lock().unwrap().push(stage);
    });
    let input = Bytes::from(build_pdf(1, 0));
    compactor.compact(&input).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            CompactionStage::ParseStart,
            CompactionStage::ParseDone,
            CompactionStage::OptimizeDone,
            CompactionStage::Serialized,
        ]
    );
}

#[tokio::test]
async fn no_stages_on_parse_failure_past_start() {
    let seen: Arc<Mutex<Vec<CompactionStage>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let compactor = PdfCompactor::new().on_stage(move |stage| {
        sink.lock().unwrap().push(stage);
    });
    let _ = compactor.compact(&Bytes::from_static(b"nope")).await;

    assert_eq!(*seen.lock().unwrap(), vec![CompactionStage::ParseStart]);
}

// ── Helper ───────────────────────────────────────────────────────────────────

#[test]
fn compression_ratio_handles_edge_inputs() {
    assert_eq!(compression_ratio(0, 0), 0);
    assert_eq!(compression_ratio(100, 0), 100);
    assert_eq!(compression_ratio(200, 300), -50);
}

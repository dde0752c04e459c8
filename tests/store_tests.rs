// Collaborator implementation tests: the in-memory stores used by tests and
// the filesystem stores used by the CLI.

use bytes::Bytes;
use studyhub_intake::{
    BlobStore, Category, FsBlobStore, IntakeError, JsonNoteStore, MemoryNoteStore, NewNote,
    NoteFilter, NoteMetadata, NoteStore, NoteUpdate,
};

fn sample_note(subject: &str, semester: &str, category: Category) -> NewNote {
    NewNote {
        metadata: NoteMetadata {
            uploader_name: "Priya".into(),
            roll_number: "20230001".into(),
            course: "BCA".into(),
            branch: "Computer Science".into(),
            subject: subject.into(),
            semester: semester.into(),
            category,
        },
        file_url: "memory://notes/test.pdf".into(),
        file_name: "test.pdf".into(),
        original_size: 1000,
        compacted_size: 800,
        compression_ratio: 20,
    }
}

// ── MemoryNoteStore ──────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_starts_unpublished_and_update_publishes() {
    let store = MemoryNoteStore::new();
    let record = store
        .insert(sample_note("Math", "5", Category::Basic))
        .await
        .unwrap();
    assert!(!record.published);

    store
        .update(&record.id, NoteUpdate::publish(true))
        .await
        .unwrap();

    let published = store.query(&NoteFilter::published_only()).await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, record.id);
}

#[tokio::test]
async fn query_filters_combine() {
    let store = MemoryNoteStore::new();
    store.insert(sample_note("Math", "5", Category::Basic)).await.unwrap();
    store.insert(sample_note("Math", "3", Category::Advanced)).await.unwrap();
    store.insert(sample_note("Physics", "5", Category::Basic)).await.unwrap();

    let filter = NoteFilter {
        subject: Some("math".into()),
        semester: Some("5".into()),
        ..Default::default()
    };
    let hits = store.query(&filter).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata.semester, "5");

    let search = NoteFilter {
        search: Some("phys".into()),
        ..Default::default()
    };
    assert_eq!(store.query(&search).await.unwrap().len(), 1);

    let category = NoteFilter {
        category: Some(Category::Advanced),
        ..Default::default()
    };
    assert_eq!(store.query(&category).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_unknown_id_is_not_found() {
    let store = MemoryNoteStore::new();
    let err = store.delete("no-such-id").await.unwrap_err();
    assert!(matches!(err, IntakeError::NotFound(_)), "{err:?}");
}

// ── FsBlobStore ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn fs_blob_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path()).await.unwrap();

    let blob_ref = store
        .put("notes/Math-5-1.pdf", Bytes::from_static(b"%PDF-1.5"), "application/pdf")
        .await
        .unwrap();
    assert_eq!(blob_ref.key, "notes/Math-5-1.pdf");

    let url = store.download_url(&blob_ref).await.unwrap();
    assert!(url.starts_with("file://"));

    let written = std::fs::read(dir.path().join("notes/Math-5-1.pdf")).unwrap();
    assert_eq!(written, b"%PDF-1.5");

    store.delete("notes/Math-5-1.pdf").await.unwrap();
    assert!(store.download_url(&blob_ref).await.is_err());
}

#[tokio::test]
async fn fs_blob_rejects_traversal_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path()).await.unwrap();

    let err = store
        .put("../escape.pdf", Bytes::from_static(b"x"), "application/pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::StorageWriteFailed(_)), "{err:?}");

    let err = store
        .put("/absolute.pdf", Bytes::from_static(b"x"), "application/pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::StorageWriteFailed(_)), "{err:?}");
}

// ── JsonNoteStore ────────────────────────────────────────────────────────────

#[tokio::test]
async fn json_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");

    let store = JsonNoteStore::open(&path).await.unwrap();
    let record = store
        .insert(sample_note("Math", "5", Category::Reference))
        .await
        .unwrap();
    store.update(&record.id, NoteUpdate::publish(true)).await.unwrap();
    drop(store);

    let reopened = JsonNoteStore::open(&path).await.unwrap();
    let records = reopened.query(&NoteFilter::default()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, record.id);
    assert!(records[0].published);
    assert_eq!(records[0].metadata.category, Category::Reference);

    reopened.delete(&record.id).await.unwrap();
    let reopened_again = JsonNoteStore::open(&path).await.unwrap();
    assert!(reopened_again.query(&NoteFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn json_store_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let err = JsonNoteStore::open(&path).await.unwrap_err();
    assert!(matches!(err, IntakeError::MetadataWriteFailed(_)), "{err:?}");
}

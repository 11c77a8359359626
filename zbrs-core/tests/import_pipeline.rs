//! End-to-end import tests against on-disk fixture repositories.
//!
//! Each test lays out a repository in a temporary directory and imports it
//! through its local path, which the pipeline resolves to `file://` URLs.

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tempfile::TempDir;
use zbrs_core::storage::RepositoryKind;
use zbrs_core::{
    calculate_checksum, ImportOptions, ImportProgress, ImportStage, Importer, IssueCode,
    MemoryStore, NoopProgress, PipelineConfig, RepositoryStore,
};

fn book(id: &str, name: &str, order: u32, testament: &str, text: &str) -> Value {
    json!({
        "book": {
            "id": id,
            "name": name,
            "abbreviation": &name[..3],
            "order": order,
            "testament": testament,
            "chapters_count": 1,
            "verses_count": 1
        },
        "chapters": [{ "number": 1, "verses": [{ "number": 1, "text": text }] }]
    })
}

fn write_json(path: &Path, value: &Value) -> Vec<u8> {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let bytes = serde_json::to_vec_pretty(value).unwrap();
    std::fs::write(path, &bytes).unwrap();
    bytes
}

/// Write a two-book translation (Genesis, Matthew) and return the manifest bytes.
fn write_translation(dir: &Path, id: &str, technical_checksum: bool) -> Vec<u8> {
    let genesis = write_json(
        &dir.join("books/01-genesis.json"),
        &book("gen", "Genesis", 1, "old", "In the beginning"),
    );
    let matthew = write_json(
        &dir.join("books/40-matthew.json"),
        &book("mat", "Matthew", 40, "new", "The book of the generation"),
    );

    let mut technical = json!({ "encoding": "UTF-8" });
    if technical_checksum {
        technical["checksum"] = json!(calculate_checksum(id.as_bytes()));
    }

    write_json(
        &dir.join("manifest.json"),
        &json!({
            "zbrs_version": "1.0",
            "repository": {
                "id": id,
                "name": format!("{} Bible", id.to_uppercase()),
                "version": "1.0.0",
                "language": { "code": "en", "name": "English", "direction": "ltr" },
                "translation": { "type": "formal", "year": 1611 }
            },
            "content": {
                "books_count": 2,
                "testament": { "old": 1, "new": 1 },
                "books": [
                    { "path": "books/01-genesis.json", "checksum": calculate_checksum(&genesis) },
                    { "path": "books/40-matthew.json", "checksum": calculate_checksum(&matthew) }
                ]
            },
            "technical": technical
        }),
    )
}

fn write_parent(root: &Path, translations: &[(&str, &[u8])]) {
    let references: Vec<Value> = translations
        .iter()
        .map(|(id, manifest)| {
            json!({
                "id": id,
                "name": id.to_uppercase(),
                "directory": id,
                "language": "en",
                "status": "active",
                "checksum": calculate_checksum(manifest)
            })
        })
        .collect();

    write_json(
        &root.join("manifest.json"),
        &json!({
            "zbrs_version": "1.0",
            "repository": {
                "id": "english-bibles",
                "name": "English Bibles",
                "version": "1.0.0",
                "type": "parent"
            },
            "publisher": { "name": "Example Bible Society", "url": "https://bibles.example.org" },
            "translations": references,
            "technical": { "encoding": "UTF-8" }
        }),
    );
}

fn importer() -> (Arc<MemoryStore>, Importer) {
    let store = Arc::new(MemoryStore::new());
    let importer = Importer::from_config(&PipelineConfig::default(), store.clone()).unwrap();
    (store, importer)
}

fn location(dir: &TempDir) -> String {
    dir.path().to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_translation_import_succeeds() {
    let dir = TempDir::new().unwrap();
    write_translation(dir.path(), "kjv", true);
    let (store, importer) = importer();

    let result = importer
        .import_repository(&ImportOptions::new(location(&dir)), &NoopProgress)
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.books_imported, 2);
    assert!(result.errors.is_empty());
    assert_eq!(result.repository_id.as_deref(), Some("kjv"));
    assert_eq!(result.translations_imported, vec!["kjv"]);

    let record = store.get_repository("kjv").await.unwrap().unwrap();
    assert_eq!(record.kind, RepositoryKind::Parent);
    assert_eq!(record.parent_id, None);
    assert_eq!(record.language.as_deref(), Some("en"));

    let links = store.get_translations("kjv").await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].translation_id, "kjv");

    let genesis = store.find_book("kjv", "gen").await.unwrap().unwrap();
    let verses = store.get_chapter(genesis.row_id, 1).await.unwrap();
    assert_eq!(verses[0].text, "In the beginning");
}

#[tokio::test]
async fn test_unreachable_book_is_skipped() {
    let dir = TempDir::new().unwrap();
    write_translation(dir.path(), "kjv", true);
    std::fs::remove_file(dir.path().join("books/40-matthew.json")).unwrap();
    let (store, importer) = importer();

    let result = importer
        .import_repository(&ImportOptions::new(location(&dir)), &NoopProgress)
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.books_imported, 1);
    let skipped: Vec<_> = result
        .warnings
        .iter()
        .filter(|w| w.code == IssueCode::BookSkipped)
        .collect();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].message.contains("40-matthew.json"));
    assert_eq!(store.books_for("kjv").len(), 1);
}

#[tokio::test]
async fn test_parent_import_skips_invalid_translation() {
    let root = TempDir::new().unwrap();
    let kjv = write_translation(&root.path().join("kjv"), "kjv", true);
    let web = write_translation(&root.path().join("web"), "web", false);
    write_parent(root.path(), &[("kjv", kjv.as_slice()), ("web", web.as_slice())]);
    let (store, importer) = importer();

    let result = importer
        .import_repository(&ImportOptions::new(location(&root)), &NoopProgress)
        .await;

    assert!(!result.success);
    assert_eq!(result.translations_imported, vec!["kjv"]);
    assert_eq!(result.translations_skipped, vec!["web"]);
    assert!(result
        .errors
        .iter()
        .any(|e| e.code == IssueCode::MissingChecksum));
    assert_eq!(result.books_imported, 2);

    let parent = store.get_repository("english-bibles").await.unwrap().unwrap();
    assert_eq!(parent.kind, RepositoryKind::Parent);
    let child = store.get_repository("kjv").await.unwrap().unwrap();
    assert_eq!(child.kind, RepositoryKind::Translation);
    assert_eq!(child.parent_id.as_deref(), Some("english-bibles"));
    assert!(store.get_repository("web").await.unwrap().is_none());

    let links = store.get_translations("english-bibles").await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].directory, "kjv");
}

#[tokio::test]
async fn test_selective_import() {
    let root = TempDir::new().unwrap();
    let kjv = write_translation(&root.path().join("kjv"), "kjv", true);
    let web = write_translation(&root.path().join("web"), "web", true);
    write_parent(root.path(), &[("kjv", kjv.as_slice()), ("web", web.as_slice())]);
    let (store, importer) = importer();

    let selected = vec!["web".to_string(), "asv".to_string()];
    let result = importer
        .import_repository_hierarchical(
            &location(&root),
            &selected,
            &ImportOptions::new(location(&root)),
            &NoopProgress,
        )
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.translations_imported, vec!["web"]);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.code == IssueCode::TranslationNotFound));
    assert!(store.get_repository("kjv").await.unwrap().is_none());
}

#[tokio::test]
async fn test_reimport_with_overwrite_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_translation(dir.path(), "kjv", true);
    let (store, importer) = importer();
    let options = ImportOptions::new(location(&dir)).overwrite(true);

    let first = importer.import_repository(&options, &NoopProgress).await;
    let second = importer.import_repository(&options, &NoopProgress).await;

    assert!(first.success && second.success);
    assert_eq!(store.repository_count(), 1);
    assert_eq!(store.books_for("kjv").len(), 2);
    assert_eq!(store.verse_count("kjv"), 2);
}

#[tokio::test]
async fn test_reimport_without_overwrite_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_translation(dir.path(), "kjv", true);
    let (store, importer) = importer();
    let options = ImportOptions::new(location(&dir));

    assert!(importer.import_repository(&options, &NoopProgress).await.success);
    let second = importer.import_repository(&options, &NoopProgress).await;

    assert!(!second.success);
    assert!(second
        .errors
        .iter()
        .any(|e| e.code == IssueCode::RepositoryExists));
    assert_eq!(store.books_for("kjv").len(), 2);
}

#[tokio::test]
async fn test_book_checksum_mismatch_aborts_translation() {
    let dir = TempDir::new().unwrap();
    write_translation(dir.path(), "kjv", true);
    write_json(
        &dir.path().join("books/01-genesis.json"),
        &book("gen", "Genesis", 1, "old", "Tampered text"),
    );
    let (store, importer) = importer();

    let result = importer
        .import_repository(&ImportOptions::new(location(&dir)), &NoopProgress)
        .await;

    assert!(!result.success);
    assert_eq!(result.books_imported, 0);
    assert!(result
        .errors
        .iter()
        .any(|e| e.code == IssueCode::ChecksumMismatch));
    assert!(store.get_repository("kjv").await.unwrap().is_none());

    let unchecked = importer
        .import_repository(
            &ImportOptions::new(location(&dir)).checksums(false),
            &NoopProgress,
        )
        .await;
    assert!(unchecked.success, "errors: {:?}", unchecked.errors);
    assert_eq!(unchecked.books_imported, 2);
}

#[tokio::test]
async fn test_failed_overwrite_keeps_previous_content() {
    let dir = TempDir::new().unwrap();
    write_translation(dir.path(), "kjv", true);
    let (store, importer) = importer();

    let first = importer
        .import_repository(&ImportOptions::new(location(&dir)), &NoopProgress)
        .await;
    assert!(first.success, "errors: {:?}", first.errors);
    assert_eq!(store.books_for("kjv").len(), 2);
    let verses = store.verse_count("kjv");

    write_json(
        &dir.path().join("books/40-matthew.json"),
        &book("mat", "Matthew", 40, "new", "Tampered text"),
    );
    let second = importer
        .import_repository(
            &ImportOptions::new(location(&dir)).overwrite(true),
            &NoopProgress,
        )
        .await;

    assert!(!second.success);
    assert!(second
        .errors
        .iter()
        .any(|e| e.code == IssueCode::ChecksumMismatch));
    assert_eq!(store.books_for("kjv").len(), 2);
    assert_eq!(store.verse_count("kjv"), verses);
}

#[tokio::test]
async fn test_parent_reference_checksum_mismatch() {
    let root = TempDir::new().unwrap();
    write_translation(&root.path().join("kjv"), "kjv", true);
    write_parent(root.path(), &[("kjv", &b"not the manifest"[..])]);
    let (_store, importer) = importer();

    let result = importer
        .import_repository(&ImportOptions::new(location(&root)), &NoopProgress)
        .await;

    assert!(!result.success);
    assert_eq!(result.translations_skipped, vec!["kjv"]);
    assert!(result
        .errors
        .iter()
        .any(|e| e.code == IssueCode::ChecksumMismatch));
}

#[tokio::test]
async fn test_books_discovered_from_directory() {
    let dir = TempDir::new().unwrap();
    write_translation(dir.path(), "kjv", true);
    let manifest_path = dir.path().join("manifest.json");
    let mut manifest: Value =
        serde_json::from_slice(&std::fs::read(&manifest_path).unwrap()).unwrap();
    manifest["content"].as_object_mut().unwrap().remove("books");
    write_json(&manifest_path, &manifest);
    let (store, importer) = importer();

    let result = importer
        .import_repository(&ImportOptions::new(location(&dir)), &NoopProgress)
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.books_imported, 2);
    let orders: Vec<u32> = store.books_for("kjv").iter().map(|b| b.order).collect();
    assert_eq!(orders, vec![1, 40]);
}

#[tokio::test]
async fn test_missing_manifest_reports_network_error() {
    let dir = TempDir::new().unwrap();
    let (_store, importer) = importer();

    let result = importer
        .import_repository(&ImportOptions::new(location(&dir)), &NoopProgress)
        .await;

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code, IssueCode::NetworkError);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_completes() {
    let root = TempDir::new().unwrap();
    let kjv = write_translation(&root.path().join("kjv"), "kjv", true);
    let web = write_translation(&root.path().join("web"), "web", true);
    write_parent(root.path(), &[("kjv", kjv.as_slice()), ("web", web.as_slice())]);
    let (_store, importer) = importer();

    let events: Mutex<Vec<ImportProgress>> = Mutex::new(Vec::new());
    let sink = |p: ImportProgress| events.lock().unwrap().push(p);
    let result = importer
        .import_repository(&ImportOptions::new(location(&root)), &sink)
        .await;
    assert!(result.success, "errors: {:?}", result.errors);

    let events = events.into_inner().unwrap();
    assert_eq!(events.first().unwrap().stage, ImportStage::Discovering);
    assert!(events.windows(2).all(|w| w[0].progress <= w[1].progress));
    let last = events.last().unwrap();
    assert_eq!(last.stage, ImportStage::Complete);
    assert_eq!(last.progress, 100);
    assert!(events
        .iter()
        .any(|e| e.stage == ImportStage::Downloading && e.total_books == Some(2)));
}

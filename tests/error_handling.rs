//! Error handling and edge case tests.

use collection_store::{
    FieldSchema, FieldType, QueryParams, Record, Store, StoreConfig, StoreError,
};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> StoreConfig {
    StoreConfig {
        path: dir.path().join("store"),
        ..Default::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn book_schema() -> FieldSchema {
    FieldSchema::new("Book")
        .with_field("Title", FieldType::String)
        .with_field("Isbn", FieldType::String)
        .with_key("Isbn")
}

// --- Store Errors ---

#[test]
fn test_open_nonexistent_store() {
    let dir = TempDir::new().unwrap();

    let result = Store::open_or_create(StoreConfig {
        path: dir.path().join("nonexistent"),
        create_if_missing: false,
        ..Default::default()
    });

    assert!(matches!(result, Err(StoreError::NotInitialized)));
}

#[test]
fn test_concurrent_store_access() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let _store1 = Store::create(config.clone()).unwrap();

    // Second store should fail with lock error
    let result = Store::open(config);
    assert!(matches!(result, Err(StoreError::Locked)));
}

#[test]
fn test_path_like_class_name_rejected() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();

    for name in ["", "a/b", "a\\b", "..", ".hidden"] {
        let result = store.collection(FieldSchema::new(name));
        assert!(matches!(result, Err(StoreError::InvalidSchema(_))), "{}", name);
    }
}

// --- Document Errors ---

#[test]
fn test_missing_document_reads_empty() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    let books = store.collection(book_schema()).unwrap();

    assert_eq!(books.count(), 0);
    assert!(books.get("1").is_none());
    assert!(books.get_all(&QueryParams::new()).unwrap().is_empty());
    assert!(!store.path().join("Books.json").exists());

    books
        .add(record(json!({"Title": "Dune", "Isbn": "1"})))
        .unwrap();
    assert!(store.path().join("Books.json").exists());
}

#[test]
fn test_corrupt_document_reads_empty_but_blocks_writes() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    let path = store.path().join("Books.json");
    fs::write(&path, b"[{\"Id\": 1, \"Title\": ").unwrap();

    let books = store.collection(book_schema()).unwrap();
    assert_eq!(books.count(), 0);
    assert!(store.registry().cache().find("Books").is_none());

    let result = books.add(record(json!({"Title": "Dune", "Isbn": "1"})));
    assert!(matches!(result, Err(StoreError::Corruption { .. })));

    // document left untouched
    assert_eq!(fs::read(&path).unwrap(), b"[{\"Id\": 1, \"Title\": ");
}

#[test]
fn test_document_repaired_on_disk_is_picked_up() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    let path = store.path().join("Books.json");
    fs::write(&path, b"{not json").unwrap();

    let books = store.collection(book_schema()).unwrap();
    assert_eq!(books.count(), 0);

    fs::write(&path, br#"[{"Id": 4, "Title": "Emma", "Isbn": "9"}]"#).unwrap();
    assert_eq!(books.count(), 1);

    let added = books
        .add(record(json!({"Title": "Dune", "Isbn": "1"})))
        .unwrap();
    assert_eq!(added.value["Id"], json!(5));
}

#[test]
fn test_non_array_document_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    fs::write(store.path().join("Books.json"), br#"{"Id": 1}"#).unwrap();

    let books = store.collection(book_schema()).unwrap();
    assert!(matches!(books.remove("1"), Err(StoreError::Corruption { .. })));
}

// --- Query Errors ---

#[test]
fn test_unknown_sort_field_returns_messages() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    let books = store.collection(book_schema()).unwrap();
    books
        .add(record(json!({"Title": "Dune", "Isbn": "1"})))
        .unwrap();

    let err = books
        .get_all(&QueryParams::new().with("sort", "Bogus"))
        .unwrap_err();
    let messages = err.query_messages().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Bogus"));
    assert!(messages[0].contains("Book"));
}

#[test]
fn test_all_query_errors_collected() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    let books = store.collection(book_schema()).unwrap();

    let params = QueryParams::from_pairs([
        ("Author", "x"),
        ("offset", "1"),
        ("keywords", "a"),
        ("keywords", "b"),
        ("Title", ""),
    ]);
    let err = books.get_all(&params).unwrap_err();
    let messages = err.query_messages().unwrap();
    assert_eq!(messages.len(), 4, "{:?}", messages);
    assert!(err.to_string().starts_with("Invalid query: "));
}

// --- Mutation Outcomes ---

#[test]
fn test_update_keeps_stored_record_on_conflict() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    let books = store.collection(book_schema()).unwrap();
    books.add(record(json!({"Title": "Dune", "Isbn": "1"}))).unwrap();
    books.add(record(json!({"Title": "Emma", "Isbn": "2"}))).unwrap();

    let result = books
        .update("2", record(json!({"Title": "Emma", "Isbn": "1"})))
        .unwrap();
    assert!(result.state.in_conflict);
    assert!(result.state.is_valid);
    assert_eq!(result.state.errors, vec!["Unicity conflict on [Isbn]...".to_string()]);
    assert_eq!(result.value.unwrap()["Isbn"], json!("2"));
}

#[test]
fn test_invalid_update_reports_fields() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    let books = store.collection(book_schema()).unwrap();
    books.add(record(json!({"Title": "Dune", "Isbn": "1"}))).unwrap();

    let result = books.update("1", record(json!({"Title": 3}))).unwrap();
    assert!(!result.state.is_valid);
    assert_eq!(result.state.errors.len(), 2);
    assert_eq!(books.get("1").unwrap()["Title"], json!("Dune"));
}

#[test]
fn test_unicode_values_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    let books = store.collection(book_schema()).unwrap();
    books
        .add(record(json!({"Title": "Ἰλιάς 🏛️", "Isbn": "α-1"})))
        .unwrap();
    drop(books);
    drop(store);

    let store = Store::open(test_config(&dir)).unwrap();
    let books = store.collection(book_schema()).unwrap();
    assert_eq!(books.get("1").unwrap()["Title"], json!("Ἰλιάς 🏛️"));
}

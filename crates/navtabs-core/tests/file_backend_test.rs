//! JSON-file storage area tests

use navtabs_core::storage::{
    FileBackend, Keys, QuotaLimits, RecordStore, StorageArea, StorageBackend,
};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

fn batch(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let backend = FileBackend::new(dir.path(), StorageArea::Local);
    backend
        .set(batch(&[("a", json!(1)), ("b", json!(["x", "y"]))]))
        .await
        .expect("Failed to write");
    assert!(backend.path().ends_with("local.json"));

    let reopened = FileBackend::new(dir.path(), StorageArea::Local);
    let items = reopened.get(Keys::All).await.expect("Failed to read");
    assert_eq!(items.len(), 2);
    assert_eq!(items["b"], json!(["x", "y"]));

    // areas are separate files
    let synced = FileBackend::new(dir.path(), StorageArea::Synced);
    assert!(synced.get(Keys::All).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_directory_is_created_on_write() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("profile").join("data");

    let backend = FileBackend::new(&nested, StorageArea::Synced);
    assert!(backend.get(Keys::All).await.unwrap().is_empty());

    backend.set(batch(&[("k", json!("v"))])).await.unwrap();
    assert!(nested.join("synced.json").exists());
}

#[tokio::test]
async fn test_remove_and_clear() {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::new(dir.path(), StorageArea::Local);
    backend
        .set(batch(&[("a", json!(1)), ("b", json!(2)), ("c", json!(3))]))
        .await
        .unwrap();

    backend
        .remove(&["a".to_string(), "missing".to_string()])
        .await
        .unwrap();
    let keys = vec!["a".to_string(), "b".to_string()];
    let items = backend.get(Keys::Many(&keys)).await.unwrap();
    assert_eq!(items.len(), 1);
    assert!(items.contains_key("b"));

    backend.clear().await.unwrap();
    assert!(backend.get(Keys::All).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_quota_rejection_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::new(dir.path(), StorageArea::Synced);
    backend.set(batch(&[("keep", json!(true))])).await.unwrap();

    let err = backend
        .set(batch(&[("big", json!("x".repeat(9_000)))]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "QUOTA_EXCEEDED");

    let items = backend.get(Keys::All).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items["keep"], json!(true));
}

#[tokio::test]
async fn test_change_events_name_written_keys() {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::new(dir.path(), StorageArea::Local);
    let mut rx = backend.subscribe();

    backend
        .set(batch(&[("x", json!(1)), ("y", json!(2))]))
        .await
        .unwrap();
    let change = rx.recv().await.expect("Expected a change event");
    assert_eq!(change.area, StorageArea::Local);
    assert_eq!(change.changed_keys, vec!["x".to_string(), "y".to_string()]);

    backend.clear().await.unwrap();
    let change = rx.recv().await.unwrap();
    assert_eq!(change.changed_keys.len(), 2);
}

#[tokio::test]
async fn test_corrupt_file_is_a_serialization_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("local.json"), b"{not json").unwrap();

    let backend = FileBackend::new(dir.path(), StorageArea::Local);
    let err = backend.get(Keys::All).await.unwrap_err();
    assert_eq!(err.code(), "PARSE_ERROR");
}

#[tokio::test]
async fn test_chunked_record_on_disk() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::default();
    let data = json!({"notes": "n".repeat(20_000)});

    {
        let storage = FileBackend::storage(dir.path());
        let outcome = store.save("notes", &data, storage.synced()).await.unwrap();
        assert_eq!(outcome.chunk_count, 3);
    }

    let storage = FileBackend::storage(dir.path());
    assert_eq!(store.load("notes", storage.synced()).await.unwrap(), Some(data));
    assert!(storage.local().get(Keys::All).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_explicit_limits() {
    let dir = TempDir::new().unwrap();
    let limits = QuotaLimits {
        max_items: Some(1),
        ..QuotaLimits::unlimited()
    };
    let backend = FileBackend::with_limits(dir.path(), StorageArea::Local, limits);

    backend.set(batch(&[("one", json!(1))])).await.unwrap();
    // overwriting an existing key does not add an item
    backend.set(batch(&[("one", json!(2))])).await.unwrap();
    assert!(backend.set(batch(&[("two", json!(2))])).await.is_err());
}

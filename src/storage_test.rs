use super::*;

#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct Sample {
    name: String,
    count: u32,
}

// =============================================================================
// MemoryStore
// =============================================================================

#[test]
fn memory_store_set_get_remove() {
    let store = MemoryStore::new();
    assert_eq!(store.get("k").unwrap(), None);

    store.set("k", "v1").unwrap();
    store.set("k", "v2").unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));

    store.remove("k").unwrap();
    assert_eq!(store.get("k").unwrap(), None);
}

#[test]
fn memory_store_remove_absent_key_is_ok() {
    let store = MemoryStore::new();
    assert!(store.remove("missing").is_ok());
}

// =============================================================================
// JSON helpers
// =============================================================================

#[test]
fn save_then_load_json() {
    let store = MemoryStore::new();
    let sample = Sample { name: "lab".into(), count: 3 };
    save_json(&store, "sample", &sample).unwrap();
    assert_eq!(load_json::<Sample>(&store, "sample"), Some(sample));
}

#[test]
fn load_json_malformed_is_none() {
    let store = MemoryStore::new();
    store.set("sample", "{not json").unwrap();
    assert_eq!(load_json::<Sample>(&store, "sample"), None);
}

#[test]
fn load_json_wrong_shape_is_none() {
    let store = MemoryStore::new();
    store.set("sample", r#"["a","b"]"#).unwrap();
    assert_eq!(load_json::<Sample>(&store, "sample"), None);
}

#[test]
fn load_json_absent_is_none() {
    let store = MemoryStore::new();
    assert_eq!(load_json::<Sample>(&store, "sample"), None);
}

// =============================================================================
// FileStore
// =============================================================================

#[test]
fn file_store_missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("store.json"));
    assert_eq!(store.get(SESSION_KEY).unwrap(), None);
}

#[test]
fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.json");

    FileStore::new(&path).set(TOKEN_KEY, "tok-123").unwrap();

    let reopened = FileStore::new(&path);
    assert_eq!(reopened.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-123"));
}

#[test]
fn file_store_remove_keeps_other_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("store.json"));
    store.set(TOKEN_KEY, "tok").unwrap();
    store.set(SESSION_KEY, "{}").unwrap();

    store.remove(SESSION_KEY).unwrap();

    assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok"));
}

#[test]
fn file_store_remove_absent_key_does_not_create_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let store = FileStore::new(&path);

    store.remove(SESSION_KEY).unwrap();

    assert!(!path.exists());
}

#[test]
fn file_store_corrupt_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "garbage").unwrap();

    let store = FileStore::new(&path);
    assert!(matches!(store.get(SESSION_KEY), Err(StorageError::Encoding(_))));
    assert_eq!(load_json::<Sample>(&store, SESSION_KEY), None);
}

use super::*;

// =========================================================================
// KEY VALIDATION
// =========================================================================

#[test]
fn object_key_is_valid_and_prefixed() {
    let key = object_key();
    assert!(key.starts_with(OBJECT_PREFIX));
    assert!(is_valid_key(&key));
}

#[test]
fn object_keys_are_unique() {
    assert_ne!(object_key(), object_key());
}

#[test]
fn is_valid_key_rejects_bad_shapes() {
    assert!(!is_valid_key(""));
    assert!(!is_valid_key("images/"));
    assert!(!is_valid_key("avatars/abc"));
    assert!(!is_valid_key("images"));
    assert!(!is_valid_key("images/a/b"));
    assert!(!is_valid_key("images/../secrets"));
    assert!(!is_valid_key("images/.hidden"));
    assert!(!is_valid_key("/images/abc"));
}

#[test]
fn is_valid_key_accepts_uuid_names() {
    assert!(is_valid_key("images/3f2b8c1a-9a7d-4f31-b2de-8a2e5c9f0d11"));
    assert!(is_valid_key("images/plain_name.png"));
}

// =========================================================================
// IN-MEMORY STORE
// =========================================================================

#[tokio::test]
async fn in_memory_put_get_round_trip() {
    let store = InMemoryObjectStore::new();
    let key = object_key();
    store.put(&key, b"bytes").await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), b"bytes");
}

#[tokio::test]
async fn in_memory_get_missing_is_not_found() {
    let store = InMemoryObjectStore::new();
    let err = store.get("images/missing").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn in_memory_put_replaces_existing() {
    let store = InMemoryObjectStore::new();
    let key = object_key();
    store.put(&key, b"one").await.unwrap();
    store.put(&key, b"two").await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), b"two");
}

#[tokio::test]
async fn in_memory_delete_is_idempotent() {
    let store = InMemoryObjectStore::new();
    let key = object_key();
    store.put(&key, b"bytes").await.unwrap();
    store.delete(&key).await.unwrap();
    store.delete(&key).await.unwrap();
    assert!(matches!(store.get(&key).await, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn in_memory_rejects_invalid_keys() {
    let store = InMemoryObjectStore::new();
    assert!(matches!(store.put("nope", b"x").await, Err(StorageError::InvalidKey(_))));
    assert!(matches!(store.get("nope").await, Err(StorageError::InvalidKey(_))));
    assert!(matches!(store.delete("nope").await, Err(StorageError::InvalidKey(_))));
}

// =========================================================================
// FILESYSTEM STORE
// =========================================================================

fn scratch_root() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("fotomat-storage-test-{}", Uuid::new_v4()))
}

#[tokio::test]
async fn fs_put_get_delete_round_trip() {
    let root = scratch_root();
    let store = FsObjectStore::new(&root);
    let key = object_key();

    store.put(&key, b"pixels").await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), b"pixels");

    store.delete(&key).await.unwrap();
    assert!(matches!(store.get(&key).await, Err(StorageError::NotFound(_))));

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn fs_get_missing_is_not_found() {
    let root = scratch_root();
    let store = FsObjectStore::new(&root);
    let err = store.get("images/never-written").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn fs_rejects_traversal_keys() {
    let root = scratch_root();
    let store = FsObjectStore::new(&root);
    let err = store.put("images/../escape", b"x").await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidKey(_)));
    let _ = std::fs::remove_dir_all(&root);
}

use nsgen_storage::*;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_path_traversal_blocked() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    assert!(storage.resolve("../etc/passwd").is_err());
    assert!(storage.resolve("foo/../../bar").is_err());
    assert!(storage.resolve("/etc/passwd").is_err());
}

#[tokio::test]
async fn test_write_read_roundtrip() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    let payload = b"PK\x03\x04 archive bytes";
    storage.write("downloads/abc.zip", payload).await.unwrap();
    assert!(storage.exists("downloads/abc.zip").unwrap());

    let data = storage.read("downloads/abc.zip").await.unwrap();
    assert_eq!(data, payload);
}

#[tokio::test]
async fn test_write_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    storage.write("abc.zip", b"one").await.unwrap();
    storage.write("abc.zip", b"two").await.unwrap();

    let names: Vec<_> = std::fs::read_dir(storage.root())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["abc.zip".to_owned()]);
    assert_eq!(storage.read("abc.zip").await.unwrap(), b"two");
}

#[tokio::test]
async fn test_delete_and_exists() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    storage.write("file.zip", b"x").await.unwrap();
    assert!(storage.exists("file.zip").unwrap());

    storage.delete("file.zip").await.unwrap();
    assert!(!storage.exists("file.zip").unwrap());

    let err = storage.delete("file.zip").await.expect_err("second delete must fail");
    assert!(matches!(err, StorageError::FileNotFound { .. }));

    // discard tolerates the missing file
    storage.discard("file.zip").await;
}

#[tokio::test]
async fn test_read_missing_returns_file_not_found() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    let err = storage.read("missing.zip").await.expect_err("expected error");
    match err {
        StorageError::FileNotFound { .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_purge_respects_retention() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder()
        .root(temp.path())
        .retention(Duration::from_millis(50))
        .connect()
        .await
        .unwrap();

    storage.write("old.zip", b"x").await.unwrap();
    assert_eq!(storage.purge_stale().await, 0, "fresh files are kept");

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(storage.purge_stale().await, 1);
    assert!(!storage.exists("old.zip").unwrap());
}

#[tokio::test]
async fn test_connect_without_create_requires_root() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope");

    let err = Storage::builder().root(&missing).create(false).connect().await;
    assert!(matches!(err, Err(StorageError::Io { .. })));
}

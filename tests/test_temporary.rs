//! Tests for spillover file allocation and release

use spillway::storage::TemporaryStore;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("spillway-store-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_generated_names_are_unique() {
    let dir = scratch_dir("names");
    let store = TemporaryStore::new(&dir);
    let names: HashSet<_> = (0..100).map(|_| store.generate_name()).collect();
    assert_eq!(names.len(), 100);
    assert!(names.iter().all(|n| n.starts_with(&dir)));
}

#[test]
fn test_concurrent_name_generation() {
    let store = Arc::new(TemporaryStore::new(scratch_dir("threads")));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || (0..50).map(|_| store.generate_name()).collect::<Vec<_>>())
        })
        .collect();

    let mut names = HashSet::new();
    for handle in handles {
        names.extend(handle.join().unwrap());
    }
    assert_eq!(names.len(), 400);
}

#[tokio::test]
async fn test_allocate_append_release() {
    let dir = scratch_dir("lifecycle");
    let store = TemporaryStore::new(&dir);

    let mut sink = store.allocate().await.unwrap();
    sink.append(b"hello ").await.unwrap();
    sink.append(b"world").await.unwrap();
    sink.flush().await.unwrap();
    assert_eq!(sink.written(), 11);

    let path = sink.path().to_path_buf();
    assert_eq!(std::fs::read(&path).unwrap(), b"hello world");

    store.release(sink).await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_close_keeps_file() {
    let dir = scratch_dir("close");
    let store = TemporaryStore::new(&dir);

    let mut sink = store.allocate().await.unwrap();
    sink.append(b"kept").await.unwrap();
    let path = sink.close().await.unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"kept");
    std::fs::remove_file(path).unwrap();
}

#[tokio::test]
async fn test_allocate_fails_for_missing_directory() {
    let store = TemporaryStore::new(scratch_dir("missing").join("nope"));
    assert!(store.allocate().await.is_err());
}

#[tokio::test]
async fn test_release_removes_unflushed_file() {
    let dir = scratch_dir("release-unflushed");
    let store = TemporaryStore::new(&dir);

    let mut sink = store.allocate().await.unwrap();
    sink.append(&vec![b'x'; 64 * 1024]).await.unwrap();
    let path = sink.path().to_path_buf();
    assert!(path.exists());

    store.release(sink).await.unwrap();
    assert!(!path.exists());
    assert!(std::fs::read_dir(&dir).unwrap().next().is_none());
}

#[tokio::test]
async fn test_release_reports_missing_file() {
    let dir = scratch_dir("release-missing");
    let store = TemporaryStore::new(&dir);

    let mut sink = store.allocate().await.unwrap();
    sink.append(b"gone").await.unwrap();
    std::fs::remove_file(sink.path()).unwrap();

    let err = store.release(sink).await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

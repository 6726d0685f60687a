//! The watch loop against a real directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use contact_ingest::ingest::FileProcessor;
use contact_ingest::store::{ContactFilter, ContactStore, MemoryContactStore};
use contact_ingest::watcher::WatchLoop;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const WAIT_LIMIT: Duration = Duration::from_secs(10);

/// Write the file elsewhere first so the watcher never sees a partial file.
fn drop_file(staging: &Path, watched: &Path, name: &str, content: &str) {
    let staged = staging.join(name);
    std::fs::write(&staged, content).unwrap();
    std::fs::rename(&staged, watched.join(name)).unwrap();
}

async fn wait_until_gone(path: &Path) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while path.exists() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} was never processed",
            path.display()
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_new_files_are_ingested_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let watched = temp_dir.path().join("incoming");
    let staging = temp_dir.path().join("staging");
    std::fs::create_dir_all(&watched).unwrap();
    std::fs::create_dir_all(&staging).unwrap();

    let store: Arc<dyn ContactStore> = Arc::new(MemoryContactStore::new());
    let processor = Arc::new(FileProcessor::new(store.clone()));
    let watch_loop = WatchLoop::builder()
        .directory(&watched)
        .processor(processor)
        .build()
        .unwrap();

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(watch_loop.run(shutdown.clone()));
    // Give the subscription time to register
    tokio::time::sleep(Duration::from_millis(300)).await;

    drop_file(
        &staging,
        &watched,
        "first.json",
        r#"[{"name":"Jane","email":"jane@x.com","phone":"555-123-4567"}]"#,
    );
    wait_until_gone(&watched.join("first.json")).await;

    drop_file(
        &staging,
        &watched,
        "second.json",
        r#"[{"name":"Jane Two","email":"jane@x.com","phone":"1"},{"name":"Bob","email":"bob@x.com","phone":"2"}]"#,
    );
    wait_until_gone(&watched.join("second.json")).await;

    drop_file(&staging, &watched, "broken.json", "not json at all");
    wait_until_gone(&watched.join("broken.json")).await;

    shutdown.cancel();
    let summary = handle.await.unwrap().unwrap();

    assert_eq!(summary.files_processed, 3);
    assert_eq!(summary.files_rejected, 1);
    assert_eq!(summary.records.inserted, 2);
    assert_eq!(summary.records.duplicates, 1);

    let stored = store.list(&ContactFilter::all()).unwrap();
    let emails: Vec<_> = stored.iter().map(|s| s.contact.email.as_str()).collect();
    assert_eq!(emails, vec!["jane@x.com", "bob@x.com"]);
    assert_eq!(stored[0].contact.phone, "+1-555-123-4567");
}

#[tokio::test]
async fn test_scan_on_start_picks_up_existing_files() {
    let temp_dir = TempDir::new().unwrap();
    let watched = temp_dir.path();
    std::fs::write(
        watched.join("waiting.json"),
        r#"[{"name":"Ann","email":"ann@x.com","phone":"5550001111"}]"#,
    )
    .unwrap();

    let store: Arc<dyn ContactStore> = Arc::new(MemoryContactStore::new());
    let watch_loop = WatchLoop::builder()
        .directory(watched)
        .processor(Arc::new(FileProcessor::new(store.clone())))
        .scan_on_start(true)
        .build()
        .unwrap();

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(watch_loop.run(shutdown.clone()));

    wait_until_gone(&watched.join("waiting.json")).await;
    shutdown.cancel();
    let summary = handle.await.unwrap().unwrap();

    assert_eq!(summary.records.inserted, 1);
    assert_eq!(store.count().unwrap(), 1);
}

#[tokio::test]
async fn test_existing_files_ignored_without_scan() {
    let temp_dir = TempDir::new().unwrap();
    let watched = temp_dir.path();
    let waiting = watched.join("waiting.json");
    std::fs::write(&waiting, "[]").unwrap();

    let store: Arc<dyn ContactStore> = Arc::new(MemoryContactStore::new());
    let watch_loop = WatchLoop::builder()
        .directory(watched)
        .processor(Arc::new(FileProcessor::new(store)))
        .build()
        .unwrap();

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(watch_loop.run(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.cancel();
    let summary = handle.await.unwrap().unwrap();

    assert_eq!(summary.files_processed, 0);
    assert!(waiting.exists());
}

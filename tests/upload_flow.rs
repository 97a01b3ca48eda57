//! Upload Flow Tests
//!
//! Staging from disk through commit, against the simulated store and the
//! mock HTTP server.

mod common;

use std::fs;
use std::sync::Arc;

use common::MockServer;
use folio::config::UploadConfig;
use folio::store::{MemoryStore, ProgressFn, SharedStore};
use folio::tree::find_by_path;
use folio::{Explorer, NotificationCenter, StagingList, TreeSynchronizer, UploadPipeline};

fn no_progress() -> ProgressFn {
    Arc::new(|_| {})
}

/// `album/` with three ordinary files and a `.DS_Store`.
fn album_fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let album = dir.path().join("album");
    fs::create_dir_all(album.join("2024")).unwrap();
    fs::write(album.join("cover.jpg"), [1u8; 16]).unwrap();
    fs::write(album.join("2024/one.png"), [2u8; 32]).unwrap();
    fs::write(album.join("2024/two.png"), [3u8; 64]).unwrap();
    fs::write(album.join(".DS_Store"), [0u8; 8]).unwrap();
    dir
}

#[tokio::test]
async fn test_directory_upload_drops_metadata_files() {
    let fixture = album_fixture();
    let mut staging = StagingList::new(&UploadConfig::default(), NotificationCenter::new());

    let report = staging.add_directory(&fixture.path().join("album")).unwrap();

    assert_eq!(report.staged, 3);
    assert_eq!(report.ignored, 1);
    assert_eq!(staging.len(), 3);
    assert!(staging.files().iter().all(|f| f.name != ".DS_Store"));
}

#[tokio::test]
async fn test_directory_upload_rebuilds_structure() {
    let fixture = album_fixture();
    let memory = Arc::new(MemoryStore::new());
    memory.add_folder("/photos").await;
    let store: SharedStore = memory.clone();
    let notifications = NotificationCenter::new();
    let sync = Arc::new(TreeSynchronizer::new(store.clone(), notifications.clone()));
    let mut explorer = Explorer::new(sync.clone());

    let mut staging = StagingList::new(&UploadConfig::default(), notifications.clone());
    staging.add_directory(&fixture.path().join("album")).unwrap();
    let pipeline = UploadPipeline::new(store, notifications);

    let summary = pipeline
        .commit(&mut staging, Some("photos/"), no_progress())
        .await
        .unwrap();
    assert_eq!(summary.files, 3);
    assert_eq!(summary.bytes, 112);
    assert!(staging.is_empty());

    explorer.refresh().await.unwrap();
    let tree = explorer.tree();
    assert!(find_by_path(tree, "/photos/album/cover.jpg").is_some());
    assert!(find_by_path(tree, "/photos/album/2024/one.png").is_some());
    assert!(find_by_path(tree, "/photos/album/2024/two.png").is_some());
    assert!(find_by_path(tree, "/photos/album/.DS_Store").is_none());
}

#[tokio::test]
async fn test_upload_to_selected_folder_over_http() {
    let server = MockServer::start().await;
    server
        .set_tree(serde_json::json!([{
            "id": "d-1",
            "name": "inbox",
            "type": "folder",
            "path": "/inbox",
            "uploaded_at": "2024-05-01T10:00:00",
            "children": [{
                "id": "f-1",
                "name": "old.csv",
                "type": "file",
                "size": 3,
                "path": "/inbox/old.csv",
                "uploaded_at": "2024-05-01T10:00:00"
            }]
        }]))
        .await;
    let store = server.store();
    let notifications = NotificationCenter::new();
    let sync = Arc::new(TreeSynchronizer::new(store.clone(), notifications.clone()));
    let mut explorer = Explorer::new(sync);
    explorer.refresh().await.unwrap();
    explorer.select("f-1").unwrap();

    let fixture = album_fixture();
    let mut staging = StagingList::new(&UploadConfig::default(), notifications.clone());
    staging.add_directory(&fixture.path().join("album")).unwrap();
    staging
        .add_files([fixture.path().join("album/cover.jpg")])
        .unwrap();

    let destination = explorer.upload_destination();
    UploadPipeline::new(store, notifications)
        .commit(&mut staging, Some(&destination), no_progress())
        .await
        .unwrap();

    let state = server.state.lock().await;
    let upload = &state.uploads[0];
    assert_eq!(upload.folder_path.as_deref(), Some("/inbox"));
    let relative: Vec<String> =
        serde_json::from_str(upload.relative_paths.as_deref().unwrap()).unwrap();
    assert_eq!(
        relative,
        vec![
            "album/2024/one.png".to_string(),
            "album/2024/two.png".to_string(),
            "album/cover.jpg".to_string(),
            String::new(),
        ]
    );
    assert_eq!(upload.files.len(), 4);
}

#[tokio::test]
async fn test_failed_upload_keeps_staging_for_retry() {
    let memory = Arc::new(MemoryStore::new());
    memory.fail_next_upload("Storage quota exceeded").await;
    let store: SharedStore = memory.clone();
    let notifications = NotificationCenter::new();
    let mut rx = notifications.subscribe();
    let pipeline = UploadPipeline::new(store, notifications.clone());

    let fixture = album_fixture();
    let mut staging = StagingList::new(&UploadConfig::default(), notifications);
    staging.add_directory(&fixture.path().join("album")).unwrap();

    assert!(pipeline.commit(&mut staging, None, no_progress()).await.is_err());
    assert_eq!(staging.len(), 3);
    let note = rx.recv().await.unwrap();
    assert_eq!(note.title, "Upload failed");
    assert_eq!(note.description.as_deref(), Some("Storage quota exceeded"));

    pipeline.commit(&mut staging, None, no_progress()).await.unwrap();
    assert!(staging.is_empty());
    assert!(find_by_path(&memory.snapshot().await, "/album/cover.jpg").is_some());
}

//! Tree Synchronizer Tests
//!
//! Bulk and recursive deletion, reload sequencing and path invariants,
//! against both the simulated store and the mock HTTP server.

mod common;

use std::sync::Arc;

use common::{sample_tree, MockServer};
use folio::notify::NotificationLevel;
use folio::store::{MemoryStore, SharedStore, StoreCall, UploadBatch, UploadFile};
use folio::tree::{check_paths, find_by_path, walk};
use folio::{DeleteAllOutcome, LoadState, NotificationCenter, TreeSynchronizer};

async fn memory_sync(top_level: usize) -> (Arc<MemoryStore>, TreeSynchronizer, Vec<String>) {
    let memory = Arc::new(MemoryStore::new());
    let mut ids = Vec::new();
    for i in 0..top_level {
        memory.add_file(&format!("/dir{i}/file.txt"), vec![0; 4]).await;
        ids.push(memory.id_of(&format!("/dir{i}")).await.unwrap());
    }
    let store: SharedStore = memory.clone();
    let sync = TreeSynchronizer::new(store, NotificationCenter::new());
    sync.refresh().await.unwrap();
    (memory, sync, ids)
}

fn list_calls(calls: &[StoreCall]) -> usize {
    calls.iter().filter(|c| **c == StoreCall::ListTree).count()
}

#[tokio::test]
async fn test_delete_all_every_delete_succeeds() {
    let (memory, sync, _ids) = memory_sync(3).await;
    let mut rx = sync.notifications().subscribe();

    let outcome = sync.delete_all(|_| true).await;

    assert_eq!(outcome, DeleteAllOutcome::AllDeleted { total: 3 });
    assert!(sync.snapshot().await.is_empty());
    assert_eq!(rx.recv().await.unwrap().level, NotificationLevel::Success);
    assert_eq!(list_calls(&memory.calls().await), 2);
}

#[tokio::test]
async fn test_delete_all_partial_failure_reloads() {
    let (memory, sync, ids) = memory_sync(4).await;
    memory.fail_delete(&ids[1]).await;
    let mut rx = sync.notifications().subscribe();

    let outcome = sync.delete_all(|_| true).await;

    assert_eq!(outcome, DeleteAllOutcome::Partial { failed: 1, total: 4 });
    let note = rx.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Warning);
    assert_eq!(note.description.as_deref(), Some("1 of 4 item(s) failed to delete"));

    let tree = sync.snapshot().await;
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, ids[1]);
    assert_eq!(list_calls(&memory.calls().await), 2);
}

#[tokio::test]
async fn test_delete_all_total_failure_still_reloads() {
    let (memory, sync, ids) = memory_sync(2).await;
    for id in &ids {
        memory.fail_delete(id).await;
    }
    let mut rx = sync.notifications().subscribe();

    let outcome = sync.delete_all(|_| true).await;

    assert_eq!(outcome, DeleteAllOutcome::AllFailed { total: 2 });
    assert_eq!(rx.recv().await.unwrap().level, NotificationLevel::Error);
    assert_eq!(sync.snapshot().await.len(), 2);
    assert_eq!(list_calls(&memory.calls().await), 2);
}

#[tokio::test]
async fn test_delete_all_issues_one_call_per_top_level_node() {
    let (memory, sync, ids) = memory_sync(3).await;
    sync.delete_all(|_| true).await;

    let deletes: Vec<String> = memory
        .calls()
        .await
        .into_iter()
        .filter_map(|c| match c {
            StoreCall::DeleteNode(id) => Some(id),
            _ => None,
        })
        .collect();
    let mut sorted = deletes.clone();
    sorted.sort();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(sorted, expected);
}

#[tokio::test]
async fn test_folder_delete_removes_subtree() {
    let memory = Arc::new(MemoryStore::new());
    memory.add_file("/a/b/c/deep.txt", b"x".to_vec()).await;
    memory.add_file("/a/sibling.txt", b"y".to_vec()).await;
    memory.add_file("/other.txt", b"z".to_vec()).await;
    let store: SharedStore = memory.clone();
    let sync = TreeSynchronizer::new(store, NotificationCenter::new());
    sync.refresh().await.unwrap();

    let b = memory.id_of("/a/b").await.unwrap();
    sync.delete_one(&b).await.unwrap();

    let tree = sync.snapshot().await;
    assert!(find_by_path(&tree, "/a/b").is_none());
    assert!(find_by_path(&tree, "/a/b/c/deep.txt").is_none());
    assert!(find_by_path(&tree, "/a/sibling.txt").is_some());
    assert!(find_by_path(&tree, "/other.txt").is_some());
}

#[tokio::test]
async fn test_paths_hold_after_directory_upload() {
    let memory = Arc::new(MemoryStore::new());
    memory.add_folder("/projects").await;
    let store: SharedStore = memory.clone();
    let sync = TreeSynchronizer::new(store.clone(), NotificationCenter::new());

    let batch = UploadBatch {
        destination: "/projects".to_string(),
        files: vec![
            UploadFile::from_bytes("a.csv", vec![1]).with_relative_path("set/a.csv"),
            UploadFile::from_bytes("b.csv", vec![2]).with_relative_path("set/x/y/b.csv"),
            UploadFile::from_bytes("c.csv", vec![3]).with_relative_path("set/x/c.csv"),
        ],
    };
    store.upload_batch(batch, Arc::new(|_| {})).await.unwrap();
    sync.refresh().await.unwrap();

    let tree = sync.snapshot().await;
    assert!(check_paths(&tree).is_empty());
    let mut files = 0;
    walk(&tree, &mut |node, _| {
        if node.is_file() {
            files += 1;
        }
    });
    assert_eq!(files, 3);
}

#[tokio::test]
async fn test_refresh_failure_keeps_tree_over_http() {
    let server = MockServer::start().await;
    server.set_tree(sample_tree()).await;
    let sync = TreeSynchronizer::new(server.store(), NotificationCenter::new());
    sync.refresh().await.unwrap();

    server.state.lock().await.require_token = true;
    assert!(sync.refresh().await.is_err());

    assert_eq!(sync.load_state().await, LoadState::Failed);
    assert_eq!(sync.snapshot().await.len(), 2);
}

#[tokio::test]
async fn test_delete_all_over_http() {
    let server = MockServer::start().await;
    server.set_tree(sample_tree()).await;
    server
        .state
        .lock()
        .await
        .failing_deletes
        .insert("f-top".to_string());
    let sync = TreeSynchronizer::new(server.store(), NotificationCenter::new());
    sync.refresh().await.unwrap();

    let outcome = sync.delete_all(|n| n == 2).await;
    assert_eq!(outcome, DeleteAllOutcome::Partial { failed: 1, total: 2 });

    let state = server.state.lock().await;
    assert_eq!(state.deleted, vec!["d-docs".to_string()]);
    let lists = state
        .requests
        .iter()
        .filter(|r| r.as_str() == "GET /files/tree")
        .count();
    assert_eq!(lists, 2);
}

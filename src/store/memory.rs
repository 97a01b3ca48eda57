//! In-process simulated store.
//!
//! Behaves like the storage API from the client's point of view: ids are
//! assigned by the store, folder deletes are recursive, directory uploads
//! rebuild their subfolders from the relative paths. Faults can be injected
//! per call so partial failures and slow fetches can be exercised without a
//! server.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use super::types::{FileRecord, ProgressFn, StorageUsage, UploadBatch, UploadSource};
use super::RemoteStore;
use crate::paths::{join_path, normalize_folder_path, split_relative_path, ROOT};
use crate::processing::ProcessingAction;
use crate::tree::{find_by_path, walk, FileNode, NodeKind};
use crate::{FolioError, Result};

/// Record of a call made against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `list_tree`.
    ListTree,
    /// `create_folder`.
    CreateFolder {
        /// Folder name.
        name: String,
        /// Parent path as sent.
        parent_path: String,
    },
    /// `delete_node`.
    DeleteNode(String),
    /// `upload_batch`.
    Upload {
        /// Destination folder as sent.
        destination: String,
        /// File names.
        names: Vec<String>,
        /// Relative paths, parallel to `names`.
        relative_paths: Vec<String>,
    },
    /// `fetch_raw`.
    FetchRaw(String),
    /// `storage_usage`.
    StorageUsage,
    /// `search`.
    Search(String),
    /// `run_processing`.
    Processing {
        /// File path.
        file_path: String,
        /// Requested action.
        action: ProcessingAction,
    },
}

#[derive(Default)]
struct MemoryState {
    roots: Vec<FileNode>,
    contents: HashMap<String, Vec<u8>>,
    calls: Vec<StoreCall>,
    failing_deletes: HashSet<String>,
    fail_next_list: Option<String>,
    fail_next_upload: Option<String>,
    failing_fetches: HashSet<String>,
    fetch_gates: HashMap<String, Arc<Notify>>,
    list_gate: Option<Arc<Notify>>,
}

impl MemoryState {
    /// Children list of the folder at `path`, `roots` for `/`.
    fn children_mut(&mut self, path: &str) -> Option<&mut Vec<FileNode>> {
        if path == ROOT {
            return Some(&mut self.roots);
        }
        find_folder_mut(&mut self.roots, path).map(|node| &mut node.children)
    }

    /// Create every missing folder along `path`.
    fn ensure_folder(&mut self, path: &str) {
        let path = normalize_folder_path(path);
        let mut current = ROOT.to_string();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let child_path = join_path(&current, segment);
            let exists = self
                .children_mut(&current)
                .map(|c| c.iter().any(|n| n.path == child_path))
                .unwrap_or(false);
            if !exists {
                if let Some(children) = self.children_mut(&current) {
                    children.push(new_node(NodeKind::Folder, &child_path, None, None));
                }
            }
            current = child_path;
        }
    }

    fn insert_file(&mut self, path: &str, content: Vec<u8>, mime_type: Option<String>) {
        let parent = crate::paths::parent_folder_of(path);
        let size = content.len() as u64;
        self.ensure_folder(&parent);
        if let Some(children) = self.children_mut(&parent) {
            children.retain(|n| n.path != path);
            children.push(new_node(NodeKind::File, path, Some(size), mime_type));
        }
        self.contents.insert(path.to_string(), content);
    }
}

fn new_node(kind: NodeKind, path: &str, size: Option<u64>, mime_type: Option<String>) -> FileNode {
    FileNode {
        id: Uuid::new_v4().to_string(),
        name: crate::paths::leaf_name(path).to_string(),
        kind,
        path: path.to_string(),
        size,
        mime_type,
        uploaded_at: Utc::now(),
        folder_path: None,
        children: Vec::new(),
    }
}

fn find_folder_mut<'a>(nodes: &'a mut [FileNode], path: &str) -> Option<&'a mut FileNode> {
    for node in nodes.iter_mut() {
        if node.path == path && node.is_folder() {
            return Some(node);
        }
        if path.starts_with(&format!("{}/", node.path)) {
            return find_folder_mut(&mut node.children, path);
        }
    }
    None
}

/// Remove the node with `id` anywhere in the forest.
fn remove_by_id(nodes: &mut Vec<FileNode>, id: &str) -> Option<FileNode> {
    if let Some(idx) = nodes.iter().position(|n| n.id == id) {
        return Some(nodes.remove(idx));
    }
    nodes
        .iter_mut()
        .find_map(|node| remove_by_id(&mut node.children, id))
}

/// Simulated storage API.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a folder (and any missing ancestors).
    pub async fn add_folder(&self, path: &str) {
        self.state.lock().await.ensure_folder(path);
    }

    /// Add a file (and any missing ancestor folders).
    pub async fn add_file(&self, path: &str, content: Vec<u8>) {
        let path = normalize_folder_path(path);
        self.state.lock().await.insert_file(&path, content, None);
    }

    /// Add a file with an explicit mime type.
    pub async fn add_file_with_mime(&self, path: &str, content: Vec<u8>, mime_type: &str) {
        let path = normalize_folder_path(path);
        self.state
            .lock()
            .await
            .insert_file(&path, content, Some(mime_type.to_string()));
    }

    /// Id of the node at `path`.
    pub async fn id_of(&self, path: &str) -> Option<String> {
        let state = self.state.lock().await;
        find_by_path(&state.roots, path).map(|n| n.id.clone())
    }

    /// Make every delete of `id` fail.
    pub async fn fail_delete(&self, id: &str) {
        self.state.lock().await.failing_deletes.insert(id.to_string());
    }

    /// Make the next `list_tree` fail with `message`.
    pub async fn fail_next_list(&self, message: &str) {
        self.state.lock().await.fail_next_list = Some(message.to_string());
    }

    /// Make the next `upload_batch` fail with `message`.
    pub async fn fail_next_upload(&self, message: &str) {
        self.state.lock().await.fail_next_upload = Some(message.to_string());
    }

    /// Make every fetch of `path` fail.
    pub async fn fail_fetch(&self, path: &str) {
        self.state.lock().await.failing_fetches.insert(path.to_string());
    }

    /// Hold fetches of `path` until the returned gate is notified.
    pub async fn hold_fetch(&self, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .lock()
            .await
            .fetch_gates
            .insert(path.to_string(), gate.clone());
        gate
    }

    /// Hold the next `list_tree` until the returned gate is notified.
    ///
    /// The listing is taken when the call arrives, so the held response
    /// reflects the store as it was then.
    pub async fn hold_next_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().await.list_gate = Some(gate.clone());
        gate
    }

    /// Calls made so far, in order.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    /// Current tree, without recording a call.
    pub async fn snapshot(&self) -> Vec<FileNode> {
        self.state.lock().await.roots.clone()
    }

    async fn record(&self, call: StoreCall) {
        self.state.lock().await.calls.push(call);
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_tree(&self) -> Result<Vec<FileNode>> {
        let (listing, gate) = {
            let mut state = self.state.lock().await;
            state.calls.push(StoreCall::ListTree);
            let listing = match state.fail_next_list.take() {
                Some(message) => Err(FolioError::store(Some(500), message)),
                None => Ok(state.roots.clone()),
            };
            (listing, state.list_gate.take())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        listing
    }

    async fn create_folder(&self, name: &str, parent_path: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::CreateFolder {
            name: name.to_string(),
            parent_path: parent_path.to_string(),
        });

        let path = join_path(parent_path, name);
        let children = state
            .children_mut(parent_path)
            .ok_or_else(|| FolioError::store(Some(404), "Parent folder not found"))?;
        if children.iter().any(|n| n.path == path) {
            return Err(FolioError::store(Some(400), "Folder already exists"));
        }
        children.push(new_node(NodeKind::Folder, &path, None, None));
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::DeleteNode(id.to_string()));
        if state.failing_deletes.contains(id) {
            return Err(FolioError::store(Some(500), format!("Failed to delete {id}")));
        }

        let removed = remove_by_id(&mut state.roots, id)
            .ok_or_else(|| FolioError::store(Some(404), "File not found"))?;
        let mut gone = Vec::new();
        walk(std::slice::from_ref(&removed), &mut |node, _| gone.push(node.path.clone()));
        for path in gone {
            state.contents.remove(&path);
        }
        Ok(())
    }

    async fn upload_batch(&self, batch: UploadBatch, progress: ProgressFn) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.calls.push(StoreCall::Upload {
                destination: batch.destination.clone(),
                names: batch.files.iter().map(|f| f.name.clone()).collect(),
                relative_paths: batch.relative_paths(),
            });
            if let Some(message) = state.fail_next_upload.take() {
                return Err(FolioError::store(Some(400), message));
            }
        }

        let total = batch.total_bytes();
        let mut loaded = 0;
        let mut received = Vec::with_capacity(batch.files.len());
        for file in batch.files {
            let content = match file.source {
                UploadSource::Bytes(content) => content,
                UploadSource::Path(path) => tokio::fs::read(&path).await?,
            };
            loaded += file.size;
            progress(super::UploadProgress { loaded, total });

            let (dirs, _) = split_relative_path(&file.relative_path);
            let mut folder = normalize_folder_path(&batch.destination);
            for dir in dirs {
                folder = join_path(&folder, dir);
            }
            received.push((join_path(&folder, &file.name), content, file.mime_type));
        }

        let mut state = self.state.lock().await;
        for (path, content, mime_type) in received {
            state.insert_file(&path, content, Some(mime_type));
        }
        Ok(())
    }

    async fn fetch_raw(&self, path: &str) -> Result<Vec<u8>> {
        let gate = {
            let mut state = self.state.lock().await;
            state.calls.push(StoreCall::FetchRaw(path.to_string()));
            state.fetch_gates.get(path).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let state = self.state.lock().await;
        if state.failing_fetches.contains(path) {
            return Err(FolioError::Network(format!("connection reset fetching {path}")));
        }
        state
            .contents
            .get(path)
            .cloned()
            .ok_or_else(|| FolioError::store(Some(404), "File not found"))
    }

    fn resolve_url(&self, path: &str) -> String {
        format!("memory://{}", path.trim_start_matches('/'))
    }

    async fn storage_usage(&self) -> Result<StorageUsage> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::StorageUsage);
        let mut usage = StorageUsage::default();
        walk(&state.roots, &mut |node, _| {
            if node.is_file() {
                usage.total_size += node.size.unwrap_or(0);
                usage.file_count += 1;
            }
        });
        Ok(usage)
    }

    async fn search(&self, query: &str) -> Result<Vec<FileRecord>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(FolioError::Validation("search query is empty".to_string()));
        }

        self.record(StoreCall::Search(query.clone())).await;
        let state = self.state.lock().await;
        let mut records = Vec::new();
        walk(&state.roots, &mut |node, _| {
            if node.name.to_lowercase().contains(&query) {
                records.push(FileRecord {
                    id: node.id.clone(),
                    original_filename: node.name.clone(),
                    file_size: node.size.unwrap_or(0),
                    mime_type: node.mime_type.clone(),
                    folder_path: node.parent_folder(),
                    is_folder: node.is_folder(),
                    uploaded_at: node.uploaded_at,
                });
            }
        });
        Ok(records)
    }

    async fn run_processing(&self, file_path: &str, action: ProcessingAction) -> Result<String> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Processing {
            file_path: file_path.to_string(),
            action,
        });
        if !state.contents.contains_key(file_path) {
            return Err(FolioError::store(Some(404), "File not found"));
        }
        Ok(format!("{} finished for {}", action.label(), file_path))
    }
}

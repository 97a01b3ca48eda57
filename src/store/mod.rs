//! Remote store boundary.
//!
//! The storage API owns durability and authorization; this module only
//! describes the calls the client makes against it:
//! - list the whole tree
//! - create a folder, delete a node (folders recursively, server side)
//! - upload a batch of files with progress
//! - fetch raw file content
//!
//! Every call is a fallible network request that may fail independently of
//! the others.

mod http;
mod memory;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

use crate::processing::ProcessingAction;
use crate::tree::FileNode;
use crate::Result;

pub use http::HttpStore;
pub use memory::{MemoryStore, StoreCall};
pub use types::{
    guess_mime, FileRecord, ProgressFn, ProgressTracker, StorageUsage, UploadBatch, UploadFile,
    UploadProgress, UploadSource,
};

/// Operations offered by the storage API.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List the root-level nodes, children populated recursively.
    async fn list_tree(&self) -> Result<Vec<FileNode>>;

    /// Create folder `name` inside `parent_path`.
    ///
    /// `parent_path` must already be normalized.
    async fn create_folder(&self, name: &str, parent_path: &str) -> Result<()>;

    /// Delete a node. Folder deletion removes the whole subtree.
    async fn delete_node(&self, id: &str) -> Result<()>;

    /// Upload a batch in one call, reporting progress on every transfer tick.
    async fn upload_batch(&self, batch: UploadBatch, progress: ProgressFn) -> Result<()>;

    /// Fetch the raw content stored at `path`.
    ///
    /// Dropping the returned future aborts the transfer.
    async fn fetch_raw(&self, path: &str) -> Result<Vec<u8>>;

    /// URL under which a renderer can load the content at `path` directly.
    fn resolve_url(&self, path: &str) -> String;

    /// Storage usage summary.
    async fn storage_usage(&self) -> Result<StorageUsage>;

    /// Search files by name.
    async fn search(&self, query: &str) -> Result<Vec<FileRecord>>;

    /// Run a processing job on the file at `file_path` and return its message.
    async fn run_processing(&self, file_path: &str, action: ProcessingAction) -> Result<String>;
}

/// Store handle shared by every component.
pub type SharedStore = Arc<dyn RemoteStore>;

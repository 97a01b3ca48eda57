//! Tree synchronizer.
//!
//! Owns the in-memory tree and reconciles it with the remote store. The tree
//! is only ever replaced wholesale by [`TreeSynchronizer::refresh`]; every
//! successful write is followed by a full reload, sequenced after the write
//! completes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use super::node::{check_paths, count_nodes, FileNode};
use crate::notify::{Notification, NotificationCenter};
use crate::paths::normalize_folder_path;
use crate::store::{FileRecord, SharedStore, StorageUsage};
use crate::{FolioError, Result};

/// Load status of the in-memory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Never loaded.
    Idle,
    /// A listing is in flight.
    Loading,
    /// The tree reflects the last successful listing.
    Loaded,
    /// The last listing failed; the tree shown is the last one that loaded.
    Failed,
}

/// Aggregate result of [`TreeSynchronizer::delete_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteAllOutcome {
    /// Nothing to delete.
    Empty,
    /// The caller declined the confirmation.
    Declined,
    /// Every top-level delete succeeded.
    AllDeleted {
        /// Number of top-level nodes deleted.
        total: usize,
    },
    /// Some, but not all, deletes failed.
    Partial {
        /// Number of failed deletes.
        failed: usize,
        /// Number of deletes issued.
        total: usize,
    },
    /// Every delete failed.
    AllFailed {
        /// Number of deletes issued.
        total: usize,
    },
}

impl DeleteAllOutcome {
    fn classify(failed: usize, total: usize) -> Self {
        match failed {
            0 => DeleteAllOutcome::AllDeleted { total },
            n if n == total => DeleteAllOutcome::AllFailed { total },
            n => DeleteAllOutcome::Partial { failed: n, total },
        }
    }

    fn notification(&self) -> Option<Notification> {
        match *self {
            DeleteAllOutcome::Empty | DeleteAllOutcome::Declined => None,
            DeleteAllOutcome::AllDeleted { total } => Some(
                Notification::success("All files deleted")
                    .with_description(format!("{total} item(s) deleted")),
            ),
            DeleteAllOutcome::Partial { failed, total } => Some(
                Notification::warning("Some items could not be deleted")
                    .with_description(format!("{failed} of {total} item(s) failed to delete")),
            ),
            DeleteAllOutcome::AllFailed { total } => Some(
                Notification::error("Failed to delete files")
                    .with_description(format!("{total} of {total} item(s) failed to delete")),
            ),
        }
    }
}

/// Single writer of the in-memory file tree.
pub struct TreeSynchronizer {
    store: SharedStore,
    notifications: NotificationCenter,
    tree: RwLock<Arc<Vec<FileNode>>>,
    state: RwLock<LoadState>,
    /// Bumped after every completed refresh, successful or not.
    generation: watch::Sender<u64>,
    /// Sequence handed to each refresh as it starts.
    issued: AtomicU64,
    /// Sequence of the refresh whose listing is installed.
    installed: AtomicU64,
}

impl TreeSynchronizer {
    /// Create a synchronizer with an empty, unloaded tree.
    pub fn new(store: SharedStore, notifications: NotificationCenter) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            store,
            notifications,
            tree: RwLock::new(Arc::new(Vec::new())),
            state: RwLock::new(LoadState::Idle),
            generation,
            issued: AtomicU64::new(0),
            installed: AtomicU64::new(0),
        }
    }

    /// The store this synchronizer talks to.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The notification center operations report to.
    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Current tree. Cheap; the snapshot never changes under the caller.
    pub async fn snapshot(&self) -> Arc<Vec<FileNode>> {
        self.tree.read().await.clone()
    }

    /// Current load status.
    pub async fn load_state(&self) -> LoadState {
        *self.state.read().await
    }

    /// Watch refresh completions.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Reload the whole tree from the store.
    ///
    /// On failure the previous tree stays in place, the state becomes
    /// [`LoadState::Failed`] and an error notification is emitted. When
    /// refreshes overlap, a listing older than the installed tree is
    /// discarded.
    pub async fn refresh(&self) -> Result<()> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write().await = LoadState::Loading;

        let result = self.store.list_tree().await;
        let outcome = match result {
            Ok(roots) => {
                for mismatch in check_paths(&roots) {
                    warn!(
                        id = %mismatch.id,
                        expected = %mismatch.expected,
                        actual = %mismatch.actual,
                        "tree node path does not match its position"
                    );
                }
                let mut tree = self.tree.write().await;
                if seq < self.installed.load(Ordering::SeqCst) {
                    debug!(seq, "discarding listing superseded by a newer refresh");
                    return Ok(());
                }
                debug!(seq, nodes = count_nodes(&roots), "tree loaded");
                *tree = Arc::new(roots);
                self.installed.store(seq, Ordering::SeqCst);
                drop(tree);
                *self.state.write().await = LoadState::Loaded;
                Ok(())
            }
            Err(e) if seq < self.installed.load(Ordering::SeqCst) => {
                debug!(seq, "superseded listing failed: {}", e);
                return Err(e);
            }
            Err(e) => {
                error!("failed to load tree: {}", e);
                *self.state.write().await = LoadState::Failed;
                self.notifications.emit(
                    Notification::error("Failed to load files")
                        .with_description(e.user_message("Please try again later")),
                );
                Err(e)
            }
        };

        self.generation.send_modify(|g| *g += 1);
        outcome
    }

    /// Refresh after a write. A failed reload is already reported by
    /// [`Self::refresh`] and does not undo the write.
    async fn reload(&self) {
        if self.refresh().await.is_err() {
            debug!("reload after write failed; keeping previous tree");
        }
    }

    /// Create folder `name` inside `parent_path`.
    pub async fn create_folder(&self, parent_path: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            let err = FolioError::Validation("Folder name is required".to_string());
            self.notifications
                .emit(Notification::warning("Folder not created").with_description(err.user_message("")));
            return Err(err);
        }

        let parent = normalize_folder_path(parent_path);
        match self.store.create_folder(name, &parent).await {
            Ok(()) => {
                info!(name, parent = %parent, "folder created");
                self.notifications.emit(
                    Notification::success("Folder created")
                        .with_description(format!("'{name}' created in {parent}")),
                );
                self.reload().await;
                Ok(())
            }
            Err(e) => {
                error!(name, parent = %parent, "failed to create folder: {}", e);
                self.notifications.emit(
                    Notification::error("Failed to create folder")
                        .with_description(e.user_message("Please try again")),
                );
                Err(e)
            }
        }
    }

    /// Delete a single node. Folders are removed with their subtree.
    ///
    /// The tree is left untouched when the delete fails.
    pub async fn delete_one(&self, id: &str) -> Result<()> {
        match self.store.delete_node(id).await {
            Ok(()) => {
                info!(id, "node deleted");
                self.notifications.emit(Notification::success("Deleted successfully"));
                self.reload().await;
                Ok(())
            }
            Err(e) => {
                error!(id, "failed to delete node: {}", e);
                self.notifications.emit(
                    Notification::error("Failed to delete")
                        .with_description(e.user_message("Please try again")),
                );
                Err(e)
            }
        }
    }

    /// Delete every top-level node.
    ///
    /// `confirm` receives the number of top-level nodes and must return
    /// `true` to proceed. Deletes run concurrently; the outcome is computed
    /// once all of them have settled, and the tree is reloaded whatever the
    /// outcome.
    pub async fn delete_all<F>(&self, confirm: F) -> DeleteAllOutcome
    where
        F: FnOnce(usize) -> bool,
    {
        let ids: Vec<String> = self.snapshot().await.iter().map(|n| n.id.clone()).collect();
        if ids.is_empty() {
            self.notifications.emit(Notification::info("Nothing to delete"));
            return DeleteAllOutcome::Empty;
        }
        if !confirm(ids.len()) {
            debug!("delete all declined");
            return DeleteAllOutcome::Declined;
        }

        let results = join_all(ids.iter().map(|id| self.store.delete_node(id))).await;
        let mut failed = 0;
        for (id, result) in ids.iter().zip(&results) {
            if let Err(e) = result {
                warn!(id = %id, "delete failed: {}", e);
                failed += 1;
            }
        }

        let outcome = DeleteAllOutcome::classify(failed, ids.len());
        info!(?outcome, "delete all settled");
        if let Some(notification) = outcome.notification() {
            self.notifications.emit(notification);
        }
        self.reload().await;
        outcome
    }

    /// Storage usage summary.
    pub async fn storage_usage(&self) -> Result<StorageUsage> {
        self.store.storage_usage().await.inspect_err(|e| {
            error!("failed to load storage usage: {}", e);
            self.notifications.emit(
                Notification::error("Failed to load storage usage")
                    .with_description(e.user_message("Please try again later")),
            );
        })
    }

    /// Search files by name.
    pub async fn search(&self, query: &str) -> Result<Vec<FileRecord>> {
        self.store.search(query).await.inspect_err(|e| {
            self.notifications.emit(
                Notification::error("Search failed").with_description(e.user_message("Please try again")),
            );
        })
    }
}

//! Selection and expansion controller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::signal::{BroadcastCommand, BroadcastSignals, FolderSignal};
use crate::notify::Notification;
use crate::paths::{normalize_optional, ROOT};
use crate::tree::{find_by_id, find_by_path, walk, DeleteAllOutcome, FileNode, TreeSynchronizer};
use crate::{FolioError, Result};

/// A file chosen in the explorer, with its containing folder resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    /// The selected node.
    pub node: FileNode,
    /// Normalized folder containing the node.
    pub parent_folder: String,
}

/// Result of [`Explorer::select`].
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// A file became the selection.
    File(SelectedFile),
    /// A folder was toggled; the selection is unchanged.
    FolderToggled {
        /// Folder id.
        id: String,
        /// Expansion after the toggle.
        expanded: bool,
    },
}

/// Per-folder expansion state.
pub(super) struct FolderState {
    pub(super) expanded: bool,
    signal: FolderSignal,
}

impl FolderState {
    fn sync(&mut self) -> bool {
        self.signal.apply(&mut self.expanded);
        self.expanded
    }
}

/// Interactive view over the synchronized tree.
///
/// Tracks the selected file, the folder uploads go to, and which folders are
/// open. In read-only mode every mutating action is refused while selection
/// and expansion keep working.
pub struct Explorer {
    sync: Arc<TreeSynchronizer>,
    read_only: bool,
    hide_item_delete: bool,
    signals: BroadcastSignals,
    pub(super) tree: Arc<Vec<FileNode>>,
    pub(super) folders: HashMap<String, FolderState>,
    pub(super) selected_path: Option<String>,
    selected_folder: Option<String>,
    selection: watch::Sender<Option<SelectedFile>>,
}

impl Explorer {
    /// Create an explorer over `sync`. Call [`Explorer::refresh`] to load.
    pub fn new(sync: Arc<TreeSynchronizer>) -> Self {
        let (selection, _) = watch::channel(None);
        Self {
            sync,
            read_only: false,
            hide_item_delete: false,
            signals: BroadcastSignals::new(),
            tree: Arc::new(Vec::new()),
            folders: HashMap::new(),
            selected_path: None,
            selected_folder: None,
            selection,
        }
    }

    /// Refuse create and delete actions.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Refuse per-item deletion while still allowing folder creation.
    pub fn with_hide_item_delete(mut self, hide: bool) -> Self {
        self.hide_item_delete = hide;
        self
    }

    /// Whether the explorer is read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether individual items may be deleted.
    pub fn can_delete_items(&self) -> bool {
        !self.read_only && !self.hide_item_delete
    }

    /// Underlying synchronizer.
    pub fn synchronizer(&self) -> &Arc<TreeSynchronizer> {
        &self.sync
    }

    /// Expand/collapse publisher.
    pub fn signals(&self) -> &BroadcastSignals {
        &self.signals
    }

    /// Tree as of the last reconcile.
    pub fn tree(&self) -> &[FileNode] {
        &self.tree
    }

    /// Path of the selected file.
    pub fn selected_path(&self) -> Option<&str> {
        self.selected_path.as_deref()
    }

    /// Folder of the selected file.
    pub fn selected_folder(&self) -> Option<&str> {
        self.selected_folder.as_deref()
    }

    /// Normalized upload destination: the selected folder, or the root.
    pub fn upload_destination(&self) -> String {
        normalize_optional(self.selected_folder.as_deref())
    }

    /// Watch file selections. `None` means the selection was cleared.
    pub fn subscribe_selection(&self) -> watch::Receiver<Option<SelectedFile>> {
        self.selection.subscribe()
    }

    /// Reload the tree from the store and reconcile local state with it.
    pub async fn refresh(&mut self) -> Result<()> {
        let result = self.sync.refresh().await;
        self.reconcile().await;
        result
    }

    /// Pick up the synchronizer's current tree.
    ///
    /// Folder state for vanished folders is dropped, new folders start open
    /// at the top level and closed below it, and a selection whose node is
    /// gone is cleared.
    pub async fn reconcile(&mut self) {
        self.tree = self.sync.snapshot().await;

        let mut live = HashSet::new();
        let folders = &mut self.folders;
        let signals = &self.signals;
        walk(&self.tree, &mut |node, depth| {
            if node.is_folder() {
                live.insert(node.id.clone());
                folders.entry(node.id.clone()).or_insert_with(|| FolderState {
                    expanded: depth == 0,
                    signal: signals.subscribe(),
                });
            }
        });
        self.folders.retain(|id, _| live.contains(id));

        let selection_gone = self
            .selected_path
            .as_deref()
            .is_some_and(|path| find_by_path(&self.tree, path).is_none());
        if selection_gone {
            debug!(path = ?self.selected_path, "selection no longer in tree");
            self.clear_selection();
        }
    }

    /// Clear the file selection.
    pub fn clear_selection(&mut self) {
        self.selected_path = None;
        self.selected_folder = None;
        self.selection.send_replace(None);
    }

    /// Select the node with `id`.
    ///
    /// A file becomes the selection and is published to observers; a folder
    /// only has its expansion toggled.
    pub fn select(&mut self, id: &str) -> Result<Selection> {
        let node = find_by_id(&self.tree, id)
            .cloned()
            .ok_or_else(|| FolioError::NotFound(format!("node {id}")))?;

        if node.is_folder() {
            let expanded = self.toggle(id)?;
            return Ok(Selection::FolderToggled {
                id: id.to_string(),
                expanded,
            });
        }

        let parent_folder = node.parent_folder();
        self.selected_path = Some(node.path.clone());
        self.selected_folder = Some(parent_folder.clone());
        let selected = SelectedFile {
            node,
            parent_folder,
        };
        self.selection.send_replace(Some(selected.clone()));
        Ok(Selection::File(selected))
    }

    /// Whether the folder `id` is open. Unknown ids are closed.
    pub fn is_expanded(&mut self, id: &str) -> bool {
        self.folders.get_mut(id).map(FolderState::sync).unwrap_or(false)
    }

    /// Flip one folder's expansion and return the new state.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let state = self
            .folders
            .get_mut(id)
            .ok_or_else(|| FolioError::NotFound(format!("folder {id}")))?;
        state.sync();
        state.expanded = !state.expanded;
        Ok(state.expanded)
    }

    /// Open every folder, at any depth.
    pub fn expand_all(&self) {
        self.signals.send(BroadcastCommand::ExpandAll);
    }

    /// Close every folder, at any depth.
    pub fn collapse_all(&self) {
        self.signals.send(BroadcastCommand::CollapseAll);
    }

    /// Apply pending broadcast commands to every folder.
    pub(super) fn sync_folders(&mut self) {
        for state in self.folders.values_mut() {
            state.sync();
        }
    }

    fn refuse(&self) -> Result<()> {
        let err = FolioError::ReadOnly;
        self.sync
            .notifications()
            .emit(Notification::warning("Action not available").with_description(err.user_message("")));
        Err(err)
    }

    /// Create folder `name` inside `parent` (the root when `None`).
    pub async fn create_folder(&mut self, parent: Option<&str>, name: &str) -> Result<()> {
        if self.read_only {
            return self.refuse();
        }
        let parent = parent.unwrap_or(ROOT);
        let result = self.sync.create_folder(parent, name).await;
        self.reconcile().await;
        result
    }

    /// Delete the node with `id`.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        if !self.can_delete_items() {
            return self.refuse();
        }
        let result = self.sync.delete_one(id).await;
        self.reconcile().await;
        result
    }

    /// Delete every top-level node after `confirm` agrees.
    pub async fn delete_all<F>(&mut self, confirm: F) -> Result<DeleteAllOutcome>
    where
        F: FnOnce(usize) -> bool,
    {
        if self.read_only {
            self.refuse()?;
        }
        let outcome = self.sync.delete_all(confirm).await;
        self.reconcile().await;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationCenter;
    use crate::store::{MemoryStore, SharedStore, StoreCall};

    async fn explorer() -> (Arc<MemoryStore>, Explorer) {
        let memory = Arc::new(MemoryStore::new());
        memory.add_file("/docs/2024/q1.csv", b"a,b\n".to_vec()).await;
        memory.add_file("/docs/readme.txt", b"hi".to_vec()).await;
        memory.add_file("/top.json", b"{}".to_vec()).await;
        let store: SharedStore = memory.clone();
        let sync = Arc::new(TreeSynchronizer::new(store, NotificationCenter::new()));
        let mut explorer = Explorer::new(sync);
        explorer.refresh().await.unwrap();
        (memory, explorer)
    }

    #[tokio::test]
    async fn test_default_expansion_by_depth() {
        let (memory, mut explorer) = explorer().await;
        let docs = memory.id_of("/docs").await.unwrap();
        let year = memory.id_of("/docs/2024").await.unwrap();

        assert!(explorer.is_expanded(&docs));
        assert!(!explorer.is_expanded(&year));
    }

    #[tokio::test]
    async fn test_select_file_resolves_parent() {
        let (memory, mut explorer) = explorer().await;
        let mut rx = explorer.subscribe_selection();
        let id = memory.id_of("/docs/2024/q1.csv").await.unwrap();

        let selection = explorer.select(&id).unwrap();
        let Selection::File(selected) = selection else {
            panic!("expected file selection");
        };
        assert_eq!(selected.parent_folder, "/docs/2024");
        assert_eq!(explorer.selected_path(), Some("/docs/2024/q1.csv"));
        assert_eq!(explorer.upload_destination(), "/docs/2024");

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().node.id, id);
    }

    #[tokio::test]
    async fn test_select_folder_toggles_without_selecting() {
        let (memory, mut explorer) = explorer().await;
        let docs = memory.id_of("/docs").await.unwrap();

        let selection = explorer.select(&docs).unwrap();
        assert_eq!(
            selection,
            Selection::FolderToggled {
                id: docs.clone(),
                expanded: false
            }
        );
        assert_eq!(explorer.selected_path(), None);
        assert_eq!(explorer.upload_destination(), "/");
    }

    #[tokio::test]
    async fn test_broadcast_overrides_local_toggle() {
        let (memory, mut explorer) = explorer().await;
        let docs = memory.id_of("/docs").await.unwrap();
        let year = memory.id_of("/docs/2024").await.unwrap();

        explorer.toggle(&year).unwrap();
        explorer.collapse_all();
        assert!(!explorer.is_expanded(&docs));
        assert!(!explorer.is_expanded(&year));

        explorer.toggle(&docs).unwrap();
        explorer.expand_all();
        assert!(explorer.is_expanded(&docs));
        assert!(explorer.is_expanded(&year));
    }

    #[tokio::test]
    async fn test_delete_clears_stale_selection() {
        let (memory, mut explorer) = explorer().await;
        let file = memory.id_of("/docs/readme.txt").await.unwrap();
        let docs = memory.id_of("/docs").await.unwrap();
        explorer.select(&file).unwrap();

        explorer.delete(&docs).await.unwrap();

        assert_eq!(explorer.selected_path(), None);
        assert!(!explorer.folders.contains_key(&docs));
        assert_eq!(explorer.tree().len(), 1);
    }

    #[tokio::test]
    async fn test_read_only_refuses_mutations() {
        let (memory, explorer) = explorer().await;
        let mut explorer = explorer.with_read_only(true);
        let file = memory.id_of("/top.json").await.unwrap();
        let before = memory.calls().await.len();

        assert!(matches!(explorer.delete(&file).await, Err(FolioError::ReadOnly)));
        assert!(matches!(
            explorer.create_folder(None, "new").await,
            Err(FolioError::ReadOnly)
        ));
        assert!(matches!(
            explorer.delete_all(|_| true).await,
            Err(FolioError::ReadOnly)
        ));
        assert_eq!(memory.calls().await.len(), before);

        assert!(matches!(explorer.select(&file), Ok(Selection::File(_))));
    }

    #[tokio::test]
    async fn test_hide_item_delete_keeps_folder_creation() {
        let (memory, explorer) = explorer().await;
        let mut explorer = explorer.with_hide_item_delete(true);
        let file = memory.id_of("/top.json").await.unwrap();

        assert!(explorer.delete(&file).await.is_err());
        explorer.create_folder(Some("/docs"), "new").await.unwrap();
        assert!(memory.calls().await.contains(&StoreCall::CreateFolder {
            name: "new".to_string(),
            parent_path: "/docs".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_select_unknown_id() {
        let (_memory, mut explorer) = explorer().await;
        assert!(matches!(explorer.select("nope"), Err(FolioError::NotFound(_))));
    }
}

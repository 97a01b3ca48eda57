//! Folio - hierarchical file management client
//!
//! Browses, organizes, uploads, deletes and previews files kept in a nested
//! folder hierarchy on a remote storage API.

pub mod config;
pub mod error;
pub mod explorer;
pub mod format;
pub mod logging;
pub mod notify;
pub mod paths;
pub mod preview;
pub mod processing;
pub mod store;
pub mod tree;
pub mod upload;

pub use config::Config;
pub use error::{FolioError, Result};
pub use explorer::{Explorer, SelectedFile, Selection, TreeRow};
pub use notify::{Notification, NotificationCenter, NotificationLevel};
pub use paths::{is_ignorable_entry, normalize_folder_path, parent_folder_of, IgnorePolicy};
pub use preview::{PreviewDispatcher, PreviewKind, PreviewState};
pub use processing::ProcessingAction;
pub use store::{HttpStore, MemoryStore, RemoteStore, SharedStore};
pub use tree::{DeleteAllOutcome, FileNode, LoadState, NodeKind, TreeSynchronizer};
pub use upload::{StagingList, UploadPipeline};

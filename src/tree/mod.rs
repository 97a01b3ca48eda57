//! File tree model for Folio.
//!
//! This module provides:
//! - The [`FileNode`] hierarchy as listed by the store
//! - Traversal and lookup helpers over the node forest
//! - [`TreeSynchronizer`], the single writer of the in-memory tree

mod node;
mod sync;

pub use node::{
    check_paths, count_nodes, find_by_id, find_by_path, parse_timestamp, walk, FileNode, NodeKind,
    PathMismatch,
};
pub(crate) use node::deserialize_timestamp;
pub use sync::{DeleteAllOutcome, LoadState, TreeSynchronizer};

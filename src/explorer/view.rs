//! Flattened rows for rendering the tree.

use std::fmt;

use super::controller::Explorer;
use crate::format::{format_size, item_count};
use crate::tree::{FileNode, NodeKind};

/// One visible line of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    /// Node id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Node path.
    pub path: String,
    /// File or folder.
    pub kind: NodeKind,
    /// Nesting depth, 0 for top-level nodes.
    pub depth: usize,
    /// Expansion, folders only.
    pub expanded: Option<bool>,
    /// Whether this is the selected file.
    pub selected: bool,
    /// Size label for files, child count label for non-empty folders.
    pub detail: String,
    /// Whether a per-item delete action is offered.
    pub deletable: bool,
}

impl fmt::Display for TreeRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.expanded {
            Some(true) => "[-]",
            Some(false) => "[+]",
            None if self.selected => " * ",
            None => "   ",
        };
        write!(f, "{}{} {}", "  ".repeat(self.depth), marker, self.name)?;
        if !self.detail.is_empty() {
            write!(f, "  ({})", self.detail)?;
        }
        Ok(())
    }
}

impl Explorer {
    /// Rows visible with the current expansion, in tree order.
    ///
    /// Children of closed folders are skipped. Pending expand/collapse
    /// broadcasts are applied first.
    pub fn visible_rows(&mut self) -> Vec<TreeRow> {
        self.sync_folders();
        let tree = self.tree.clone();
        let mut rows = Vec::new();
        self.push_rows(&tree, 0, &mut rows);
        rows
    }

    fn push_rows(&self, nodes: &[FileNode], depth: usize, rows: &mut Vec<TreeRow>) {
        let deletable = self.can_delete_items();
        for node in nodes {
            let expanded = node
                .is_folder()
                .then(|| self.folders.get(&node.id).is_some_and(|s| s.expanded));
            let detail = match node.kind {
                NodeKind::File => format_size(node.size),
                NodeKind::Folder if node.children.is_empty() => String::new(),
                NodeKind::Folder => item_count(node.children.len()),
            };
            rows.push(TreeRow {
                id: node.id.clone(),
                name: node.name.clone(),
                path: node.path.clone(),
                kind: node.kind,
                depth,
                expanded,
                selected: node.is_file() && self.selected_path.as_deref() == Some(node.path.as_str()),
                detail,
                deletable,
            });
            if expanded == Some(true) {
                self.push_rows(&node.children, depth + 1, rows);
            }
        }
    }
}

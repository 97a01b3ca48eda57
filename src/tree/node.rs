//! File tree node types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::paths::{join_path, normalize_folder_path, parent_folder_of, ROOT};

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A regular file.
    File,
    /// A folder, possibly with children.
    Folder,
}

impl NodeKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Folder => "folder",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One file or folder in the hierarchy, as listed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    /// Opaque identifier assigned by the store, unique across the tree.
    pub id: String,
    /// Leaf display name.
    pub name: String,
    /// File or folder.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Canonical absolute path.
    pub path: String,
    /// Byte count, files only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Content-type hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Creation or last upload time.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub uploaded_at: DateTime<Utc>,
    /// Explicit parent folder, when the store provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    /// Children in store order. Empty for files and leaf folders.
    #[serde(default, deserialize_with = "deserialize_children")]
    pub children: Vec<FileNode>,
}

impl FileNode {
    /// Create a file node.
    pub fn file(id: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        Self {
            id: id.into(),
            name: crate::paths::leaf_name(&path).to_string(),
            kind: NodeKind::File,
            path,
            size: Some(size),
            mime_type: None,
            uploaded_at: Utc::now(),
            folder_path: None,
            children: Vec::new(),
        }
    }

    /// Create an empty folder node.
    pub fn folder(id: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: id.into(),
            name: crate::paths::leaf_name(&path).to_string(),
            kind: NodeKind::Folder,
            path,
            size: None,
            mime_type: None,
            uploaded_at: Utc::now(),
            folder_path: None,
            children: Vec::new(),
        }
    }

    /// Set the mime type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Append a child.
    pub fn with_child(mut self, child: FileNode) -> Self {
        self.children.push(child);
        self
    }

    /// Whether this node is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Whether this node is a file.
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Folder that contains this node.
    ///
    /// Uses the explicit `folder_path` when the store sent one, otherwise
    /// derives it from `path`.
    pub fn parent_folder(&self) -> String {
        match self.folder_path.as_deref() {
            Some(folder) if !folder.trim().is_empty() => normalize_folder_path(folder),
            _ => parent_folder_of(&self.path),
        }
    }

    /// Total bytes of all files in this subtree.
    pub fn total_size(&self) -> u64 {
        match self.kind {
            NodeKind::File => self.size.unwrap_or(0),
            NodeKind::Folder => self.children.iter().map(FileNode::total_size).sum(),
        }
    }
}

/// Depth-first, pre-order visit of a forest, with nesting depth.
pub fn walk<'a>(roots: &'a [FileNode], visit: &mut dyn FnMut(&'a FileNode, usize)) {
    fn go<'a>(nodes: &'a [FileNode], depth: usize, visit: &mut dyn FnMut(&'a FileNode, usize)) {
        for node in nodes {
            visit(node, depth);
            go(&node.children, depth + 1, visit);
        }
    }
    go(roots, 0, visit);
}

/// Find a node by id.
pub fn find_by_id<'a>(roots: &'a [FileNode], id: &str) -> Option<&'a FileNode> {
    roots.iter().find_map(|node| {
        if node.id == id {
            Some(node)
        } else {
            find_by_id(&node.children, id)
        }
    })
}

/// Find a node by path.
pub fn find_by_path<'a>(roots: &'a [FileNode], path: &str) -> Option<&'a FileNode> {
    roots.iter().find_map(|node| {
        if node.path == path {
            Some(node)
        } else {
            find_by_path(&node.children, path)
        }
    })
}

/// Number of nodes in a forest.
pub fn count_nodes(roots: &[FileNode]) -> usize {
    let mut count = 0;
    walk(roots, &mut |_, _| count += 1);
    count
}

/// A node whose path does not follow `parent + "/" + name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMismatch {
    /// Offending node id.
    pub id: String,
    /// Path the node should have.
    pub expected: String,
    /// Path the node has.
    pub actual: String,
}

/// Check that every node's path equals its parent's path joined with its
/// name, starting from the root `/`.
pub fn check_paths(roots: &[FileNode]) -> Vec<PathMismatch> {
    fn go(nodes: &[FileNode], parent: &str, out: &mut Vec<PathMismatch>) {
        for node in nodes {
            let expected = join_path(parent, &node.name);
            if node.path != expected {
                out.push(PathMismatch {
                    id: node.id.clone(),
                    expected,
                    actual: node.path.clone(),
                });
            }
            go(&node.children, &node.path, out);
        }
    }

    let mut out = Vec::new();
    go(roots, ROOT, &mut out);
    out
}

fn deserialize_children<'de, D>(deserializer: D) -> Result<Vec<FileNode>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<FileNode>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept RFC 3339 timestamps as well as naive ISO-8601 ones (taken as UTC).
pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Parse a store timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Vec<FileNode> {
        vec![
            FileNode::folder("f1", "/docs")
                .with_child(FileNode::file("a", "/docs/a.csv", 120))
                .with_child(
                    FileNode::folder("f2", "/docs/2024").with_child(FileNode::file(
                        "b",
                        "/docs/2024/b.json",
                        30,
                    )),
                ),
            FileNode::file("c", "/c.png", 7),
        ]
    }

    #[test]
    fn test_deserialize_store_payload() {
        let json = r#"[
            {"id": "1", "name": "docs", "type": "folder", "path": "/docs",
             "uploaded_at": "2024-05-01T10:00:00", "children": [
                {"id": "2", "name": "a.csv", "type": "file", "size": 10,
                 "mime_type": "text/csv", "path": "/docs/a.csv",
                 "uploaded_at": "2024-05-01T10:00:00.123456"}
             ]},
            {"id": "3", "name": "empty", "type": "folder", "path": "/empty",
             "uploaded_at": "2024-05-01T10:00:00Z", "children": null}
        ]"#;

        let nodes: Vec<FileNode> = serde_json::from_str(json).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind, NodeKind::Folder);
        assert_eq!(nodes[0].children.len(), 1);
        assert_eq!(nodes[0].children[0].size, Some(10));
        assert_eq!(nodes[0].children[0].mime_type.as_deref(), Some("text/csv"));
        assert!(nodes[1].children.is_empty());
        assert!(nodes[0].size.is_none());
    }

    #[test]
    fn test_deserialize_rejects_bad_timestamp() {
        let json = r#"{"id": "1", "name": "x", "type": "file", "path": "/x",
                       "uploaded_at": "yesterday"}"#;
        assert!(serde_json::from_str::<FileNode>(json).is_err());
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2024-05-01T10:00:00+09:00").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00").is_some());
        assert!(parse_timestamp("2024-05-01").is_none());
    }

    #[test]
    fn test_parent_folder_prefers_explicit_field() {
        let mut node = FileNode::file("a", "/docs/a.csv", 1);
        assert_eq!(node.parent_folder(), "/docs");

        node.folder_path = Some("archive/".to_string());
        assert_eq!(node.parent_folder(), "/archive");

        node.folder_path = Some(String::new());
        assert_eq!(node.parent_folder(), "/docs");
    }

    #[test]
    fn test_find_and_count() {
        let tree = sample_tree();
        assert_eq!(count_nodes(&tree), 5);
        assert_eq!(find_by_id(&tree, "b").unwrap().path, "/docs/2024/b.json");
        assert_eq!(find_by_path(&tree, "/c.png").unwrap().id, "c");
        assert!(find_by_id(&tree, "zzz").is_none());
    }

    #[test]
    fn test_walk_depths() {
        let tree = sample_tree();
        let mut seen = Vec::new();
        walk(&tree, &mut |node, depth| seen.push((node.id.clone(), depth)));
        assert_eq!(
            seen,
            vec![
                ("f1".to_string(), 0),
                ("a".to_string(), 1),
                ("f2".to_string(), 1),
                ("b".to_string(), 2),
                ("c".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_total_size() {
        let tree = sample_tree();
        assert_eq!(tree[0].total_size(), 150);
        assert_eq!(tree[1].total_size(), 7);
    }

    #[test]
    fn test_check_paths() {
        let mut tree = sample_tree();
        assert!(check_paths(&tree).is_empty());

        tree[0].children[0].path = "/elsewhere/a.csv".to_string();
        let mismatches = check_paths(&tree);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].id, "a");
        assert_eq!(mismatches[0].expected, "/docs/a.csv");
    }
}

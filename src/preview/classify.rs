//! Preview type classification.

use crate::tree::FileNode;

/// How a file can be previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewKind {
    /// Shown directly by an image renderer.
    Image,
    /// Shown directly by an embedded document viewer.
    Pdf,
    /// Fetched and shown as a table.
    Csv,
    /// Fetched and shown pretty-printed.
    Json,
    /// No preview.
    Unsupported,
}

impl PreviewKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewKind::Image => "image",
            PreviewKind::Pdf => "pdf",
            PreviewKind::Csv => "csv",
            PreviewKind::Json => "json",
            PreviewKind::Unsupported => "unsupported",
        }
    }

    /// Whether the dispatcher fetches the content itself.
    pub fn needs_fetch(&self) -> bool {
        matches!(self, PreviewKind::Csv | PreviewKind::Json)
    }

    /// Whether the content is handed to an external renderer by URL.
    pub fn is_direct(&self) -> bool {
        matches!(self, PreviewKind::Image | PreviewKind::Pdf)
    }
}

impl std::fmt::Display for PreviewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify by content type, falling back to the name's extension.
///
/// A non-empty `mime_type` is authoritative: an unrecognized one yields
/// [`PreviewKind::Unsupported`] even if the extension would match.
pub fn classify(mime_type: Option<&str>, name: &str) -> PreviewKind {
    match mime_type.map(str::trim).filter(|m| !m.is_empty()) {
        Some(mime) => classify_mime(mime),
        None => classify_extension(name),
    }
}

/// Classify a tree node.
pub fn classify_node(node: &FileNode) -> PreviewKind {
    classify(node.mime_type.as_deref(), &node.name)
}

fn classify_mime(mime: &str) -> PreviewKind {
    let mime = mime.to_ascii_lowercase();
    let essence = mime.split(';').next().unwrap_or_default().trim();
    if essence.starts_with("image/") {
        PreviewKind::Image
    } else if essence == "application/pdf" {
        PreviewKind::Pdf
    } else if essence == "text/csv" || essence == "application/vnd.ms-excel" {
        PreviewKind::Csv
    } else if essence == "application/json" {
        PreviewKind::Json
    } else {
        PreviewKind::Unsupported
    }
}

fn classify_extension(name: &str) -> PreviewKind {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return PreviewKind::Unsupported;
    };
    match ext.to_ascii_lowercase().as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "webp" => PreviewKind::Image,
        "pdf" => PreviewKind::Pdf,
        "csv" => PreviewKind::Csv,
        "json" => PreviewKind::Json,
        _ => PreviewKind::Unsupported,
    }
}

//! Data carried across the remote store boundary.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the bytes of an upload come from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// A file on local disk, streamed at transfer time.
    Path(PathBuf),
    /// In-memory content (drag-and-drop payloads, tests).
    Bytes(Vec<u8>),
}

/// One file in an upload batch.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name sent with the payload.
    pub name: String,
    /// Position inside a picked directory, e.g. `photos/2024/a.jpg`.
    /// Empty when the file was picked on its own.
    pub relative_path: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type, guessed from the name when not known.
    pub mime_type: String,
    /// Content source.
    pub source: UploadSource,
}

impl UploadFile {
    /// Create an upload file from in-memory content.
    pub fn from_bytes(name: impl Into<String>, content: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            mime_type: guess_mime(&name),
            size: content.len() as u64,
            relative_path: String::new(),
            source: UploadSource::Bytes(content),
            name,
        }
    }

    /// Set the relative path.
    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = relative_path.into();
        self
    }
}

/// Guess a content type from a file name.
pub fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// A batch of files sent in a single upload call.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    /// Normalized destination folder.
    pub destination: String,
    /// Files, in staging order.
    pub files: Vec<UploadFile>,
}

impl UploadBatch {
    /// Relative paths, parallel to `files`.
    pub fn relative_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.relative_path.clone()).collect()
    }

    /// Total payload bytes.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Bytes transferred so far in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes sent.
    pub loaded: u64,
    /// Bytes in the batch.
    pub total: u64,
}

impl UploadProgress {
    /// Rounded percentage in 0..=100.
    ///
    /// An empty batch counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let loaded = self.loaded.min(self.total) as f64;
        ((loaded * 100.0) / self.total as f64).round() as u8
    }
}

/// Progress callback invoked on every transfer tick.
pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Shared byte counter feeding a [`ProgressFn`].
pub struct ProgressTracker {
    loaded: AtomicU64,
    total: u64,
    callback: ProgressFn,
}

impl ProgressTracker {
    /// Create a tracker for `total` bytes.
    pub fn new(total: u64, callback: ProgressFn) -> Arc<Self> {
        Arc::new(Self {
            loaded: AtomicU64::new(0),
            total,
            callback,
        })
    }

    /// Record `bytes` more transferred and report.
    pub fn advance(&self, bytes: u64) {
        let loaded = self.loaded.fetch_add(bytes, Ordering::Relaxed) + bytes;
        (self.callback)(UploadProgress {
            loaded,
            total: self.total,
        });
    }

    /// Bytes recorded so far.
    pub fn loaded(&self) -> u64 {
        self.loaded.load(Ordering::Relaxed)
    }
}

/// Storage usage summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    /// Sum of file sizes in bytes.
    pub total_size: u64,
    /// Number of files.
    pub file_count: u64,
}

/// A flat file record, as returned by search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Store id.
    pub id: String,
    /// Name the file was uploaded with.
    pub original_filename: String,
    /// Size in bytes.
    #[serde(default)]
    pub file_size: u64,
    /// Content type.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Folder containing the file.
    #[serde(default = "default_folder_path")]
    pub folder_path: String,
    /// Whether the record is a folder.
    #[serde(default)]
    pub is_folder: bool,
    /// Upload time.
    #[serde(deserialize_with = "crate::tree::deserialize_timestamp")]
    pub uploaded_at: DateTime<Utc>,
}

fn default_folder_path() -> String {
    crate::paths::ROOT.to_string()
}

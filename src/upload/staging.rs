//! Upload staging list.
//!
//! Files picked one by one, whole directories and drag-and-drop payloads all
//! go through [`StagingList::stage`], so the same ignore policy and size
//! limit apply whatever the source.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::UploadConfig;
use crate::notify::{Notification, NotificationCenter};
use crate::paths::IgnorePolicy;
use crate::store::{guess_mime, UploadFile, UploadSource};
use crate::{FolioError, Result};

/// What happened to the entries handed to the staging list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Entries added to the list.
    pub staged: usize,
    /// Entries silently dropped by the ignore policy.
    pub ignored: usize,
    /// Names of entries refused for exceeding the size limit.
    pub rejected: Vec<String>,
}

impl StageReport {
    fn merge(&mut self, other: StageReport) {
        self.staged += other.staged;
        self.ignored += other.ignored;
        self.rejected.extend(other.rejected);
    }
}

/// Files chosen for upload but not yet sent.
pub struct StagingList {
    policy: IgnorePolicy,
    max_file_size: u64,
    files: Vec<UploadFile>,
    notifications: NotificationCenter,
}

impl StagingList {
    /// Create an empty staging list.
    pub fn new(config: &UploadConfig, notifications: NotificationCenter) -> Self {
        Self {
            policy: IgnorePolicy::new(config.ignored_names.iter().cloned()),
            max_file_size: config.max_file_size_bytes(),
            files: Vec::new(),
            notifications,
        }
    }

    /// Staged files, in the order they were added.
    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    /// Number of staged files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total bytes staged.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Remove the file at `index`.
    pub fn remove(&mut self, index: usize) -> Option<UploadFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    /// Drop everything staged.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Filter one candidate and append it if it passes.
    pub fn stage(&mut self, file: UploadFile) -> StageReport {
        let mut report = StageReport::default();
        if self.policy.is_ignored(&file.name, &file.relative_path) {
            debug!(name = %file.name, relative_path = %file.relative_path, "ignored upload entry");
            report.ignored += 1;
            return report;
        }
        if file.size > self.max_file_size {
            let err = FolioError::Validation(format!(
                "{} exceeds the {} MB limit",
                file.name,
                self.max_file_size / (1024 * 1024)
            ));
            warn!("{}", err);
            self.notifications
                .emit(Notification::error("File too large").with_description(err.user_message("")));
            report.rejected.push(file.name);
            return report;
        }
        self.files.push(file);
        report.staged += 1;
        report
    }

    /// Stage individually picked files.
    pub fn add_files<I, P>(&mut self, paths: I) -> Result<StageReport>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = StageReport::default();
        for path in paths {
            let file = disk_file(path.as_ref(), String::new())?;
            report.merge(self.stage(file));
        }
        Ok(report)
    }

    /// Stage every file below `root`.
    ///
    /// Relative paths start with the directory's own name, so picking
    /// `photos/` yields `photos/2024/a.jpg`. Hidden and ignored directories
    /// are not descended into.
    pub fn add_directory(&mut self, root: &Path) -> Result<StageReport> {
        if !root.is_dir() {
            return Err(FolioError::Validation(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        let root = std::fs::canonicalize(root)?;
        let base = root.parent().map(Path::to_path_buf).unwrap_or_default();
        let policy = self.policy.clone();

        let mut report = StageReport::default();
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !policy.is_ignored(&entry.file_name().to_string_lossy(), "")
            });

        for entry in walker {
            let entry = entry.map_err(|e| FolioError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = relative_path(entry.path().strip_prefix(&base).unwrap_or(entry.path()));
            let file = disk_file(entry.path(), relative)?;
            report.merge(self.stage(file));
        }
        Ok(report)
    }

    /// Stage files dropped onto the explorer.
    pub fn add_dropped(&mut self, files: Vec<UploadFile>) -> StageReport {
        let mut report = StageReport::default();
        for file in files {
            report.merge(self.stage(file));
        }
        report
    }
}

/// Describe a file on disk as an upload candidate.
fn disk_file(path: &Path, relative_path: String) -> Result<UploadFile> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(FolioError::Validation(format!("{} is not a file", path.display())));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| FolioError::Validation(format!("{} has no file name", path.display())))?;
    Ok(UploadFile {
        mime_type: guess_mime(&name),
        size: metadata.len(),
        relative_path,
        source: UploadSource::Path(PathBuf::from(path)),
        name,
    })
}

/// `/`-joined relative path, whatever the platform separator.
fn relative_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(seg) => Some(seg.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

//! Path utilities for the folder hierarchy.
//!
//! Folder paths in the hierarchy are `/`-rooted with no trailing slash,
//! except the root itself which is exactly `/`. Every component that builds
//! or compares folder paths (upload destinations, selection, folder creation)
//! goes through [`normalize_folder_path`] so the rules are applied once.

/// Root folder path.
pub const ROOT: &str = "/";

/// Entry names that are never uploaded, besides dotfiles in general.
pub const DEFAULT_IGNORED_NAMES: &[&str] = &[".DS_Store", ".gitignore", ".git"];

/// Normalize a folder path.
///
/// Trims whitespace, strips every leading and trailing slash, and prefixes
/// exactly one slash. Empty input yields the root `/`. Interior segments are
/// left untouched.
///
/// The function is idempotent.
pub fn normalize_folder_path(input: &str) -> String {
    let trimmed = input.trim().trim_matches('/');
    if trimmed.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Normalize an optional folder path; `None` is the root.
pub fn normalize_optional(input: Option<&str>) -> String {
    normalize_folder_path(input.unwrap_or_default())
}

/// Folder containing `path`.
///
/// Drops the last `/`-delimited segment and normalizes what remains, so the
/// parent of a top-level entry is `/`.
pub fn parent_folder_of(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => normalize_folder_path(&trimmed[..idx]),
        None => ROOT.to_string(),
    }
}

/// Path of a child named `name` inside `parent`.
pub fn join_path(parent: &str, name: &str) -> String {
    let parent = normalize_folder_path(parent);
    let name = name.trim_matches('/');
    if parent == ROOT {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Last segment of a path.
pub fn leaf_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Split a relative upload path such as `photos/2024/a.jpg` into its
/// directory segments and file name.
///
/// Empty and `.` segments are dropped. A path without directories yields an
/// empty segment list.
pub fn split_relative_path(relative: &str) -> (Vec<&str>, Option<&str>) {
    let mut segments: Vec<&str> = relative
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    let file = segments.pop();
    (segments, file)
}

/// Exclusion policy for upload candidates.
///
/// A single policy is shared by the file picker, the directory picker and
/// drag-and-drop so every source drops the same entries.
#[derive(Debug, Clone)]
pub struct IgnorePolicy {
    names: Vec<String>,
}

impl IgnorePolicy {
    /// Create a policy with extra ignored names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether an entry must be skipped.
    ///
    /// Skips dotfiles, the configured metadata names, and anything whose
    /// relative path passes through a hidden directory such as `.git`.
    pub fn is_ignored(&self, name: &str, relative_path: &str) -> bool {
        if name.starts_with('.') || self.names.iter().any(|n| n == name) {
            return true;
        }

        let (dirs, file) = split_relative_path(relative_path);
        dirs.iter()
            .chain(file.iter())
            .any(|seg| seg.starts_with('.') || self.names.iter().any(|n| n == seg))
    }
}

impl Default for IgnorePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORED_NAMES.iter().copied())
    }
}

/// Whether an upload candidate is ignorable under the default policy.
pub fn is_ignorable_entry(name: &str, relative_path: &str) -> bool {
    IgnorePolicy::default().is_ignored(name, relative_path)
}

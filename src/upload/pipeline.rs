//! Upload commit.

use tracing::{error, info};

use super::staging::StagingList;
use crate::notify::{Notification, NotificationCenter};
use crate::paths::normalize_optional;
use crate::store::{ProgressFn, SharedStore, UploadBatch};
use crate::{FolioError, Result};

/// Summary of a committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    /// Normalized destination folder.
    pub destination: String,
    /// Number of files sent.
    pub files: usize,
    /// Bytes sent.
    pub bytes: u64,
}

/// Sends staged files to the store in one batch.
///
/// The pipeline does not own the tree; callers refresh it after a
/// successful commit.
pub struct UploadPipeline {
    store: SharedStore,
    notifications: NotificationCenter,
}

impl UploadPipeline {
    /// Create a pipeline.
    pub fn new(store: SharedStore, notifications: NotificationCenter) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Upload everything in `staging` to `destination` (the root when `None`).
    ///
    /// The staging list is cleared on success and kept intact on failure so
    /// the user can retry. `progress` is called on every transfer tick.
    pub async fn commit(
        &self,
        staging: &mut StagingList,
        destination: Option<&str>,
        progress: ProgressFn,
    ) -> Result<UploadSummary> {
        if staging.is_empty() {
            self.notifications.emit(
                Notification::warning("No files selected")
                    .with_description("Please select files to upload"),
            );
            return Err(FolioError::Validation("No files selected".to_string()));
        }

        let batch = UploadBatch {
            destination: normalize_optional(destination),
            files: staging.files().to_vec(),
        };
        let summary = UploadSummary {
            destination: batch.destination.clone(),
            files: batch.files.len(),
            bytes: batch.total_bytes(),
        };

        match self.store.upload_batch(batch, progress).await {
            Ok(()) => {
                info!(
                    files = summary.files,
                    bytes = summary.bytes,
                    destination = %summary.destination,
                    "upload complete"
                );
                self.notifications.emit(
                    Notification::success("Success")
                        .with_description(format!("{} file(s) uploaded successfully", summary.files)),
                );
                staging.clear();
                Ok(summary)
            }
            Err(e) => {
                error!(destination = %summary.destination, "upload failed: {}", e);
                self.notifications.emit(
                    Notification::error("Upload failed")
                        .with_description(e.user_message("Failed to upload files")),
                );
                Err(e)
            }
        }
    }
}

//! Server-side processing jobs.
//!
//! A selected file can be handed to a named job on the server. The job itself
//! is opaque: the client passes the file path and relays the message it gets
//! back.

use tracing::{error, info};

use crate::notify::{Notification, NotificationCenter};
use crate::store::SharedStore;
use crate::tree::FileNode;
use crate::{FolioError, Result};

/// A named processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingAction {
    /// Import organizations from a spreadsheet.
    ImportOrganizations,
    /// Import emission sources.
    ImportEmissionSources,
    /// Load BAR data.
    LoadBarData,
}

impl ProcessingAction {
    /// All actions, in menu order.
    pub const ALL: [ProcessingAction; 3] = [
        ProcessingAction::ImportOrganizations,
        ProcessingAction::ImportEmissionSources,
        ProcessingAction::LoadBarData,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingAction::ImportOrganizations => "Import Organizations",
            ProcessingAction::ImportEmissionSources => "Import Emission Sources",
            ProcessingAction::LoadBarData => "Load BAR Data",
        }
    }

    /// Endpoint path, relative to the store base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ProcessingAction::ImportOrganizations => "/api/processing/createorg",
            ProcessingAction::ImportEmissionSources => "/api/processing/ingestes",
            ProcessingAction::LoadBarData => "/api/processing/ingestbar",
        }
    }

    /// Short job name, the last segment of the endpoint.
    pub fn job(&self) -> &'static str {
        let endpoint = self.endpoint();
        endpoint.rsplit('/').next().unwrap_or(endpoint)
    }

    /// Look up an action by its label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.label() == label)
    }

    /// Look up an action by label or job name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.label().eq_ignore_ascii_case(name) || a.job().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for ProcessingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Run `action` on a selected file and report the result.
///
/// Folders cannot be processed. The store's message is relayed verbatim in
/// the notification.
pub async fn run_action(
    store: &SharedStore,
    notifications: &NotificationCenter,
    node: &FileNode,
    action: ProcessingAction,
) -> Result<String> {
    if !node.is_file() {
        let err = FolioError::Validation("Select a file to process".to_string());
        notifications.emit(Notification::error("Processing failed").with_description(err.user_message("")));
        return Err(err);
    }

    match store.run_processing(&node.path, action).await {
        Ok(message) => {
            info!(action = %action, path = %node.path, "processing completed");
            notifications.emit(
                Notification::success("Processing completed successfully").with_description(&message),
            );
            Ok(message)
        }
        Err(e) => {
            error!(action = %action, path = %node.path, "processing failed: {}", e);
            notifications.emit(
                Notification::error("Processing failed").with_description(e.user_message("Unknown error")),
            );
            Err(e)
        }
    }
}

//! User-visible notifications.
//!
//! Every operation boundary converts its outcome into a [`Notification`] and
//! publishes it on a broadcast channel; the front end decides how to show it.

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Maximum number of notifications buffered for slow subscribers.
const CHANNEL_CAPACITY: usize = 64;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Operation succeeded.
    Success,
    /// Neutral information.
    Info,
    /// Operation partly succeeded, or needs attention.
    Warning,
    /// Operation failed.
    Error,
}

impl NotificationLevel {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Success => "success",
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        }
    }
}

/// A notification shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Short title.
    pub title: String,
    /// Optional detail line.
    pub description: Option<String>,
}

impl Notification {
    fn new(level: NotificationLevel, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: None,
        }
    }

    /// Success notification.
    pub fn success(title: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title)
    }

    /// Informational notification.
    pub fn info(title: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title)
    }

    /// Warning notification.
    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, title)
    }

    /// Error notification.
    pub fn error(title: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "[{}] {}: {}", self.level.as_str(), self.title, desc),
            None => write!(f, "[{}] {}", self.level.as_str(), self.title),
        }
    }
}

/// Fan-out point for notifications.
///
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    sender: broadcast::Sender<Notification>,
}

impl NotificationCenter {
    /// Create a new notification center.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to notifications emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Publish a notification. Also logs it.
    pub fn emit(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success | NotificationLevel::Info => info!("{}", notification),
            NotificationLevel::Warning => warn!("{}", notification),
            NotificationLevel::Error => error!("{}", notification),
        }
        if self.sender.send(notification).is_err() {
            debug!("notification dropped: no subscribers");
        }
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

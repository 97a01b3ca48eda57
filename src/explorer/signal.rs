//! Expand-all / collapse-all broadcast.
//!
//! Two counters are published on `watch` channels. Each folder holds its own
//! [`FolderSignal`] subscription and reacts to a counter *changing*, never to
//! its value, so no registry of live folders is needed. Both counters draw
//! from one shared sequence, which orders commands issued between two polls:
//! when both changed, the one with the larger value was issued last.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// A broadcast command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastCommand {
    /// Open every folder.
    ExpandAll,
    /// Close every folder.
    CollapseAll,
}

struct SignalInner {
    sequence: AtomicU64,
    expand: watch::Sender<u64>,
    collapse: watch::Sender<u64>,
}

/// Publisher side of the expand/collapse signals.
#[derive(Clone)]
pub struct BroadcastSignals {
    inner: Arc<SignalInner>,
}

impl BroadcastSignals {
    /// Create a new signal pair.
    pub fn new() -> Self {
        let (expand, _) = watch::channel(0);
        let (collapse, _) = watch::channel(0);
        Self {
            inner: Arc::new(SignalInner {
                sequence: AtomicU64::new(0),
                expand,
                collapse,
            }),
        }
    }

    /// Publish a command to every subscribed folder.
    pub fn send(&self, command: BroadcastCommand) {
        let value = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let sender = match command {
            BroadcastCommand::ExpandAll => &self.inner.expand,
            BroadcastCommand::CollapseAll => &self.inner.collapse,
        };
        sender.send_replace(value);
    }

    /// Current `(expand, collapse)` counter values.
    pub fn counters(&self) -> (u64, u64) {
        (*self.inner.expand.borrow(), *self.inner.collapse.borrow())
    }

    /// Subscribe a folder. Commands issued before this call are not seen.
    pub fn subscribe(&self) -> FolderSignal {
        let mut expand = self.inner.expand.subscribe();
        let mut collapse = self.inner.collapse.subscribe();
        expand.borrow_and_update();
        collapse.borrow_and_update();
        FolderSignal { expand, collapse }
    }
}

impl Default for BroadcastSignals {
    fn default() -> Self {
        Self::new()
    }
}

/// One folder's subscription to the broadcast signals.
pub struct FolderSignal {
    expand: watch::Receiver<u64>,
    collapse: watch::Receiver<u64>,
}

impl FolderSignal {
    /// Latest command issued since the previous poll, if any.
    pub fn poll(&mut self) -> Option<BroadcastCommand> {
        let expand_changed = self.expand.has_changed().unwrap_or(false);
        let collapse_changed = self.collapse.has_changed().unwrap_or(false);
        let expand = *self.expand.borrow_and_update();
        let collapse = *self.collapse.borrow_and_update();

        match (expand_changed, collapse_changed) {
            (false, false) => None,
            (true, false) => Some(BroadcastCommand::ExpandAll),
            (false, true) => Some(BroadcastCommand::CollapseAll),
            (true, true) if expand > collapse => Some(BroadcastCommand::ExpandAll),
            (true, true) => Some(BroadcastCommand::CollapseAll),
        }
    }

    /// Apply any pending command to `expanded`.
    pub fn apply(&mut self, expanded: &mut bool) {
        match self.poll() {
            Some(BroadcastCommand::ExpandAll) => *expanded = true,
            Some(BroadcastCommand::CollapseAll) => *expanded = false,
            None => {}
        }
    }
}

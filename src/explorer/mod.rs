//! Explorer: selection, folder expansion and tree rows.
//!
//! This module provides:
//! - Single-file selection with the containing folder resolved
//! - Per-folder expansion with expand-all / collapse-all broadcasts
//! - Read-only mode for pick-a-file views
//! - Flattened rows for display

mod controller;
mod signal;
mod view;

pub use controller::{Explorer, SelectedFile, Selection};
pub use signal::{BroadcastCommand, BroadcastSignals, FolderSignal};
pub use view::TreeRow;

//! File previews.
//!
//! Classification is a pure function of the node's content type and name;
//! rendering is a pure function of the fetched text. The dispatcher ties the
//! two to the current selection and owns cancellation.

mod classify;
mod dispatcher;
mod render;

pub use classify::{classify, classify_node, PreviewKind};
pub use dispatcher::{PreviewContent, PreviewDispatcher, PreviewState, RendererEvent};
pub use render::{render_csv, render_json, CsvTable, JsonText, TRUNCATION_MARKER};

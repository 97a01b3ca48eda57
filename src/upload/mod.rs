//! Upload pipeline for Folio.
//!
//! Candidates are collected into a [`StagingList`] from any of three sources
//! (file picker, directory walk, drag-and-drop), reviewed, then committed in
//! a single batch by [`UploadPipeline`].

mod pipeline;
mod staging;

pub use pipeline::{UploadPipeline, UploadSummary};
pub use staging::{StageReport, StagingList};

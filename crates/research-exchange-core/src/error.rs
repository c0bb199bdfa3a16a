//! Error types for entry extraction.
//!
//! Extraction errors never abort a build: the extractor logs them and skips
//! the offending entry. They exist so the skip reason is explicit and testable.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// The candidate node has no citation sub-node.
    #[error("entry {id} has no citation element (.{class})")]
    MissingCitation { id: String, class: String },
}

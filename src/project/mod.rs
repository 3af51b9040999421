//! Project data consumed by the build: hierarchy, document metadata and the
//! content folder layout.

pub mod content;
pub mod document;
pub mod hierarchy;

pub use content::ContentLayout;
pub use document::{DocumentInfo, DocumentLayout, DocumentMetadata};
pub use hierarchy::{Chapter, DisplayNumber, Hierarchy, Page};

use std::path::PathBuf;
use thiserror::Error;

/// Error loading project data
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Content mismatch: {0}")]
    ContentMismatch(String),
}

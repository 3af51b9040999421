//! Document metadata and layout constants.
//!
//! `metadata.json` carries title and authors; `constants.json` carries the
//! display flags that decide which frontmatter sections exist. Both files
//! hold many more keys used only by the Typst templates; unknown keys are
//! ignored.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::ProjectError;

/// Title and authorship from `metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
}

/// Title/author pair stamped onto the merged PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
}

impl DocumentMetadata {
    /// Load `metadata.json`; a missing file yields empty metadata.
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        load_optional_json(path)
    }

    /// Resolve the info block, using `fallback_title` when no title is set.
    pub fn info(&self, fallback_title: &str) -> DocumentInfo {
        let title = match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => fallback_title.to_string(),
        };
        DocumentInfo { title, author: self.authors.join(", ") }
    }
}

/// Display flags from `constants.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLayout {
    #[serde(rename = "display-cover", default = "default_true")]
    pub display_cover: bool,
    #[serde(rename = "display-outline", default = "default_true")]
    pub display_outline: bool,
    #[serde(rename = "display-chap-cover", default = "default_true")]
    pub display_chapter_cover: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self { display_cover: true, display_outline: true, display_chapter_cover: true }
    }
}

impl DocumentLayout {
    /// Load `constants.json`; a missing file yields all sections enabled.
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        load_optional_json(path)
    }
}

fn load_optional_json<T>(path: &Path) -> Result<T, ProjectError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let text = fs::read_to_string(path)
        .map_err(|source| ProjectError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| ProjectError::Json { path: path.to_path_buf(), source })
}

//! Chapter/page hierarchy loaded from `hierarchy.json`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use super::ProjectError;

/// Explicit display number of a chapter or page.
///
/// Authors write either `"number": 3` or `"number": "A"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayNumber {
    Int(i64),
    Text(String),
}

impl fmt::Display for DisplayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayNumber::Int(n) => write!(f, "{}", n),
            DisplayNumber::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A single page (section) of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<DisplayNumber>,
}

/// A chapter with its ordered pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<DisplayNumber>,
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// Ordered chapters of a document.
///
/// A build treats the hierarchy as an immutable snapshot; page identity is
/// the `(chapter_index, page_index)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hierarchy {
    chapters: Vec<Chapter>,
}

impl Hierarchy {
    /// Create a hierarchy from chapters.
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self { chapters }
    }

    /// Parse a hierarchy from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a hierarchy file.
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ProjectError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text)
            .map_err(|source| ProjectError::Json { path: path.to_path_buf(), source })
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapter(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    pub fn page(&self, chapter: usize, page: usize) -> Option<&Page> {
        self.chapters.get(chapter).and_then(|c| c.pages.get(page))
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Total number of pages across all chapters.
    pub fn page_count(&self) -> usize {
        self.chapters.iter().map(|c| c.pages.len()).sum()
    }

    /// Display number of a chapter, falling back to its 1-based position.
    pub fn chapter_number(&self, index: usize) -> String {
        match self.chapters.get(index).and_then(|c| c.number.as_ref()) {
            Some(n) => n.to_string(),
            None => (index + 1).to_string(),
        }
    }

    /// Display number of a page, falling back to its 1-based position.
    pub fn page_number(&self, chapter: usize, page: usize) -> String {
        match self.page(chapter, page).and_then(|p| p.number.as_ref()) {
            Some(n) => n.to_string(),
            None => (page + 1).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"title": "Limits", "pages": [{"title": "Intro"}, {"title": "Epsilon-delta", "number": 7}]},
        {"title": "Series", "number": "A", "pages": [{"title": "Convergence"}]}
    ]"#;

    #[test]
    fn test_parse_hierarchy() {
        let h = Hierarchy::from_json(SAMPLE).unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h.page_count(), 3);
        assert_eq!(h.chapter(1).unwrap().title, "Series");
        assert_eq!(h.page(0, 1).unwrap().title, "Epsilon-delta");
        assert!(h.page(1, 5).is_none());
    }

    #[test]
    fn test_display_numbers_fall_back_to_position() {
        let h = Hierarchy::from_json(SAMPLE).unwrap();
        assert_eq!(h.chapter_number(0), "1");
        assert_eq!(h.chapter_number(1), "A");
        assert_eq!(h.page_number(0, 0), "1");
        assert_eq!(h.page_number(0, 1), "7");
    }

    #[test]
    fn test_chapter_without_pages() {
        let h = Hierarchy::from_json(r#"[{"title": "Empty"}]"#).unwrap();
        assert_eq!(h.page_count(), 0);
        assert!(h.chapter(0).unwrap().pages.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Hierarchy::load(Path::new("/nonexistent/hierarchy.json")).unwrap_err();
        assert!(matches!(err, ProjectError::Io { .. }));
    }

    #[test]
    fn test_serialize_omits_missing_numbers() {
        let h = Hierarchy::new(vec![Chapter {
            title: "One".to_string(),
            number: None,
            pages: vec![Page { title: "P".to_string(), number: Some(DisplayNumber::Int(2)) }],
        }]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"[{"title":"One","pages":[{"title":"P","number":2}]}]"#);
    }
}

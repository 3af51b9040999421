//! Content folder layout: `content/<chapter>/<page>.typ`.
//!
//! Chapter folders and page files are named with integers and sorted
//! numerically. The layout must agree with the hierarchy before a build may
//! start, and the folder names are handed to the table-of-contents pass so it
//! can print section ids.

use glob::{glob, Pattern};
use std::collections::BTreeMap;
use std::path::Path;

use super::{Hierarchy, ProjectError};

/// Numeric chapter folders and their numeric page files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentLayout {
    /// Chapter folder names in numeric order
    pub chapter_folders: Vec<String>,
    /// Page file stems per chapter index, in numeric order
    pub page_folders: BTreeMap<usize, Vec<String>>,
}

impl ContentLayout {
    /// Scan a content directory. A missing directory yields an empty layout.
    ///
    /// Folders without any numeric `.typ` file are skipped.
    pub fn scan(content_dir: &Path) -> Self {
        let mut layout = ContentLayout::default();
        if !content_dir.is_dir() {
            return layout;
        }

        let base = Pattern::escape(&content_dir.display().to_string());
        let mut chapter_dirs: Vec<(u64, String)> = glob(&format!("{}/*", base))
            .map(|paths| {
                paths
                    .filter_map(Result::ok)
                    .filter(|p| p.is_dir())
                    .filter_map(|p| numeric_name(p.file_name()?.to_str()?))
                    .collect()
            })
            .unwrap_or_default();
        chapter_dirs.sort();

        for (_, name) in chapter_dirs {
            let dir = content_dir.join(&name);
            let pattern = format!("{}/*.typ", Pattern::escape(&dir.display().to_string()));
            let mut pages: Vec<(u64, String)> = glob(&pattern)
                .map(|paths| {
                    paths
                        .filter_map(Result::ok)
                        .filter_map(|p| numeric_name(p.file_stem()?.to_str()?))
                        .collect()
                })
                .unwrap_or_default();
            if pages.is_empty() {
                continue;
            }
            pages.sort();
            let index = layout.chapter_folders.len();
            layout.chapter_folders.push(name);
            layout.page_folders.insert(index, pages.into_iter().map(|(_, n)| n).collect());
        }

        layout
    }

    /// Verify that chapter and page counts agree with the hierarchy.
    pub fn check(&self, hierarchy: &Hierarchy) -> Result<(), ProjectError> {
        if hierarchy.len() != self.chapter_folders.len() {
            return Err(ProjectError::ContentMismatch(format!(
                "hierarchy.json has {} chapters but content/ has {} folders ({})",
                hierarchy.len(),
                self.chapter_folders.len(),
                self.chapter_folders.join(", ")
            )));
        }

        for (ci, chapter) in hierarchy.chapters().iter().enumerate() {
            let actual = self.page_folders.get(&ci).map_or(0, Vec::len);
            if chapter.pages.len() != actual {
                let folder = &self.chapter_folders[ci];
                return Err(ProjectError::ContentMismatch(format!(
                    "chapter {} has {} pages in hierarchy but {} files in content/{}/",
                    folder,
                    chapter.pages.len(),
                    actual,
                    folder
                )));
            }
        }

        Ok(())
    }

    /// Typst inputs describing the folder names, passed to the outline pass.
    pub fn typst_inputs(&self) -> Vec<String> {
        let chapters = serde_json::to_string(&self.chapter_folders).unwrap_or_else(|_| "[]".into());
        let pages = serde_json::to_string(&self.page_folders).unwrap_or_else(|_| "{}".into());
        vec![
            "--input".to_string(),
            format!("chapter-folders={}", chapters),
            "--input".to_string(),
            format!("page-folders={}", pages),
        ]
    }
}

fn numeric_name(name: &str) -> Option<(u64, String)> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok().map(|n| (n, name.to_string()))
}

//! The set of pages chosen for a build.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use thiserror::Error;

use crate::project::Hierarchy;

/// Error building or parsing a selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("chapter {0} does not exist")]
    UnknownChapter(usize),
    #[error("page {chapter}/{page} does not exist")]
    UnknownPage { chapter: usize, page: usize },
    #[error("invalid selection '{0}': expected <chapter> or <chapter>/<page>")]
    Syntax(String),
    #[error("nothing selected")]
    Empty,
}

/// One `--select` item: a whole chapter or a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectItem {
    Chapter(usize),
    Page { chapter: usize, page: usize },
}

impl FromStr for SelectItem {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || SelectionError::Syntax(s.to_string());
        match s.trim().split_once('/') {
            Some((c, p)) => Ok(SelectItem::Page {
                chapter: c.trim().parse().map_err(|_| syntax())?,
                page: p.trim().parse().map_err(|_| syntax())?,
            }),
            None => Ok(SelectItem::Chapter(s.trim().parse().map_err(|_| syntax())?)),
        }
    }
}

/// Selected `(chapter_index, page_index)` pairs, grouped by chapter.
///
/// Chapters and pages iterate in ascending order. A chapter appears only
/// when at least one of its pages is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    by_chapter: BTreeMap<usize, BTreeSet<usize>>,
}

impl Selection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select every page of every chapter.
    pub fn all(hierarchy: &Hierarchy) -> Self {
        let mut selection = Self::new();
        for (ci, chapter) in hierarchy.chapters().iter().enumerate() {
            for pi in 0..chapter.pages.len() {
                selection.insert(ci, pi);
            }
        }
        selection
    }

    /// Build a selection from pairs, ignoring duplicates.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut selection = Self::new();
        for (ci, pi) in pairs {
            selection.insert(ci, pi);
        }
        selection
    }

    /// Resolve `--select` items against a hierarchy.
    pub fn from_items(items: &[SelectItem], hierarchy: &Hierarchy) -> Result<Self, SelectionError> {
        let mut selection = Self::new();
        for item in items {
            match *item {
                SelectItem::Chapter(ci) => {
                    let chapter = hierarchy.chapter(ci).ok_or(SelectionError::UnknownChapter(ci))?;
                    for pi in 0..chapter.pages.len() {
                        selection.insert(ci, pi);
                    }
                }
                SelectItem::Page { chapter, page } => selection.insert(chapter, page),
            }
        }
        selection.validate(hierarchy)?;
        Ok(selection)
    }

    pub fn insert(&mut self, chapter: usize, page: usize) {
        self.by_chapter.entry(chapter).or_default().insert(page);
    }

    pub fn remove(&mut self, chapter: usize, page: usize) {
        if let Some(pages) = self.by_chapter.get_mut(&chapter) {
            pages.remove(&page);
            if pages.is_empty() {
                self.by_chapter.remove(&chapter);
            }
        }
    }

    pub fn contains(&self, chapter: usize, page: usize) -> bool {
        self.by_chapter.get(&chapter).is_some_and(|p| p.contains(&page))
    }

    /// Selected page indices per chapter.
    pub fn by_chapter(&self) -> &BTreeMap<usize, BTreeSet<usize>> {
        &self.by_chapter
    }

    /// Sorted chapters with at least one selected page.
    pub fn chapters(&self) -> Vec<usize> {
        self.by_chapter.keys().copied().collect()
    }

    /// Selected pages of one chapter in ascending order.
    pub fn pages_of(&self, chapter: usize) -> Vec<usize> {
        self.by_chapter.get(&chapter).map(|p| p.iter().copied().collect()).unwrap_or_default()
    }

    /// Total number of selected pages.
    pub fn page_count(&self) -> usize {
        self.by_chapter.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_chapter.is_empty()
    }

    /// All selected pairs in build order.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        self.by_chapter.iter().flat_map(|(&ci, pages)| pages.iter().map(move |&pi| (ci, pi))).collect()
    }

    /// Check every pair against the hierarchy.
    pub fn validate(&self, hierarchy: &Hierarchy) -> Result<(), SelectionError> {
        for (ci, pi) in self.pairs() {
            if hierarchy.chapter(ci).is_none() {
                return Err(SelectionError::UnknownChapter(ci));
            }
            if hierarchy.page(ci, pi).is_none() {
                return Err(SelectionError::UnknownPage { chapter: ci, page: pi });
            }
        }
        Ok(())
    }
}

//! Compile targets and the ordered build plan.
//!
//! A compile target is one invocation of the typesetting compiler and
//! produces exactly one PDF in the scratch directory. The plan lists targets
//! in the order they are compiled, which is also the merge order.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::build::Selection;
use crate::project::{DocumentLayout, Hierarchy};

/// What a compile target renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Title page
    Cover,
    /// Preface
    Preface,
    /// Table of contents
    Outline,
    /// Chapter cover page
    ChapterCover { chapter: usize },
    /// One page (section) of a chapter
    Page { chapter: usize, page: usize },
}

impl TargetKind {
    /// Identifier understood by the renderer's `target` input.
    pub fn name(&self) -> String {
        match self {
            TargetKind::Cover => "cover".to_string(),
            TargetKind::Preface => "preface".to_string(),
            TargetKind::Outline => "outline".to_string(),
            TargetKind::ChapterCover { chapter } => format!("chapter-{}", chapter),
            TargetKind::Page { chapter, page } => format!("{}/{}", chapter, page),
        }
    }

    /// Page-map key of the section.
    ///
    /// Chapter covers are keyed by their 1-based position; every other
    /// target uses its compiler name.
    pub fn key(&self) -> String {
        match self {
            TargetKind::ChapterCover { chapter } => format!("chapter-{}", chapter + 1),
            other => other.name(),
        }
    }

    /// Artifact file name inside the scratch directory.
    pub fn file_name(&self) -> String {
        match self {
            TargetKind::Cover => "00_cover.pdf".to_string(),
            TargetKind::Preface => "01_preface.pdf".to_string(),
            TargetKind::Outline => "02_outline.pdf".to_string(),
            TargetKind::ChapterCover { chapter } => format!("10_chapter_{}_cover.pdf", chapter),
            TargetKind::Page { chapter, page } => format!("20_page_{}_{}.pdf", chapter, page),
        }
    }

    /// Whether this target belongs to the frontmatter.
    pub fn is_frontmatter(&self) -> bool {
        matches!(self, TargetKind::Cover | TargetKind::Preface | TargetKind::Outline)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One planned compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileTarget {
    pub kind: TargetKind,
    /// Compiler-facing identifier
    pub name: String,
    /// Page-map key
    pub key: String,
    /// Human-readable label for progress display
    pub label: String,
    /// Artifact path
    pub output: PathBuf,
}

impl CompileTarget {
    /// Create a target writing into `build_dir`.
    pub fn new(kind: TargetKind, label: impl Into<String>, build_dir: &Path) -> Self {
        Self {
            kind,
            name: kind.name(),
            key: kind.key(),
            label: label.into(),
            output: build_dir.join(kind.file_name()),
        }
    }
}

/// Ordered compile targets for one build.
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    targets: Vec<CompileTarget>,
    regenerate_outline: bool,
}

impl BuildPlan {
    /// Plan the targets for a selection.
    ///
    /// Frontmatter comes first (cover, preface, outline placeholder) when
    /// enabled, then per selected chapter its cover followed by its selected
    /// pages. Disabled display flags drop the corresponding targets.
    pub fn new(
        hierarchy: &Hierarchy,
        selection: &Selection,
        layout: &DocumentLayout,
        frontmatter: bool,
        build_dir: &Path,
    ) -> Self {
        let mut targets = Vec::new();

        if frontmatter {
            if layout.display_cover {
                targets.push(CompileTarget::new(TargetKind::Cover, "Cover", build_dir));
            }
            targets.push(CompileTarget::new(TargetKind::Preface, "Preface", build_dir));
            if layout.display_outline {
                targets.push(CompileTarget::new(TargetKind::Outline, "Table of Contents", build_dir));
            }
        }

        for (&ci, pages) in selection.by_chapter() {
            if hierarchy.chapter(ci).is_none() {
                continue;
            }
            if layout.display_chapter_cover {
                let label = format!("Chapter {}", hierarchy.chapter_number(ci));
                targets.push(CompileTarget::new(TargetKind::ChapterCover { chapter: ci }, label, build_dir));
            }
            for &pi in pages {
                let Some(page) = hierarchy.page(ci, pi) else {
                    continue;
                };
                let label = format!("Section {}: {}", hierarchy.page_number(ci, pi), page.title);
                targets.push(CompileTarget::new(TargetKind::Page { chapter: ci, page: pi }, label, build_dir));
            }
        }

        let regenerate_outline = targets.iter().any(|t| t.kind == TargetKind::Outline);
        Self { targets, regenerate_outline }
    }

    /// Targets in compile order.
    pub fn targets(&self) -> &[CompileTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The outline placeholder, if planned.
    pub fn outline(&self) -> Option<&CompileTarget> {
        self.targets.iter().find(|t| t.kind == TargetKind::Outline)
    }

    /// Whether the outline is recompiled after all other targets.
    pub fn regenerates_outline(&self) -> bool {
        self.regenerate_outline
    }

    /// Total progress units: one per planned target plus the outline pass.
    pub fn total_units(&self) -> usize {
        self.targets.len() + usize::from(self.regenerate_outline)
    }

    /// Artifact paths in merge order.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.targets.iter().map(|t| t.output.clone()).collect()
    }
}

//! Build context: configuration, resolved paths and per-build options.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::build::Toolchain;
use crate::config::{resolve_path, NoteworthyConfig};
use crate::project::{ContentLayout, DocumentLayout, DocumentMetadata, Hierarchy, ProjectError};

/// Options fixed for the duration of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Compile cover, preface and table of contents
    pub frontmatter: bool,
    /// Archive the individual section PDFs
    pub leave_individual: bool,
    /// Debug logging to a file
    pub debug: bool,
    /// Extra arguments appended to every compiler invocation
    pub typst_flags: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { frontmatter: true, leave_individual: false, debug: false, typst_flags: Vec::new() }
    }
}

/// Project data snapshot read before a build.
#[derive(Debug, Clone, Default)]
pub struct ProjectData {
    pub hierarchy: Hierarchy,
    pub metadata: DocumentMetadata,
    pub layout: DocumentLayout,
    pub content: ContentLayout,
}

impl ProjectData {
    /// Fail when the content folders disagree with the hierarchy.
    pub fn check_content(&self) -> Result<(), ProjectError> {
        self.content.check(&self.hierarchy)
    }
}

/// Build context containing configuration and paths for a build operation.
#[derive(Debug, Clone)]
pub struct BuildContext {
    config: NoteworthyConfig,
    /// Directory holding noteworthy.toml
    project_root: PathBuf,
    verbose: bool,
}

impl BuildContext {
    pub fn new(config: NoteworthyConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, verbose: false }
    }

    pub fn config(&self) -> &NoteworthyConfig {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        resolve_path(&self.project_root, path)
    }

    /// Typst entry template.
    pub fn renderer(&self) -> PathBuf {
        self.resolve_path(&self.config.project.renderer)
    }

    /// Scratch directory for section PDFs.
    pub fn build_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.build_dir)
    }

    /// Merged output PDF.
    pub fn output(&self) -> PathBuf {
        self.resolve_path(&self.config.project.output)
    }

    /// Archive of individual PDFs.
    pub fn archive(&self) -> PathBuf {
        self.resolve_path(&self.config.project.archive)
    }

    pub fn debug_log(&self) -> PathBuf {
        self.resolve_path(&self.config.build.debug_log)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.build.poll_interval_ms)
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain::from_config(&self.config.tools)
    }

    /// Build options from the `[build]` table.
    pub fn options(&self) -> BuildOptions {
        let build = &self.config.build;
        BuildOptions {
            frontmatter: build.frontmatter,
            leave_individual: build.leave_individual,
            debug: build.debug,
            typst_flags: build.typst_flags.clone(),
        }
    }

    /// Title used when `metadata.json` has none.
    pub fn fallback_title(&self) -> &str {
        &self.config.project.name
    }

    /// Read hierarchy, metadata, layout flags and the content layout.
    pub fn load_project(&self) -> Result<ProjectData, ProjectError> {
        let project = &self.config.project;
        Ok(ProjectData {
            hierarchy: Hierarchy::load(&self.resolve_path(&project.hierarchy))?,
            metadata: DocumentMetadata::load(&self.resolve_path(&project.metadata))?,
            layout: DocumentLayout::load(&self.resolve_path(&project.constants))?,
            content: ContentLayout::scan(&self.resolve_path(&project.content)),
        })
    }
}

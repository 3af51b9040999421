//! Build pipeline orchestration.
//!
//! [`BuildOrchestrator`] drives one build from the dependency check to the
//! final cleanup. Targets compile strictly one after another because every
//! page offset depends on the page counts of all earlier artifacts.
//!
//! # Example
//!
//! ```ignore
//! use noteworthy::build::{BuildContext, BuildOrchestrator, ConsoleProgress, Selection};
//!
//! let context = BuildContext::new(config, project_root);
//! let project = context.load_project()?;
//! let selection = Selection::all(&project.hierarchy);
//! let orchestrator = BuildOrchestrator::from_context(&context, context.options());
//!
//! let report = orchestrator.run(&project, &selection, &ConsoleProgress::new())?;
//! println!("{}", report.summary());
//! ```

use log::{debug, error, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::build::archive::archive_artifacts;
use crate::build::compiler::{CompileError, CompileRequest, SectionCompiler, TypstCompiler};
use crate::build::merge::ArtifactMerger;
use crate::build::metadata::{bookmark_text, write_bookmarks, MetadataWriter};
use crate::build::pages::{PageCounter, PdfInfo};
use crate::build::progress::{ProgressEvent, ProgressReporter, ProgressTracker, TargetStatus};
use crate::build::{
    BuildContext, BuildOptions, BuildOutcome, BuildPhase, BuildPlan, BuildReport, CompileTarget, PageMap,
    PageMapError, ProjectData, Requirement, Selection, SelectionError, TargetKind, TargetResult, Toolchain,
};

/// Error that stops a build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Missing required tools:\n{}", requirement_list(.0))]
    DependencyMissing(Vec<Requirement>),
    #[error("Invalid selection: {0}")]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Compile(CompileError),
    #[error("Build cancelled")]
    Cancelled,
    #[error("Page map error: {0}")]
    PageMap(#[from] PageMapError),
    #[error("Cannot prepare {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<CompileError> for BuildError {
    fn from(e: CompileError) -> Self {
        match e {
            CompileError::Cancelled => BuildError::Cancelled,
            other => BuildError::Compile(other),
        }
    }
}

impl BuildError {
    /// Compiler output attached to a failed compile.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            BuildError::Compile(CompileError::Failed { diagnostics, .. }) => Some(diagnostics),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}

fn requirement_list(requirements: &[Requirement]) -> String {
    requirements.iter().map(|r| format!("  - {}", r)).collect::<Vec<_>>().join("\n")
}

/// External collaborators of a build.
pub struct BuildBackends {
    pub compiler: Box<dyn SectionCompiler>,
    pub page_counter: Box<dyn PageCounter>,
    pub merger: ArtifactMerger,
    pub metadata: MetadataWriter,
    /// Checked before anything runs; `None` skips the check
    pub toolchain: Option<Toolchain>,
}

impl std::fmt::Debug for BuildBackends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildBackends")
            .field("merger", &self.merger)
            .field("metadata", &self.metadata)
            .field("toolchain", &self.toolchain)
            .finish_non_exhaustive()
    }
}

impl BuildBackends {
    /// The real tools named in the project configuration.
    pub fn from_context(context: &BuildContext) -> Self {
        let tools = context.toolchain();
        let build_dir = context.build_dir();
        let compiler =
            TypstCompiler::new(&tools.typst, context.renderer(), context.project_root().to_path_buf(), &build_dir)
                .with_poll_interval(context.poll_interval());

        Self {
            compiler: Box::new(compiler),
            page_counter: Box::new(PdfInfo::new(&tools.pdfinfo)),
            merger: ArtifactMerger::standard(&tools.pdfunite, &tools.ghostscript),
            metadata: MetadataWriter::standard(&tools.pdftk, &tools.ghostscript, build_dir),
            toolchain: Some(tools),
        }
    }
}

/// Mutable bookkeeping of one run.
#[derive(Debug, Default)]
struct RunState {
    tracker: ProgressTracker,
    page_map: PageMap,
    results: Vec<TargetResult>,
    diagnostics: String,
    warnings: Vec<String>,
}

impl RunState {
    fn warn(&mut self, reporter: &dyn ProgressReporter, target_id: Option<&str>, message: String) {
        warn!("{}", message);
        self.tracker.warning();
        self.warnings.push(message.clone());
        reporter.report(ProgressEvent::Warning { target_id: target_id.map(str::to_string), message });
    }
}

/// Drives a build of a selection into one merged PDF.
#[derive(Debug)]
pub struct BuildOrchestrator {
    backends: BuildBackends,
    options: BuildOptions,
    build_dir: PathBuf,
    output: PathBuf,
    archive: PathBuf,
    fallback_title: String,
}

impl BuildOrchestrator {
    /// Create an orchestrator writing section PDFs into `build_dir` and the
    /// merged document to `output`.
    pub fn new(backends: BuildBackends, build_dir: PathBuf, output: PathBuf) -> Self {
        let archive = build_dir.with_file_name("build_pdfs.zip");
        Self {
            backends,
            options: BuildOptions::default(),
            build_dir,
            output,
            archive,
            fallback_title: String::new(),
        }
    }

    /// Orchestrator using the project's configured tools and paths.
    pub fn from_context(context: &BuildContext, options: BuildOptions) -> Self {
        Self::new(BuildBackends::from_context(context), context.build_dir(), context.output())
            .with_options(options)
            .with_archive(context.archive())
            .with_fallback_title(context.fallback_title())
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Where individual PDFs are archived when requested.
    pub fn with_archive(mut self, archive: PathBuf) -> Self {
        self.archive = archive;
        self
    }

    /// Title stamped on the PDF when the metadata has none.
    pub fn with_fallback_title(mut self, title: impl Into<String>) -> Self {
        self.fallback_title = title.into();
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Plan the targets for a selection without compiling anything.
    pub fn plan(&self, project: &ProjectData, selection: &Selection) -> Result<BuildPlan, BuildError> {
        if selection.is_empty() {
            return Err(SelectionError::Empty.into());
        }
        selection.validate(&project.hierarchy)?;
        Ok(BuildPlan::new(&project.hierarchy, selection, &project.layout, self.options.frontmatter, &self.build_dir))
    }

    /// Run a complete build.
    ///
    /// A merge failure is not an error: the report's outcome says so and the
    /// section PDFs stay in the build directory. A cancelled build removes
    /// the build directory; a failed compile leaves it for inspection.
    pub fn run(
        &self,
        project: &ProjectData,
        selection: &Selection,
        reporter: &dyn ProgressReporter,
    ) -> Result<BuildReport, BuildError> {
        let mut state = RunState::default();
        let result = self.execute(project, selection, reporter, &mut state);

        match &result {
            Ok(report) => {
                reporter.report(ProgressEvent::PhaseChanged { phase: BuildPhase::Done });
                reporter.report(state.tracker.build_completed_event(true, report.total_pages));
            }
            Err(BuildError::Cancelled) => {
                info!("Build cancelled");
                self.remove_workspace();
                reporter.report(ProgressEvent::PhaseChanged { phase: BuildPhase::Cancelled });
                reporter.report(state.tracker.build_completed_event(false, 0));
            }
            Err(e) => {
                error!("Build failed: {}", e);
                reporter.report(ProgressEvent::PhaseChanged { phase: BuildPhase::Failed });
                reporter.report(ProgressEvent::Error { target_id: None, message: e.to_string() });
                reporter.report(state.tracker.build_completed_event(false, 0));
            }
        }

        result
    }

    fn execute(
        &self,
        project: &ProjectData,
        selection: &Selection,
        reporter: &dyn ProgressReporter,
        state: &mut RunState,
    ) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let plan = self.plan(project, selection)?;

        reporter.report(ProgressEvent::PhaseChanged { phase: BuildPhase::CheckingDependencies });
        if let Some(toolchain) = &self.backends.toolchain {
            let missing = toolchain.missing();
            if !missing.is_empty() {
                return Err(BuildError::DependencyMissing(missing));
            }
        }

        info!(
            "Building {} pages from {} chapters: {} targets, {} progress units",
            selection.page_count(),
            selection.chapters().len(),
            plan.len(),
            plan.total_units()
        );
        state.tracker.start(plan.total_units());
        reporter.report(ProgressEvent::BuildStarted {
            total_units: plan.total_units(),
            pages: selection.page_count(),
            chapters: selection.chapters().len(),
        });
        reporter.report(state.tracker.progress_event());

        reporter.report(ProgressEvent::PhaseChanged { phase: BuildPhase::PreparingWorkspace });
        self.prepare_workspace()?;

        let mut current_page: u32 = 1;
        let mut phase = BuildPhase::PreparingWorkspace;
        for target in plan.targets() {
            let target_phase = match target.kind {
                TargetKind::ChapterCover { chapter } | TargetKind::Page { chapter, .. } => {
                    BuildPhase::CompilingChapter(chapter)
                }
                _ => BuildPhase::CompilingFrontmatter,
            };
            if target_phase != phase {
                phase = target_phase;
                reporter.report(ProgressEvent::PhaseChanged { phase });
            }

            let offset = if target.kind.is_frontmatter() { None } else { Some(current_page) };
            let request = CompileRequest {
                target: &target.name,
                output: &target.output,
                page_offset: offset,
                page_map: None,
                extra_flags: &self.options.typst_flags,
            };
            let pages = self.compile_target(target, &target.label, &request, current_page, reporter, state)?;
            state.page_map.record(&target.key, current_page)?;
            current_page += pages;
        }

        if let Some(outline) = plan.outline().filter(|_| plan.regenerates_outline()) {
            reporter.report(ProgressEvent::PhaseChanged { phase: BuildPhase::RegeneratingOutline });
            let offset = state.page_map.get(&outline.key).unwrap_or(1);
            let placeholder_pages = state.results.iter().find(|r| r.key == outline.key).map(|r| r.pages);
            let page_map = state.page_map.clone();
            let mut flags = self.options.typst_flags.clone();
            flags.extend(project.content.typst_inputs());

            let request = CompileRequest {
                target: &outline.name,
                output: &outline.output,
                page_offset: Some(offset),
                page_map: Some(&page_map),
                extra_flags: &flags,
            };
            let pages = self.compile_target(outline, "Table of Contents (final)", &request, offset, reporter, state)?;
            if let Some(before) = placeholder_pages.filter(|&before| before != pages) {
                state.warn(
                    reporter,
                    Some(&outline.name),
                    format!(
                        "Table of contents changed from {} to {} pages; later page numbers may be off",
                        before, pages
                    ),
                );
            }
        }

        let total_pages = current_page - 1;
        reporter.report(ProgressEvent::Log { message: format!("Total pages: {}", total_pages), ok: true });

        reporter.report(ProgressEvent::PhaseChanged { phase: BuildPhase::Merging });
        reporter.report(ProgressEvent::TaskChanged { task: "Merging PDFs".to_string() });
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Cannot create {}: {}", parent.display(), e);
            }
        }
        let merged_with = match self.backends.merger.merge(&plan.artifacts(), &self.output) {
            Ok(tool) => {
                reporter.report(ProgressEvent::Log { message: format!("Merged with {}", tool), ok: true });
                tool
            }
            Err(e) => {
                state.warn(
                    reporter,
                    None,
                    format!("Could not merge PDFs ({}); individual PDFs kept in {}", e, self.build_dir.display()),
                );
                let outcome =
                    BuildOutcome::MergeFailed { reason: e.to_string(), build_dir: self.build_dir.clone() };
                return Ok(self.report(outcome, state, None, false, None, 0, start));
            }
        };

        reporter.report(ProgressEvent::PhaseChanged { phase: BuildPhase::ApplyingMetadata });
        reporter.report(ProgressEvent::TaskChanged { task: "Adding metadata".to_string() });
        let bookmarks = write_bookmarks(&project.hierarchy, &state.page_map);
        let bookmark_file = self.build_dir.join("bookmarks.txt");
        if let Err(e) = fs::write(&bookmark_file, bookmark_text(&bookmarks)) {
            warn!("Cannot write {}: {}", bookmark_file.display(), e);
        }
        let info = project.metadata.info(&self.fallback_title);
        let metadata_applied = self.backends.metadata.apply(&self.output, &bookmarks, &info.title, &info.author);
        if metadata_applied {
            reporter.report(ProgressEvent::Log {
                message: format!("Added metadata and {} bookmarks", bookmarks.len()),
                ok: true,
            });
        } else {
            state.warn(reporter, None, "Could not add metadata or bookmarks (install pdftk or ghostscript)".into());
        }

        let mut archive = None;
        let mut keep_build_dir = false;
        if self.options.leave_individual {
            reporter.report(ProgressEvent::PhaseChanged { phase: BuildPhase::Archiving });
            match archive_artifacts(&self.build_dir, &self.archive) {
                Ok(count) => {
                    reporter.report(ProgressEvent::Log {
                        message: format!("Archived {} PDFs to {}", count, self.archive.display()),
                        ok: true,
                    });
                    archive = Some(self.archive.clone());
                }
                Err(e) => {
                    keep_build_dir = true;
                    state.warn(reporter, None, format!("Could not archive individual PDFs: {}", e));
                }
            }
        }

        reporter.report(ProgressEvent::PhaseChanged { phase: BuildPhase::Cleanup });
        if self.output.exists() && !keep_build_dir {
            self.remove_workspace();
        }

        reporter.report(ProgressEvent::Log {
            message: format!("Created {} ({} pages)", self.output.display(), total_pages),
            ok: true,
        });
        Ok(self.report(
            BuildOutcome::Complete,
            state,
            Some(merged_with),
            metadata_applied,
            archive,
            total_pages,
            start,
        ))
    }

    /// Compile one target, count its pages and record the result.
    fn compile_target(
        &self,
        target: &CompileTarget,
        label: &str,
        request: &CompileRequest<'_>,
        start_page: u32,
        reporter: &dyn ProgressReporter,
        state: &mut RunState,
    ) -> Result<u32, BuildError> {
        let started = Instant::now();
        info!("Compiling {} ({})", label, target.name);
        reporter.report(ProgressEvent::TaskChanged { task: format!("Compiling {}", label) });
        reporter.report(ProgressEvent::TargetStarted { target_id: target.name.clone(), label: label.to_string() });
        state.tracker.target_started(&target.name);

        let mut on_output = |chunk: &str| {
            reporter.report(ProgressEvent::CompilerOutput { target_id: target.name.clone(), chunk: chunk.to_string() });
        };
        let mut on_poll = || reporter.poll();
        let result = self.backends.compiler.compile(request, &mut on_output, &mut on_poll);
        let duration = started.elapsed();

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                let status = match &e {
                    CompileError::Cancelled => TargetStatus::Cancelled,
                    other => TargetStatus::Failed(other.to_string()),
                };
                if let CompileError::Failed { diagnostics, .. } = &e {
                    state.diagnostics.push_str(diagnostics);
                }
                state.tracker.target_completed(&status);
                reporter.report(ProgressEvent::TargetCompleted {
                    target_id: target.name.clone(),
                    status,
                    pages: 0,
                    duration_ms: duration.as_millis() as u64,
                });
                return Err(e.into());
            }
        };
        state.diagnostics.push_str(&text);

        let pages = self.backends.page_counter.count_pages(&target.output);
        if pages == 0 {
            state.warn(reporter, Some(&target.name), format!("Could not count pages of {}", target.output.display()));
        }
        debug!("{} starts at page {} and has {} pages", target.key, start_page, pages);

        state.tracker.target_completed(&TargetStatus::Success);
        reporter.report(ProgressEvent::TargetCompleted {
            target_id: target.name.clone(),
            status: TargetStatus::Success,
            pages,
            duration_ms: duration.as_millis() as u64,
        });
        reporter.report(ProgressEvent::Log { message: label.to_string(), ok: true });
        reporter.report(state.tracker.progress_event());

        state.results.push(TargetResult {
            target_id: target.name.clone(),
            key: target.key.clone(),
            output: target.output.clone(),
            page_offset: start_page,
            pages,
            duration,
        });
        Ok(pages)
    }

    fn report(
        &self,
        outcome: BuildOutcome,
        state: &mut RunState,
        merged_with: Option<String>,
        metadata_applied: bool,
        archive: Option<PathBuf>,
        total_pages: u32,
        start: Instant,
    ) -> BuildReport {
        BuildReport {
            outcome,
            targets: std::mem::take(&mut state.results),
            page_map: state.page_map.clone(),
            output: self.output.clone(),
            merged_with,
            metadata_applied,
            archive,
            warnings: state.warnings.clone(),
            total_pages,
            diagnostics: std::mem::take(&mut state.diagnostics),
            total_duration: start.elapsed(),
        }
    }

    fn prepare_workspace(&self) -> Result<(), BuildError> {
        let workspace_error = |source| BuildError::Workspace { path: self.build_dir.clone(), source };
        if self.build_dir.exists() {
            fs::remove_dir_all(&self.build_dir).map_err(workspace_error)?;
        }
        fs::create_dir_all(&self.build_dir).map_err(workspace_error)?;
        if self.output.exists() {
            fs::remove_file(&self.output)
                .map_err(|source| BuildError::Workspace { path: self.output.clone(), source })?;
            debug!("Removed previous {}", self.output.display());
        }
        debug!("Prepared {}", self.build_dir.display());
        Ok(())
    }

    fn remove_workspace(&self) {
        if self.build_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&self.build_dir) {
                warn!("Cannot remove {}: {}", self.build_dir.display(), e);
            }
        }
    }
}

//! Build progress reporting.
//!
//! The orchestrator reports every step through a [`ProgressReporter`] and
//! asks it, via [`ProgressReporter::poll`], whether to keep going while a
//! compiler is running. Reporters render to the console, to JSON lines, or
//! to the interactive terminal UI in [`crate::ui`].
//!
//! # Example
//!
//! ```ignore
//! use noteworthy::build::progress::{ConsoleProgress, ProgressEvent, ProgressReporter};
//!
//! let reporter = ConsoleProgress::new();
//! reporter.report(ProgressEvent::BuildStarted { total_units: 4, pages: 3, chapters: 1 });
//! reporter.report(ProgressEvent::Progress { completed: 1, total: 4 });
//! ```

use serde_json::json;
use std::io::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::build::BuildPhase;

/// Status of a compiled target in progress events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    /// Compiled successfully
    Success,
    /// Compiler failed
    Failed(String),
    /// Cancelled while compiling
    Cancelled,
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetStatus::Success => write!(f, "success"),
            TargetStatus::Failed(e) => write!(f, "failed: {}", e),
            TargetStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Events reported during a build.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Build started
    BuildStarted {
        /// Progress units the build will report
        total_units: usize,
        /// Selected pages
        pages: usize,
        /// Chapters with at least one selected page
        chapters: usize,
    },
    /// The pipeline entered a new phase
    PhaseChanged { phase: BuildPhase },
    /// The current task description changed
    TaskChanged { task: String },
    /// Progress units completed so far
    Progress { completed: usize, total: usize },
    /// A compile started
    TargetStarted { target_id: String, label: String },
    /// A compile finished
    TargetCompleted {
        target_id: String,
        status: TargetStatus,
        /// Pages in the produced artifact
        pages: u32,
        duration_ms: u64,
    },
    /// Raw compiler output, newline-delimited
    CompilerOutput { target_id: String, chunk: String },
    /// A build log line; `ok` marks a completed step
    Log { message: String, ok: bool },
    /// A warning was generated
    Warning {
        /// Target that generated the warning (if applicable)
        target_id: Option<String>,
        message: String,
    },
    /// An error occurred
    Error {
        /// Target that generated the error (if applicable)
        target_id: Option<String>,
        message: String,
    },
    /// Build finished
    BuildCompleted {
        /// Whether the build finished without a fatal error
        success: bool,
        duration_ms: u64,
        /// Pages in the merged document (0 when nothing was merged)
        pages: u32,
        warnings: usize,
    },
}

/// Receiver of build progress.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);

    /// Check if this reporter wants verbose output.
    fn is_verbose(&self) -> bool {
        false
    }

    /// Called repeatedly while a compiler runs; `false` cancels the build.
    fn poll(&self) -> bool {
        true
    }
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Console progress reporter with optional colors.
pub struct ConsoleProgress {
    use_colors: bool,
    verbose: bool,
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl ConsoleProgress {
    /// Create a reporter writing to stderr, colored when stderr is a terminal.
    pub fn new() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
            verbose: false,
            output: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Create a console progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { use_colors: false, verbose: false, output: Mutex::new(Box::new(output)) }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Verbose mode echoes compiler output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.color(text, "\x1b[32m")
    }

    fn yellow(&self, text: &str) -> String {
        self.color(text, "\x1b[33m")
    }

    fn red(&self, text: &str) -> String {
        self.color(text, "\x1b[31m")
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn bold(&self, text: &str) -> String {
        self.color(text, "\x1b[1m")
    }

    fn dim(&self, text: &str) -> String {
        self.color(text, "\x1b[2m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted { total_units, pages, chapters } => {
                self.writeln(&format!(
                    "{} Building {} page{} from {} chapter{} ({} steps)",
                    self.cyan("[build]"),
                    pages,
                    if pages == 1 { "" } else { "s" },
                    chapters,
                    if chapters == 1 { "" } else { "s" },
                    total_units
                ));
            }
            ProgressEvent::PhaseChanged { phase } => {
                self.writeln(&format!("{} {}", self.cyan("[phase]"), self.bold(&phase.to_string())));
            }
            ProgressEvent::TaskChanged { task } => {
                if self.verbose {
                    self.writeln(&format!("{} {}", self.cyan("[task]"), task));
                }
            }
            ProgressEvent::Progress { .. } => {}
            ProgressEvent::TargetStarted { target_id, label } => {
                if self.verbose {
                    self.writeln(&format!("{} {} ({})...", self.cyan("[build]"), label, target_id));
                }
            }
            ProgressEvent::TargetCompleted { target_id, status, pages, duration_ms } => {
                let status_str = match &status {
                    TargetStatus::Success => self.green("ok"),
                    TargetStatus::Failed(_) => self.red("FAILED"),
                    TargetStatus::Cancelled => self.yellow("cancelled"),
                };
                self.writeln(&format!(
                    "{} {} {} ({} page{}, {})",
                    self.cyan("[build]"),
                    status_str,
                    target_id,
                    pages,
                    if pages == 1 { "" } else { "s" },
                    format_duration(duration_ms)
                ));
                if let TargetStatus::Failed(err) = status {
                    self.writeln(&format!("        {}", self.red(&err)));
                }
            }
            ProgressEvent::CompilerOutput { chunk, .. } => {
                if self.verbose {
                    for line in chunk.lines().filter(|l| !l.trim().is_empty()) {
                        self.writeln(&format!("        {}", self.dim(line)));
                    }
                }
            }
            ProgressEvent::Log { message, ok } => {
                let marker = if ok { self.green("✓") } else { " ".to_string() };
                self.writeln(&format!("{} {}", marker, message));
            }
            ProgressEvent::Warning { target_id, message } => {
                let prefix = match target_id {
                    Some(id) => format!("{}: ", id),
                    None => String::new(),
                };
                self.writeln(&format!("{} {}{}", self.yellow("[warn]"), prefix, message));
            }
            ProgressEvent::Error { target_id, message } => {
                let prefix = match target_id {
                    Some(id) => format!("{}: ", id),
                    None => String::new(),
                };
                self.writeln(&format!("{} {}{}", self.red("[error]"), prefix, message));
            }
            ProgressEvent::BuildCompleted { success, duration_ms, pages, warnings } => {
                let duration_str = format_duration(duration_ms);
                if success {
                    let warn_str = if warnings > 0 {
                        format!(" with {} warning{}", warnings, if warnings == 1 { "" } else { "s" })
                    } else {
                        String::new()
                    };
                    self.writeln(&format!(
                        "\n{} {} pages{} in {}",
                        self.green("[done]"),
                        self.bold(&pages.to_string()),
                        warn_str,
                        duration_str
                    ));
                } else {
                    self.writeln(&format!("\n{} Build failed after {}", self.red("[error]"), duration_str));
                }
            }
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// JSON progress reporter for machine-readable output.
pub struct JsonProgress {
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonProgress").finish()
    }
}

impl JsonProgress {
    /// Create a new JSON progress reporter writing to stderr.
    pub fn new() -> Self {
        Self { output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a JSON progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { output: Mutex::new(Box::new(output)) }
    }

    fn write_json(&self, value: serde_json::Value) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", value);
        }
    }
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let value = match event {
            ProgressEvent::BuildStarted { total_units, pages, chapters } => json!({
                "event": "build_started",
                "total_units": total_units,
                "pages": pages,
                "chapters": chapters,
            }),
            ProgressEvent::PhaseChanged { phase } => {
                json!({"event": "phase_changed", "phase": phase.to_string()})
            }
            ProgressEvent::TaskChanged { task } => json!({"event": "task_changed", "task": task}),
            ProgressEvent::Progress { completed, total } => {
                json!({"event": "progress", "completed": completed, "total": total})
            }
            ProgressEvent::TargetStarted { target_id, label } => {
                json!({"event": "target_started", "target_id": target_id, "label": label})
            }
            ProgressEvent::TargetCompleted { target_id, status, pages, duration_ms } => {
                let mut value = json!({
                    "event": "target_completed",
                    "target_id": target_id,
                    "status": match &status {
                        TargetStatus::Success => "success",
                        TargetStatus::Failed(_) => "failed",
                        TargetStatus::Cancelled => "cancelled",
                    },
                    "pages": pages,
                    "duration_ms": duration_ms,
                });
                if let TargetStatus::Failed(e) = status {
                    value["error"] = json!(e);
                }
                value
            }
            ProgressEvent::CompilerOutput { target_id, chunk } => {
                json!({"event": "compiler_output", "target_id": target_id, "chunk": chunk})
            }
            ProgressEvent::Log { message, ok } => json!({"event": "log", "message": message, "ok": ok}),
            ProgressEvent::Warning { target_id, message } => {
                json!({"event": "warning", "message": message, "target_id": target_id})
            }
            ProgressEvent::Error { target_id, message } => {
                json!({"event": "error", "message": message, "target_id": target_id})
            }
            ProgressEvent::BuildCompleted { success, duration_ms, pages, warnings } => json!({
                "event": "build_completed",
                "success": success,
                "duration_ms": duration_ms,
                "pages": pages,
                "warnings": warnings,
            }),
        };
        self.write_json(value);
    }
}

/// Progress tracker for aggregating build statistics.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    start_time: Option<Instant>,
    total: usize,
    completed: usize,
    succeeded: usize,
    failed: usize,
    warnings: usize,
    in_progress: Option<String>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a build with a fixed unit total.
    pub fn start(&mut self, total_units: usize) {
        self.start_time = Some(Instant::now());
        self.total = total_units;
        self.completed = 0;
        self.succeeded = 0;
        self.failed = 0;
        self.warnings = 0;
        self.in_progress = None;
    }

    pub fn target_started(&mut self, target_id: &str) {
        self.in_progress = Some(target_id.to_string());
    }

    /// Mark the running target as finished; successes consume one unit.
    pub fn target_completed(&mut self, status: &TargetStatus) {
        self.in_progress = None;
        match status {
            TargetStatus::Success => {
                self.succeeded += 1;
                self.completed += 1;
            }
            TargetStatus::Failed(_) => self.failed += 1,
            TargetStatus::Cancelled => {}
        }
    }

    pub fn warning(&mut self) {
        self.warnings += 1;
    }

    /// The `Progress` event for the current state.
    pub fn progress_event(&self) -> ProgressEvent {
        ProgressEvent::Progress { completed: self.completed, total: self.total }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// The target currently compiling.
    pub fn in_progress(&self) -> Option<&str> {
        self.in_progress.as_deref()
    }

    /// Generate a BuildCompleted event from current state.
    pub fn build_completed_event(&self, success: bool, pages: u32) -> ProgressEvent {
        ProgressEvent::BuildCompleted { success, duration_ms: self.elapsed_ms(), pages, warnings: self.warnings }
    }
}

/// Format a duration in milliseconds to a human-readable string.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{}m {}s", minutes, seconds)
    }
}

//! Configuration schema types for `noteworthy.toml`
//!
//! Defines the structure and validation rules for a noteworthy project.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project layout section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required)
    pub name: String,
    /// Typst template that dispatches on the `target` input
    #[serde(default = "default_renderer")]
    pub renderer: PathBuf,
    /// Scratch directory for per-section artifacts
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    /// Final merged PDF
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Archive of individual section PDFs (only written on request)
    #[serde(default = "default_archive")]
    pub archive: PathBuf,
    /// Chapter/page hierarchy
    #[serde(default = "default_hierarchy")]
    pub hierarchy: PathBuf,
    /// Document metadata (title, authors)
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,
    /// Document constants (display flags)
    #[serde(default = "default_constants")]
    pub constants: PathBuf,
    /// Content root holding `<chapter>/<page>.typ`
    #[serde(default = "default_content")]
    pub content: PathBuf,
}

fn default_renderer() -> PathBuf {
    PathBuf::from("templates/parser.typ")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("templates/build")
}

fn default_output() -> PathBuf {
    PathBuf::from("output.pdf")
}

fn default_archive() -> PathBuf {
    PathBuf::from("build_pdfs.zip")
}

fn default_hierarchy() -> PathBuf {
    PathBuf::from("config/hierarchy.json")
}

fn default_metadata() -> PathBuf {
    PathBuf::from("config/metadata.json")
}

fn default_constants() -> PathBuf {
    PathBuf::from("config/constants.json")
}

fn default_content() -> PathBuf {
    PathBuf::from("content")
}

/// External tool names or paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Typst compiler
    #[serde(default = "default_typst")]
    pub typst: String,
    /// Page inspection tool (poppler)
    #[serde(default = "default_pdfinfo")]
    pub pdfinfo: String,
    /// Preferred merge tool (poppler)
    #[serde(default = "default_pdfunite")]
    pub pdfunite: String,
    /// Ghostscript, used as merge and metadata fallback
    #[serde(default = "default_ghostscript")]
    pub ghostscript: String,
    /// Preferred metadata/bookmark tool
    #[serde(default = "default_pdftk")]
    pub pdftk: String,
}

fn default_typst() -> String {
    "typst".to_string()
}

fn default_pdfinfo() -> String {
    "pdfinfo".to_string()
}

fn default_pdfunite() -> String {
    "pdfunite".to_string()
}

fn default_ghostscript() -> String {
    "gs".to_string()
}

fn default_pdftk() -> String {
    "pdftk".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            typst: default_typst(),
            pdfinfo: default_pdfinfo(),
            pdfunite: default_pdfunite(),
            ghostscript: default_ghostscript(),
            pdftk: default_pdftk(),
        }
    }
}

/// Default build options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildDefaults {
    /// Compile cover, preface and table of contents
    #[serde(default = "default_true")]
    pub frontmatter: bool,
    /// Archive the individual section PDFs before cleanup
    #[serde(default)]
    pub leave_individual: bool,
    /// Write a debug log file
    #[serde(default)]
    pub debug: bool,
    /// Extra flags appended to every `typst compile`
    #[serde(default)]
    pub typst_flags: Vec<String>,
    /// Sleep between compiler polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Debug log file, relative to the project root
    #[serde(default = "default_debug_log")]
    pub debug_log: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_debug_log() -> PathBuf {
    PathBuf::from("build_debug.log")
}

impl Default for BuildDefaults {
    fn default() -> Self {
        Self {
            frontmatter: true,
            leave_individual: false,
            debug: false,
            typst_flags: Vec::new(),
            poll_interval_ms: default_poll_interval_ms(),
            debug_log: default_debug_log(),
        }
    }
}

/// Complete noteworthy.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteworthyConfig {
    /// Project layout (required)
    pub project: ProjectConfig,
    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Build defaults
    #[serde(default)]
    pub build: BuildDefaults,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "tools.typst")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "noteworthy.toml: '{}' {}", self.field, self.message)
    }
}

impl NoteworthyConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.name.is_empty() {
            errors.push(ConfigValidationError {
                field: "project.name".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        if self.project.renderer.extension().and_then(|e| e.to_str()) != Some("typ") {
            errors.push(ConfigValidationError {
                field: "project.renderer".to_string(),
                message: "must point to a .typ file".to_string(),
            });
        }

        let tools = [
            ("tools.typst", &self.tools.typst),
            ("tools.pdfinfo", &self.tools.pdfinfo),
            ("tools.pdfunite", &self.tools.pdfunite),
            ("tools.ghostscript", &self.tools.ghostscript),
            ("tools.pdftk", &self.tools.pdftk),
        ];
        for (field, value) in tools {
            if value.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must name an executable".to_string(),
                });
            }
        }

        if self.build.poll_interval_ms == 0 || self.build.poll_interval_ms > 1000 {
            errors.push(ConfigValidationError {
                field: "build.poll_interval_ms".to_string(),
                message: "must be between 1 and 1000".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

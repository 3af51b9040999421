//! External tool lookup and invocation.
//!
//! Every external program the build drives (typst, pdfinfo, pdfunite,
//! Ghostscript, pdftk) is located on `PATH` before use and run through
//! [`run_tool`], which captures its output.

use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;

use crate::config::ToolsConfig;

/// Error running an external tool
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("'{0}' was not found on PATH")]
    NotFound(String),
    #[error("Failed to launch '{tool}': {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{tool}' exited with code {code}: {stderr}")]
    Failed { tool: String, code: i32, stderr: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Locate an executable.
///
/// Names containing a path separator are checked directly; bare names are
/// searched on `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path = env::var_os("PATH")?;
    env::split_paths(&path).map(|dir| dir.join(name)).find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

/// Run a tool to completion and capture its output.
///
/// A non-zero exit is returned as [`ToolError::Failed`] with the tool's
/// stderr.
pub fn run_tool<I, S>(program: &str, args: I) -> Result<Output, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| ToolError::Launch { tool: program.to_string(), source })?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: program.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// A tool the build needs and how to obtain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Human-readable description
    pub name: String,
    /// Accepted executables, any one suffices
    pub executables: Vec<String>,
    /// Install guidance shown when missing
    pub guidance: String,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.executables.join(" or "), self.guidance)
    }
}

/// Availability of one requirement on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub requirement: Requirement,
    /// First executable found, if any
    pub found: Option<PathBuf>,
    /// Missing tools are only reported, not fatal
    pub optional: bool,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.found.is_some()
    }
}

/// The external tools configured for a project.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub typst: String,
    pub pdfinfo: String,
    pub pdfunite: String,
    pub ghostscript: String,
    pub pdftk: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}

impl Toolchain {
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            typst: config.typst.clone(),
            pdfinfo: config.pdfinfo.clone(),
            pdfunite: config.pdfunite.clone(),
            ghostscript: config.ghostscript.clone(),
            pdftk: config.pdftk.clone(),
        }
    }

    /// Check every tool; mandatory ones first.
    pub fn check(&self) -> Vec<ToolStatus> {
        let mandatory = [
            Requirement {
                name: "Typst compiler".to_string(),
                executables: vec![self.typst.clone()],
                guidance: "install from https://typst.app".to_string(),
            },
            Requirement {
                name: "PDF inspector".to_string(),
                executables: vec![self.pdfinfo.clone()],
                guidance: "install poppler (poppler-utils)".to_string(),
            },
            Requirement {
                name: "PDF merger".to_string(),
                executables: vec![self.pdfunite.clone(), self.ghostscript.clone()],
                guidance: "install poppler-utils or ghostscript".to_string(),
            },
        ];
        let optional = [Requirement {
            name: "PDF metadata editor".to_string(),
            executables: vec![self.pdftk.clone(), self.ghostscript.clone()],
            guidance: "install pdftk or ghostscript to add bookmarks".to_string(),
        }];

        mandatory
            .into_iter()
            .map(|r| (r, false))
            .chain(optional.into_iter().map(|r| (r, true)))
            .map(|(requirement, optional)| {
                let found = requirement.executables.iter().find_map(|e| find_executable(e));
                ToolStatus { requirement, found, optional }
            })
            .collect()
    }

    /// Mandatory requirements that are not met.
    pub fn missing(&self) -> Vec<Requirement> {
        self.check()
            .into_iter()
            .filter(|s| !s.optional && !s.is_available())
            .map(|s| s.requirement)
            .collect()
    }
}

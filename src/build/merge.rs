//! Merging per-section PDFs into the final document.

use log::{error, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::build::tools::{find_executable, run_tool, ToolError};

/// Error merging artifacts
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no compiled PDFs to merge")]
    NoArtifacts,
    #[error("no merge tool succeeded (tried: {})", tried.join(", "))]
    NoToolAvailable { tried: Vec<String> },
    #[error("cannot remove previous {}: {source}", path.display())]
    StaleOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An external program that concatenates PDFs.
pub trait MergeTool: Send + Sync {
    /// Name reported to the user.
    fn name(&self) -> &str;

    /// Whether the tool exists on this host.
    fn is_available(&self) -> bool;

    /// Concatenate `inputs` in order into `output`.
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), ToolError>;
}

/// `pdfunite <inputs…> <output>`.
#[derive(Debug, Clone)]
pub struct PdfUnite {
    program: String,
}

impl PdfUnite {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl MergeTool for PdfUnite {
    fn name(&self) -> &str {
        "pdfunite"
    }

    fn is_available(&self) -> bool {
        find_executable(&self.program).is_some()
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), ToolError> {
        let mut args: Vec<&Path> = inputs.iter().map(PathBuf::as_path).collect();
        args.push(output);
        run_tool(&self.program, args).map(|_| ())
    }
}

/// Ghostscript `pdfwrite` device.
#[derive(Debug, Clone)]
pub struct GhostscriptMerge {
    program: String,
}

impl GhostscriptMerge {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl MergeTool for GhostscriptMerge {
    fn name(&self) -> &str {
        "ghostscript"
    }

    fn is_available(&self) -> bool {
        find_executable(&self.program).is_some()
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), ToolError> {
        let mut args: Vec<String> = vec![
            "-dBATCH".to_string(),
            "-dNOPAUSE".to_string(),
            "-q".to_string(),
            "-sDEVICE=pdfwrite".to_string(),
            format!("-sOutputFile={}", output.display()),
        ];
        args.extend(inputs.iter().map(|p| p.display().to_string()));
        run_tool(&self.program, args).map(|_| ())
    }
}

/// Tries merge tools in preference order.
pub struct ArtifactMerger {
    tools: Vec<Box<dyn MergeTool>>,
}

impl std::fmt::Debug for ArtifactMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
        f.debug_struct("ArtifactMerger").field("tools", &names).finish()
    }
}

impl ArtifactMerger {
    pub fn new(tools: Vec<Box<dyn MergeTool>>) -> Self {
        Self { tools }
    }

    /// `pdfunite` first, then Ghostscript.
    pub fn standard(pdfunite: &str, ghostscript: &str) -> Self {
        Self::new(vec![Box::new(PdfUnite::new(pdfunite)), Box::new(GhostscriptMerge::new(ghostscript))])
    }

    /// Merge the existing artifacts, in order, into `output`.
    ///
    /// Returns the name of the tool that succeeded. Every tool receives the
    /// same ordered input list and output path. An existing `output` is
    /// removed first, and a failed attempt's partial output is removed
    /// before the next tool runs.
    pub fn merge(&self, artifacts: &[PathBuf], output: &Path) -> Result<String, MergeError> {
        let inputs: Vec<PathBuf> = artifacts.iter().filter(|p| p.exists()).cloned().collect();
        if inputs.len() < artifacts.len() {
            warn!("{} of {} artifacts are missing and will be skipped", artifacts.len() - inputs.len(), artifacts.len());
        }
        if inputs.is_empty() {
            return Err(MergeError::NoArtifacts);
        }
        if output.exists() {
            fs::remove_file(output)
                .map_err(|source| MergeError::StaleOutput { path: output.to_path_buf(), source })?;
        }
        info!("Merging {} files into {}", inputs.len(), output.display());

        let mut tried = Vec::new();
        for tool in &self.tools {
            if !tool.is_available() {
                info!("{} not available", tool.name());
                continue;
            }
            tried.push(tool.name().to_string());
            match tool.merge(&inputs, output) {
                Ok(()) if output.exists() => {
                    info!("Merged with {}", tool.name());
                    return Ok(tool.name().to_string());
                }
                Ok(()) => error!("{} reported success but produced no output", tool.name()),
                Err(e) => {
                    error!("{} failed: {}", tool.name(), e);
                    if output.exists() {
                        let _ = fs::remove_file(output);
                    }
                }
            }
        }

        Err(MergeError::NoToolAvailable { tried })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    type Calls = Arc<Mutex<Vec<(String, Vec<PathBuf>, PathBuf)>>>;

    struct FakeTool {
        name: &'static str,
        available: bool,
        succeed: bool,
        calls: Calls,
    }

    impl MergeTool for FakeTool {
        fn name(&self) -> &str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), ToolError> {
            self.calls.lock().unwrap().push((self.name.to_string(), inputs.to_vec(), output.to_path_buf()));
            fs::write(output, "partial").unwrap();
            if self.succeed {
                Ok(())
            } else {
                Err(ToolError::Failed { tool: self.name.to_string(), code: 1, stderr: String::new() })
            }
        }
    }

    /// Exits successfully without writing anything.
    struct SilentTool;

    impl MergeTool for SilentTool {
        fn name(&self) -> &str {
            "silent"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn merge(&self, _inputs: &[PathBuf], _output: &Path) -> Result<(), ToolError> {
            Ok(())
        }
    }

    fn fake(name: &'static str, available: bool, succeed: bool, calls: &Calls) -> Box<dyn MergeTool> {
        Box::new(FakeTool { name, available, succeed, calls: Arc::clone(calls) })
    }

    fn artifacts(temp: &TempDir, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|n| {
                let p = temp.path().join(n);
                fs::write(&p, "%PDF").unwrap();
                p
            })
            .collect()
    }

    #[test]
    fn test_no_artifacts() {
        let temp = TempDir::new().unwrap();
        let calls = Calls::default();
        let merger = ArtifactMerger::new(vec![fake("a", true, true, &calls)]);
        let missing = vec![temp.path().join("gone.pdf")];
        let err = merger.merge(&missing, &temp.path().join("out.pdf")).unwrap_err();
        assert!(matches!(err, MergeError::NoArtifacts));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_preferred_tool_wins() {
        let temp = TempDir::new().unwrap();
        let calls = Calls::default();
        let merger = ArtifactMerger::new(vec![fake("a", true, true, &calls), fake("b", true, true, &calls)]);
        let inputs = artifacts(&temp, &["1.pdf", "2.pdf"]);
        let used = merger.merge(&inputs, &temp.path().join("out.pdf")).unwrap();
        assert_eq!(used, "a");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unavailable_tool_falls_back_with_same_arguments() {
        let temp = TempDir::new().unwrap();
        let calls = Calls::default();
        let merger = ArtifactMerger::new(vec![fake("a", false, true, &calls), fake("b", true, true, &calls)]);
        let mut inputs = artifacts(&temp, &["2.pdf", "1.pdf"]);
        inputs.insert(1, temp.path().join("missing.pdf"));
        let out = temp.path().join("out.pdf");
        assert_eq!(merger.merge(&inputs, &out).unwrap(), "b");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec![temp.path().join("2.pdf"), temp.path().join("1.pdf")]);
        assert_eq!(calls[0].2, out);
    }

    #[test]
    fn test_failed_tool_falls_back_and_cleans_partial() {
        let temp = TempDir::new().unwrap();
        let calls = Calls::default();
        let merger = ArtifactMerger::new(vec![fake("a", true, false, &calls), fake("b", true, true, &calls)]);
        let inputs = artifacts(&temp, &["1.pdf"]);
        let out = temp.path().join("out.pdf");
        assert_eq!(merger.merge(&inputs, &out).unwrap(), "b");
        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].1, calls[1].1);
        assert_eq!(calls[0].2, calls[1].2);
    }

    #[test]
    fn test_all_tools_fail() {
        let temp = TempDir::new().unwrap();
        let calls = Calls::default();
        let merger = ArtifactMerger::new(vec![fake("a", true, false, &calls), fake("b", false, true, &calls)]);
        let inputs = artifacts(&temp, &["1.pdf"]);
        let out = temp.path().join("out.pdf");
        match merger.merge(&inputs, &out).unwrap_err() {
            MergeError::NoToolAvailable { tried } => assert_eq!(tried, vec!["a"]),
            other => panic!("unexpected: {other}"),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_previous_output_is_not_taken_for_a_merge() {
        let temp = TempDir::new().unwrap();
        let merger = ArtifactMerger::new(vec![Box::new(SilentTool)]);
        let inputs = artifacts(&temp, &["1.pdf"]);
        let out = temp.path().join("out.pdf");
        fs::write(&out, "previous build").unwrap();

        match merger.merge(&inputs, &out).unwrap_err() {
            MergeError::NoToolAvailable { tried } => assert_eq!(tried, vec!["silent"]),
            other => panic!("unexpected: {other}"),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_previous_output_replaced() {
        let temp = TempDir::new().unwrap();
        let calls = Calls::default();
        let merger = ArtifactMerger::new(vec![fake("a", true, true, &calls)]);
        let inputs = artifacts(&temp, &["1.pdf"]);
        let out = temp.path().join("out.pdf");
        fs::write(&out, "previous build").unwrap();

        assert_eq!(merger.merge(&inputs, &out).unwrap(), "a");
        assert_eq!(fs::read_to_string(&out).unwrap(), "partial");
    }
}

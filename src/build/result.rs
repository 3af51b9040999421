//! Build result types.

use std::path::PathBuf;
use std::time::Duration;

use crate::build::PageMap;

/// Result of compiling a single target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResult {
    /// Compiler-facing target name
    pub target_id: String,
    /// Page-map key
    pub key: String,
    /// Artifact produced
    pub output: PathBuf,
    /// Page offset passed to the compiler
    pub page_offset: u32,
    /// Pages counted in the artifact (0 when unknown)
    pub pages: u32,
    pub duration: Duration,
}

/// How a build that got past compilation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Merged document written
    Complete,
    /// No merge tool succeeded; section PDFs remain in the scratch directory
    MergeFailed { reason: String, build_dir: PathBuf },
}

/// Result of a complete build run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub outcome: BuildOutcome,
    /// Compiles in order, the outline regeneration last
    pub targets: Vec<TargetResult>,
    pub page_map: PageMap,
    /// Merged document path
    pub output: PathBuf,
    /// Merge tool that produced the output
    pub merged_with: Option<String>,
    pub metadata_applied: bool,
    /// Archive written, if requested
    pub archive: Option<PathBuf>,
    /// Non-fatal problems
    pub warnings: Vec<String>,
    /// Pages in the merged document
    pub total_pages: u32,
    /// Full compiler output of the build
    pub diagnostics: String,
    pub total_duration: Duration,
}

impl BuildReport {
    /// Whether the merged document was produced.
    pub fn is_success(&self) -> bool {
        self.outcome == BuildOutcome::Complete
    }

    /// Whether the build succeeded with warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Number of compiler invocations.
    pub fn compile_count(&self) -> usize {
        self.targets.len()
    }

    /// Distinct artifacts in merge order.
    pub fn artifacts(&self) -> Vec<&PathBuf> {
        let mut seen = Vec::new();
        for target in &self.targets {
            if !seen.contains(&&target.output) {
                seen.push(&target.output);
            }
        }
        seen
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        match &self.outcome {
            BuildOutcome::Complete => lines.push(format!(
                "Created {} ({} pages) from {} compiles in {:.1?}",
                self.output.display(),
                self.total_pages,
                self.compile_count(),
                self.total_duration
            )),
            BuildOutcome::MergeFailed { reason, build_dir } => {
                lines.push(format!("Merge failed: {}", reason));
                lines.push(format!("Individual PDFs left in {}", build_dir.display()));
            }
        }

        if let Some(archive) = &self.archive {
            lines.push(format!("Individual PDFs archived to {}", archive.display()));
        }

        if !self.warnings.is_empty() {
            lines.push(format!("Warnings ({}):", self.warnings.len()));
            for warning in self.warnings.iter().take(5) {
                lines.push(format!("  - {}", warning));
            }
            if self.warnings.len() > 5 {
                lines.push(format!("  ... and {} more", self.warnings.len() - 5));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: &str, output: &str) -> TargetResult {
        TargetResult {
            target_id: id.to_string(),
            key: id.to_string(),
            output: PathBuf::from(output),
            page_offset: 1,
            pages: 1,
            duration: Duration::ZERO,
        }
    }

    fn report(outcome: BuildOutcome) -> BuildReport {
        BuildReport {
            outcome,
            targets: vec![target("outline", "b/02_outline.pdf"), target("0/0", "b/20_page_0_0.pdf"), target("outline", "b/02_outline.pdf")],
            page_map: PageMap::new(),
            output: PathBuf::from("output.pdf"),
            merged_with: Some("pdfunite".to_string()),
            metadata_applied: true,
            archive: None,
            warnings: vec![],
            total_pages: 2,
            diagnostics: String::new(),
            total_duration: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_artifacts_deduplicate_outline() {
        let r = report(BuildOutcome::Complete);
        assert_eq!(r.compile_count(), 3);
        assert_eq!(r.artifacts(), vec![&PathBuf::from("b/02_outline.pdf"), &PathBuf::from("b/20_page_0_0.pdf")]);
    }

    #[test]
    fn test_summary_success() {
        let r = report(BuildOutcome::Complete);
        assert!(r.is_success());
        let summary = r.summary();
        assert!(summary.contains("Created output.pdf (2 pages) from 3 compiles"));
    }

    #[test]
    fn test_summary_merge_failed_with_warnings() {
        let mut r = report(BuildOutcome::MergeFailed {
            reason: "no merge tool succeeded".to_string(),
            build_dir: PathBuf::from("templates/build"),
        });
        r.warnings = (0..7).map(|i| format!("w{}", i)).collect();
        assert!(!r.is_success());
        assert!(r.has_warnings());
        let summary = r.summary();
        assert!(summary.contains("Individual PDFs left in templates/build"));
        assert!(summary.contains("Warnings (7):"));
        assert!(summary.contains("... and 2 more"));
    }
}

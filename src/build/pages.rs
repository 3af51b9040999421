//! Page counting of compiled PDFs.

use log::{debug, warn};
use std::path::Path;

use crate::build::tools::run_tool;

/// Reports how many pages an artifact has.
///
/// Implementations return 0 when the count is unknown; callers treat 0 as
/// "unknown" rather than as an error.
pub trait PageCounter: Send + Sync {
    fn count_pages(&self, artifact: &Path) -> u32;
}

/// Page counter backed by poppler's `pdfinfo`.
#[derive(Debug, Clone)]
pub struct PdfInfo {
    program: String,
}

impl PdfInfo {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for PdfInfo {
    fn default() -> Self {
        Self::new("pdfinfo")
    }
}

impl PageCounter for PdfInfo {
    fn count_pages(&self, artifact: &Path) -> u32 {
        if !artifact.exists() {
            warn!("Cannot count pages of missing file {}", artifact.display());
            return 0;
        }
        match run_tool(&self.program, [artifact]) {
            Ok(output) => {
                let report = String::from_utf8_lossy(&output.stdout);
                let pages = parse_page_count(&report);
                if pages == 0 {
                    warn!("No page count in {} report for {}", self.program, artifact.display());
                } else {
                    debug!("{}: {} pages", artifact.display(), pages);
                }
                pages
            }
            Err(e) => {
                warn!("{}", e);
                0
            }
        }
    }
}

/// Extract the integer from the first `Pages:` line of a pdfinfo report.
pub fn parse_page_count(report: &str) -> u32 {
    report
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("Pages:"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

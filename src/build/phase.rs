//! Build pipeline states.

use std::fmt;

/// Where a build currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildPhase {
    Idle,
    CheckingDependencies,
    PreparingWorkspace,
    CompilingFrontmatter,
    /// Compiling the chapter with this index
    CompilingChapter(usize),
    RegeneratingOutline,
    Merging,
    ApplyingMetadata,
    Archiving,
    Cleanup,
    Done,
    Failed,
    Cancelled,
}

impl BuildPhase {
    /// Whether the build has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildPhase::Done | BuildPhase::Failed | BuildPhase::Cancelled)
    }

    /// Whether a compiler process may be running in this phase.
    pub fn is_compiling(&self) -> bool {
        matches!(
            self,
            BuildPhase::CompilingFrontmatter | BuildPhase::CompilingChapter(_) | BuildPhase::RegeneratingOutline
        )
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildPhase::Idle => write!(f, "Idle"),
            BuildPhase::CheckingDependencies => write!(f, "Checking dependencies"),
            BuildPhase::PreparingWorkspace => write!(f, "Preparing build directory"),
            BuildPhase::CompilingFrontmatter => write!(f, "Compiling frontmatter"),
            BuildPhase::CompilingChapter(ci) => write!(f, "Compiling chapter {}", ci + 1),
            BuildPhase::RegeneratingOutline => write!(f, "Regenerating table of contents"),
            BuildPhase::Merging => write!(f, "Merging PDFs"),
            BuildPhase::ApplyingMetadata => write!(f, "Adding metadata"),
            BuildPhase::Archiving => write!(f, "Archiving individual PDFs"),
            BuildPhase::Cleanup => write!(f, "Cleaning up"),
            BuildPhase::Done => write!(f, "Build complete"),
            BuildPhase::Failed => write!(f, "Build failed"),
            BuildPhase::Cancelled => write!(f, "Build cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(BuildPhase::CompilingChapter(0).to_string(), "Compiling chapter 1");
        assert_eq!(BuildPhase::Merging.to_string(), "Merging PDFs");
    }

    #[test]
    fn test_phase_predicates() {
        assert!(BuildPhase::Cancelled.is_terminal());
        assert!(!BuildPhase::Cleanup.is_terminal());
        assert!(BuildPhase::RegeneratingOutline.is_compiling());
        assert!(!BuildPhase::Merging.is_compiling());
    }
}

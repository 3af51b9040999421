//! Doctor command: check the external tools a build needs

use std::path::Path;
use std::process::ExitCode;

use super::{open_context, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::ToolStatus;
use crate::config::CliOverrides;

/// Run the doctor command
pub fn run_doctor(config: Option<&Path>) -> ExitCode {
    let context = match open_context(config, &CliOverrides::default()) {
        Ok(context) => context,
        Err(code) => return code,
    };

    let statuses = context.toolchain().check();
    for status in &statuses {
        println!("{}", status_line(status));
    }

    let missing = statuses.iter().filter(|s| !s.optional && !s.is_available()).count();
    if missing == 0 {
        println!();
        println!("All required tools found");
        ExitCode::from(EXIT_SUCCESS)
    } else {
        println!();
        println!("{} required tool(s) missing", missing);
        ExitCode::from(EXIT_ERROR)
    }
}

fn status_line(status: &ToolStatus) -> String {
    let requirement = &status.requirement;
    match &status.found {
        Some(path) => format!("✓ {}: {}", requirement.name, path.display()),
        None if status.optional => format!("- {} (optional)", requirement),
        None => format!("✗ {}", requirement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Requirement;
    use std::path::PathBuf;

    fn status(found: Option<&str>, optional: bool) -> ToolStatus {
        ToolStatus {
            requirement: Requirement {
                name: "PDF merger".to_string(),
                executables: vec!["pdfunite".to_string(), "gs".to_string()],
                guidance: "install poppler-utils or ghostscript".to_string(),
            },
            found: found.map(PathBuf::from),
            optional,
        }
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(status_line(&status(Some("/usr/bin/pdfunite"), false)), "✓ PDF merger: /usr/bin/pdfunite");
        assert_eq!(
            status_line(&status(None, false)),
            "✗ PDF merger (pdfunite or gs): install poppler-utils or ghostscript"
        );
        assert!(status_line(&status(None, true)).ends_with("(optional)"));
    }
}

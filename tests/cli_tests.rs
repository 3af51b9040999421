//! CLI integration tests for the `noteworthy` binary.
//!
//! Each test lays out a small project in a temporary directory (a
//! `noteworthy.toml`, the JSON config files and numbered content folders)
//! and runs the binary against it. Tool-dependent tests point the
//! `[tools]` table at shell scripts.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run noteworthy with the given arguments and return (stdout, stderr, exit code).
fn run(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_noteworthy")).args(args).output().expect("Failed to execute noteworthy");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

/// Two chapters: "Basics" with pages "Sets" and "Maps", "Proofs" with "Induction".
fn create_project(tools: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("config")).unwrap();
    fs::write(
        root.join("config/hierarchy.json"),
        r#"[
            {"title": "Basics", "pages": [{"title": "Sets"}, {"title": "Maps"}]},
            {"title": "Proofs", "pages": [{"title": "Induction"}]}
        ]"#,
    )
    .unwrap();
    fs::write(root.join("config/metadata.json"), r#"{"title": "Discrete Notes", "authors": ["Ada"]}"#).unwrap();
    fs::write(root.join("config/constants.json"), r#"{"display-cover": true}"#).unwrap();
    for (chapter, pages) in [("1", 2), ("2", 1)] {
        fs::create_dir_all(root.join("content").join(chapter)).unwrap();
        for page in 1..=pages {
            fs::write(root.join("content").join(chapter).join(format!("{}.typ", page)), "").unwrap();
        }
    }

    let config = root.join("noteworthy.toml");
    fs::write(&config, format!("[project]\nname = \"discrete\"\n\n{}", tools)).unwrap();
    (temp, config)
}

fn config_arg(config: &Path) -> String {
    config.display().to_string()
}

// ============================================================================
// plan
// ============================================================================

#[test]
fn test_plan_lists_targets_in_order() {
    let (_temp, config) = create_project("");
    let (stdout, stderr, code) = run(&["--config", &config_arg(&config), "plan"]);

    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("Plan: 8 targets, 9 progress units"), "{}", stdout);
    let cover = stdout.find("Cover").unwrap();
    let chapter = stdout.find("Chapter 1").unwrap();
    let induction = stdout.find("Section 1: Induction").unwrap();
    assert!(cover < chapter && chapter < induction);
    assert!(stdout.contains("recompiled last with the final page map"));
}

#[test]
fn test_plan_json_with_selection() {
    let (_temp, config) = create_project("");
    let (stdout, stderr, code) =
        run(&["--config", &config_arg(&config), "plan", "--json", "--no-frontmatter", "--select", "0/1"]);

    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let targets: Vec<&str> =
        json["targets"].as_array().unwrap().iter().map(|t| t["target"].as_str().unwrap()).collect();
    assert_eq!(targets, vec!["chapter-0", "0/1"]);
    assert_eq!(json["targets"][0]["key"], "chapter-1");
    assert_eq!(json["regenerate_outline"], false);
    assert_eq!(json["total_units"], 2);
}

#[test]
fn test_plan_rejects_out_of_range_selection() {
    let (_temp, config) = create_project("");
    let (_, stderr, code) = run(&["--config", &config_arg(&config), "plan", "--select", "4"]);

    assert_eq!(code, 2);
    assert!(stderr.contains("Error"), "{}", stderr);
}

#[test]
fn test_plan_rejects_content_mismatch() {
    let (temp, config) = create_project("");
    fs::write(temp.path().join("content/2/2.typ"), "").unwrap();
    let (_, stderr, code) = run(&["--config", &config_arg(&config), "plan"]);

    assert_eq!(code, 2);
    assert!(stderr.contains("Content mismatch"), "{}", stderr);
    assert!(stderr.contains("hierarchy.json"), "{}", stderr);
}

#[test]
fn test_invalid_config_exits_with_usage_code() {
    let (_temp, config) = create_project("[build]\npoll_interval_ms = 0\n");
    let (_, stderr, code) = run(&["--config", &config_arg(&config), "plan"]);

    assert_eq!(code, 2);
    assert!(stderr.contains("Error loading"), "{}", stderr);
}

#[test]
fn test_bad_select_syntax_is_a_usage_error() {
    let (_, _, code) = run(&["plan", "--select", "one"]);
    assert_eq!(code, 2);
}

// ============================================================================
// doctor and build (scripted tools)
// ============================================================================

#[cfg(unix)]
mod scripted {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> String {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    /// `[tools]` table pointing at scripts in `bin`; typst runs `typst_body`.
    fn tools(bin: &Path, typst_body: &str) -> String {
        format!(
            "[tools]\ntypst = \"{}\"\npdfinfo = \"{}\"\npdfunite = \"{}\"\nghostscript = \"{}\"\npdftk = \"{}\"\n",
            script(bin, "typst", typst_body),
            script(bin, "pdfinfo", "echo 'Pages: 1'"),
            script(bin, "pdfunite", "for last; do :; done\necho merged > \"$last\""),
            bin.join("gs").display(),
            bin.join("pdftk").display(),
        )
    }

    #[test]
    fn test_doctor_all_required_found() {
        let bin = TempDir::new().unwrap();
        let (_temp, config) = create_project(&tools(bin.path(), "exit 0"));
        let (stdout, _, code) = run(&["--config", &config_arg(&config), "doctor"]);

        assert_eq!(code, 0, "{}", stdout);
        assert!(stdout.contains("✓ Typst compiler"));
        assert!(stdout.contains("- PDF metadata editor"));
        assert!(stdout.contains("All required tools found"));
    }

    #[test]
    fn test_doctor_reports_missing_typst() {
        let bin = TempDir::new().unwrap();
        let tools = tools(bin.path(), "exit 0").replace(&bin.path().join("typst").display().to_string(), "/nonexistent/typst");
        let (_temp, config) = create_project(&tools);
        let (stdout, _, code) = run(&["--config", &config_arg(&config), "doctor"]);

        assert_eq!(code, 1);
        assert!(stdout.contains("✗ Typst compiler"));
        assert!(stdout.contains("https://typst.app"));
        assert!(stdout.contains("1 required tool(s) missing"));
    }

    #[test]
    fn test_build_plain() {
        let bin = TempDir::new().unwrap();
        let (temp, config) = create_project(&tools(bin.path(), r#"echo "$7" > "$3""#));
        let (stdout, stderr, code) = run(&["--config", &config_arg(&config), "build", "--plain"]);

        assert_eq!(code, 0, "stderr: {}", stderr);
        assert!(stdout.contains("Created"), "{}", stdout);
        assert!(stdout.contains("(8 pages)"), "{}", stdout);
        assert!(stdout.contains("Could not add metadata"), "{}", stdout);
        assert_eq!(fs::read_to_string(temp.path().join("output.pdf")).unwrap(), "merged\n");
        assert!(!temp.path().join("templates/build").exists());
    }

    #[test]
    fn test_build_json_keep_pdfs() {
        let bin = TempDir::new().unwrap();
        let (temp, config) = create_project(&tools(bin.path(), r#"echo "$7" > "$3""#));
        let (stdout, stderr, code) = run(&[
            "--config",
            &config_arg(&config),
            "build",
            "--json",
            "--keep-pdfs",
            "--no-frontmatter",
            "--output",
            "out/notes.pdf",
        ]);

        assert_eq!(code, 0, "stderr: {}", stderr);
        assert!(stdout.is_empty());
        let events: Vec<serde_json::Value> =
            stderr.lines().filter(|l| l.starts_with('{')).map(|l| serde_json::from_str(l).unwrap()).collect();
        let done = events.iter().find(|e| e["event"] == "build_completed").unwrap();
        assert_eq!(done["success"], true);
        assert_eq!(done["pages"], 5);
        assert!(temp.path().join("build_pdfs.zip").exists());
        assert!(temp.path().join("out/notes.pdf").exists());
    }

    #[test]
    fn test_build_compile_error_prints_diagnostics() {
        let bin = TempDir::new().unwrap();
        let typst = r#"case "$7" in
  target=0/1) echo "error: unknown variable: maps" >&2; exit 1 ;;
esac
echo "$7" > "$3""#;
        let (temp, config) = create_project(&tools(bin.path(), typst));
        let (_, stderr, code) = run(&["--config", &config_arg(&config), "build", "--plain"]);

        assert_eq!(code, 1);
        assert!(stderr.contains("Build error: typst failed on '0/1'"), "{}", stderr);
        assert!(stderr.contains("error: unknown variable: maps"), "{}", stderr);
        assert!(temp.path().join("templates/build/20_page_0_0.pdf").exists());
        assert!(!temp.path().join("output.pdf").exists());
    }
}

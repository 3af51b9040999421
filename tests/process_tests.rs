//! External process tests
//!
//! Shell scripts stand in for typst, pdfinfo, pdfunite and Ghostscript so
//! the real child-process paths run without the actual tools:
//!
//! - Compiler output streaming, exit codes and cancellation
//! - Page counting through `pdfinfo`
//! - Merge fallback from `pdfunite` to Ghostscript
//! - Tool lookup on `PATH`
#![cfg(unix)]

use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

use noteworthy::build::{
    ArtifactMerger, BuildContext, BuildOrchestrator, CompileError, CompileRequest, NullProgress, PageCounter,
    PdfInfo, SectionCompiler, Selection, Toolchain, TypstCompiler,
};
use noteworthy::config::default_config;

// ============================================================================
// Test Utilities
// ============================================================================

/// Write an executable shell script.
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn typst(temp: &TempDir, body: &str) -> TypstCompiler {
    let program = script(temp.path(), "typst", body);
    let scratch = temp.path().join("build");
    fs::create_dir_all(&scratch).unwrap();
    TypstCompiler::new(program.to_str().unwrap(), temp.path().join("parser.typ"), temp.path().to_path_buf(), &scratch)
        .with_poll_interval(Duration::from_millis(5))
}

fn request<'a>(target: &'a str, output: &'a Path) -> CompileRequest<'a> {
    CompileRequest { target, output, page_offset: Some(3), page_map: None, extra_flags: &[] }
}

/// Restores `PATH` when dropped.
struct PathGuard(Option<std::ffi::OsString>);

impl PathGuard {
    fn set(dir: &Path) -> Self {
        let previous = std::env::var_os("PATH");
        std::env::set_var("PATH", dir);
        Self(previous)
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        match self.0.take() {
            Some(path) => std::env::set_var("PATH", path),
            None => std::env::remove_var("PATH"),
        }
    }
}

// ============================================================================
// Compiler
// ============================================================================

#[test]
fn test_compiler_streams_output_and_writes_artifact() {
    let temp = TempDir::new().unwrap();
    let compiler = typst(
        &temp,
        r#"echo "warning: unused import" >&2
echo "%PDF-1.7" > "$3"
echo "compiled $7""#,
    );
    let out = temp.path().join("build/00_cover.pdf");

    let mut chunks = Vec::new();
    let text = compiler.compile(&request("cover", &out), &mut |c| chunks.push(c.to_string()), &mut || true).unwrap();

    assert!(out.exists());
    assert!(text.contains("warning: unused import"));
    assert!(text.contains("compiled target=cover"));
    assert!(chunks.first().unwrap().starts_with("[compile] cover"));
    assert!(chunks.iter().any(|c| c.contains("warning: unused import")));
    assert_eq!(chunks.last().unwrap(), "[done] cover\n");
}

#[test]
fn test_compiler_passes_page_offset() {
    let temp = TempDir::new().unwrap();
    let compiler = typst(&temp, r#"echo "$@" > "$3""#);
    let out = temp.path().join("build/20_page_0_0.pdf");

    compiler.compile(&request("0/0", &out), &mut |_| {}, &mut || true).unwrap();

    let args = fs::read_to_string(&out).unwrap();
    assert!(args.starts_with("compile "));
    assert!(args.contains("--input target=0/0 --input page-offset=3"));
}

#[test]
fn test_compiler_failure_carries_diagnostics() {
    let temp = TempDir::new().unwrap();
    let compiler = typst(
        &temp,
        r#"echo "error: unknown variable: foo" >&2
echo "  ┌─ content/1/1.typ:4:2" >&2
exit 3"#,
    );
    let out = temp.path().join("build/20_page_0_0.pdf");

    let err = compiler.compile(&request("0/0", &out), &mut |_| {}, &mut || true).unwrap_err();

    match err {
        CompileError::Failed { target, code, diagnostics } => {
            assert_eq!(target, "0/0");
            assert_eq!(code, 3);
            assert!(diagnostics.contains("error: unknown variable: foo"));
            assert!(diagnostics.contains("content/1/1.typ:4:2"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_compiler_cancel_kills_child_and_removes_output() {
    let temp = TempDir::new().unwrap();
    let compiler = typst(
        &temp,
        r#"echo "partial" > "$3"
exec sleep 30"#,
    );
    let out = temp.path().join("build/01_preface.pdf");
    let started = Instant::now();

    let watched = out.clone();
    let err = compiler.compile(&request("preface", &out), &mut |_| {}, &mut || !watched.exists()).unwrap_err();

    assert!(matches!(err, CompileError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!out.exists());
}

// ============================================================================
// Page Counting
// ============================================================================

#[test]
fn test_pdfinfo_report_is_parsed() {
    let temp = TempDir::new().unwrap();
    let program = script(
        temp.path(),
        "pdfinfo",
        r#"echo "Title:          notes"
echo "Pages:          12"
echo "Encrypted:      no""#,
    );
    let pdf = temp.path().join("a.pdf");
    fs::write(&pdf, "%PDF").unwrap();

    assert_eq!(PdfInfo::new(program.to_str().unwrap()).count_pages(&pdf), 12);
}

#[test]
fn test_pdfinfo_failure_counts_zero() {
    let temp = TempDir::new().unwrap();
    let program = script(temp.path(), "pdfinfo", "echo 'Syntax Error' >&2\nexit 1");
    let pdf = temp.path().join("a.pdf");
    fs::write(&pdf, "%PDF").unwrap();

    let counter = PdfInfo::new(program.to_str().unwrap());
    assert_eq!(counter.count_pages(&pdf), 0);
    assert_eq!(counter.count_pages(&temp.path().join("missing.pdf")), 0);
}

// ============================================================================
// Merging
// ============================================================================

const GHOSTSCRIPT: &str = r#"for arg; do
  case "$arg" in
    -sOutputFile=*) out="${arg#-sOutputFile=}" ;;
    -*) ;;
    *) cat "$arg" >> "$out" ;;
  esac
done"#;

#[test]
fn test_merge_falls_back_to_ghostscript() {
    let temp = TempDir::new().unwrap();
    let pdfunite = script(temp.path(), "pdfunite", "echo 'Syntax Error: broken' >&2\nexit 1");
    let gs = script(temp.path(), "gs", GHOSTSCRIPT);
    let inputs: Vec<PathBuf> = ["a", "b"]
        .iter()
        .map(|name| {
            let path = temp.path().join(format!("{}.pdf", name));
            fs::write(&path, format!("{}\n", name)).unwrap();
            path
        })
        .collect();
    let output = temp.path().join("output.pdf");

    let merger = ArtifactMerger::standard(pdfunite.to_str().unwrap(), gs.to_str().unwrap());
    let tool = merger.merge(&inputs, &output).unwrap();

    assert_eq!(tool, "ghostscript");
    assert_eq!(fs::read_to_string(&output).unwrap(), "a\nb\n");
}

#[test]
fn test_pdfunite_receives_inputs_then_output() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("args.txt");
    let pdfunite = script(
        temp.path(),
        "pdfunite",
        &format!("echo \"$@\" > {}\nfor last; do :; done\necho merged > \"$last\"", log.display()),
    );
    let inputs = vec![temp.path().join("1.pdf"), temp.path().join("2.pdf")];
    for input in &inputs {
        fs::write(input, "%PDF").unwrap();
    }
    let output = temp.path().join("output.pdf");

    let merger = ArtifactMerger::standard(pdfunite.to_str().unwrap(), "noteworthy-missing-gs");
    assert_eq!(merger.merge(&inputs, &output).unwrap(), "pdfunite");

    let args = fs::read_to_string(&log).unwrap();
    assert_eq!(args.trim(), format!("{} {} {}", inputs[0].display(), inputs[1].display(), output.display()));
}

// ============================================================================
// Full Build With Scripted Tools
// ============================================================================

#[test]
fn test_build_with_scripted_tools() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("notes");
    let bin = temp.path().join("bin");
    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("content/1")).unwrap();
    fs::create_dir_all(&bin).unwrap();
    fs::write(root.join("config/hierarchy.json"), r#"[{"title": "Sets", "pages": [{"title": "a"}, {"title": "b"}]}]"#)
        .unwrap();
    fs::write(root.join("content/1/1.typ"), "").unwrap();
    fs::write(root.join("content/1/2.typ"), "").unwrap();

    let mut config = default_config();
    config.tools.typst = script(&bin, "typst", r#"echo "$7" > "$3""#).display().to_string();
    config.tools.pdfinfo = script(&bin, "pdfinfo", "echo 'Pages: 2'").display().to_string();
    config.tools.pdfunite = script(&bin, "pdfunite", "exit 1").display().to_string();
    config.tools.ghostscript = script(&bin, "gs", GHOSTSCRIPT).display().to_string();
    config.tools.pdftk = bin.join("pdftk").display().to_string();
    config.build.poll_interval_ms = 5;

    let context = BuildContext::new(config, root.clone());
    let project = context.load_project().unwrap();
    project.check_content().unwrap();
    let orchestrator = BuildOrchestrator::from_context(&context, context.options());

    let report = orchestrator.run(&project, &Selection::all(&project.hierarchy), &NullProgress).unwrap();

    assert!(report.is_success());
    assert_eq!(report.merged_with.as_deref(), Some("ghostscript"));
    assert!(report.metadata_applied);
    // cover, preface, outline, chapter cover, two pages at two pages each
    assert_eq!(report.total_pages, 12);
    assert_eq!(report.compile_count(), 7);
    assert!(root.join("output.pdf").exists());
    assert!(!root.join("templates/build").exists());
}

// ============================================================================
// Tool Lookup
// ============================================================================

#[test]
#[serial]
fn test_toolchain_found_on_path() {
    let temp = TempDir::new().unwrap();
    for name in ["typst", "pdfinfo", "gs"] {
        script(temp.path(), name, "exit 0");
    }
    let _guard = PathGuard::set(temp.path());

    let toolchain = Toolchain::default();
    assert!(toolchain.missing().is_empty());

    let statuses = toolchain.check();
    let metadata = statuses.iter().find(|s| s.optional).unwrap();
    assert_eq!(metadata.found.as_deref(), Some(temp.path().join("gs").as_path()));
}

#[test]
#[serial]
fn test_toolchain_reports_missing_tools() {
    let temp = TempDir::new().unwrap();
    script(temp.path(), "typst", "exit 0");
    fs::write(temp.path().join("pdfinfo"), "not executable").unwrap();
    let _guard = PathGuard::set(temp.path());

    let missing: Vec<String> = Toolchain::default().missing().into_iter().map(|r| r.name).collect();
    assert_eq!(missing, vec!["PDF inspector", "PDF merger"]);
}

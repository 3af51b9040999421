//! Build command implementations (build, plan)

use serde_json::json;
use std::path::Path;
use std::process::ExitCode;

use super::{
    init_logging, open_context, open_project, resolve_selection, EXIT_CANCELLED, EXIT_ERROR, EXIT_INVALID_ARGS,
    EXIT_SUCCESS,
};
use crate::build::{BuildError, BuildOrchestrator, BuildPlan, BuildReport, ConsoleProgress, JsonProgress, SelectItem};
use crate::config::CliOverrides;
use crate::ui::{run_selection_menu, SelectionMenu, TerminalProgress};

/// How build progress is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Terminal,
    Plain,
    Json,
}

impl OutputMode {
    /// The terminal UI unless stderr is not a terminal or another mode is requested.
    pub fn choose(plain: bool, json: bool) -> Self {
        if json {
            OutputMode::Json
        } else if plain || !atty::is(atty::Stream::Stderr) {
            OutputMode::Plain
        } else {
            OutputMode::Terminal
        }
    }
}

/// Run the build command
pub fn run_build(
    config: Option<&Path>,
    overrides: &CliOverrides,
    select: &[SelectItem],
    mode: OutputMode,
    interactive: bool,
    verbose: bool,
) -> ExitCode {
    let context = match open_context(config, overrides) {
        Ok(context) => context.with_verbose(verbose),
        Err(code) => return code,
    };
    let project = match open_project(&context) {
        Ok(project) => project,
        Err(code) => return code,
    };
    let mut selection = match resolve_selection(select, &project) {
        Ok(selection) => selection,
        Err(code) => return code,
    };
    let mut options = context.options();

    if interactive && mode == OutputMode::Terminal {
        let mut menu = SelectionMenu::new(&project.hierarchy, &project.content, selection, options);
        match run_selection_menu(&mut menu) {
            Ok(true) => (selection, options) = menu.into_choice(),
            Ok(false) => return ExitCode::from(EXIT_SUCCESS),
            Err(e) => {
                eprintln!("Error: cannot open the terminal: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    let debug_log = options.debug.then(|| context.debug_log());
    init_logging(debug_log.as_deref(), mode != OutputMode::Terminal);
    log::info!("Project root: {}", context.project_root().display());

    let orchestrator = BuildOrchestrator::from_context(&context, options.clone());

    match mode {
        OutputMode::Terminal => {
            let progress = match TerminalProgress::start(options.debug) {
                Ok(progress) => progress,
                Err(e) => {
                    eprintln!("Error: cannot open the terminal: {}", e);
                    return ExitCode::from(EXIT_ERROR);
                }
            };
            let result = orchestrator.run(&project, &selection, &progress);
            if !matches!(result, Err(BuildError::Cancelled)) {
                let _ = progress.wait_for_key("Press any key to exit");
            }
            let view = progress.finish();

            let diagnostics = view.compiler_log();
            if diagnostics.has_warnings() && result.is_ok() {
                eprintln!("Typst reported {} warning(s):", diagnostics.warning_count());
                eprint!("{}", diagnostics.full_text());
            }
            finish(result, true)
        }
        OutputMode::Plain => {
            let progress = ConsoleProgress::new().with_verbose(verbose);
            finish(orchestrator.run(&project, &selection, &progress), true)
        }
        OutputMode::Json => {
            let progress = JsonProgress::new();
            finish(orchestrator.run(&project, &selection, &progress), false)
        }
    }
}

fn finish(result: Result<BuildReport, BuildError>, print_summary: bool) -> ExitCode {
    match result {
        Ok(report) => {
            if print_summary {
                println!("{}", report.summary());
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(BuildError::Cancelled) => {
            eprintln!("Build cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            if let Some(diagnostics) = e.diagnostics() {
                eprintln!();
                eprint!("{}", diagnostics);
            }
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the plan command
pub fn run_plan(config: Option<&Path>, overrides: &CliOverrides, select: &[SelectItem], json: bool) -> ExitCode {
    let context = match open_context(config, overrides) {
        Ok(context) => context,
        Err(code) => return code,
    };
    let project = match open_project(&context) {
        Ok(project) => project,
        Err(code) => return code,
    };
    let selection = match resolve_selection(select, &project) {
        Ok(selection) => selection,
        Err(code) => return code,
    };
    if selection.is_empty() {
        eprintln!("Error: nothing selected");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let build_dir = context.build_dir();
    let plan = BuildPlan::new(&project.hierarchy, &selection, &project.layout, context.options().frontmatter, &build_dir);

    if json {
        println!("{}", plan_json(&plan));
    } else {
        print_plan(&plan, context.project_root());
    }
    ExitCode::from(EXIT_SUCCESS)
}

fn plan_json(plan: &BuildPlan) -> serde_json::Value {
    let targets: Vec<serde_json::Value> = plan
        .targets()
        .iter()
        .map(|t| {
            json!({
                "target": t.name,
                "key": t.key,
                "label": t.label,
                "output": t.output.display().to_string(),
            })
        })
        .collect();
    json!({
        "targets": targets,
        "regenerate_outline": plan.regenerates_outline(),
        "total_units": plan.total_units(),
    })
}

fn print_plan(plan: &BuildPlan, root: &Path) {
    println!("Plan: {} targets, {} progress units", plan.len(), plan.total_units());
    for (i, target) in plan.targets().iter().enumerate() {
        let output = target.output.strip_prefix(root).unwrap_or(&target.output);
        println!("  {:>3}. {:<12} {:<40} {}", i + 1, target.name, target.label, output.display());
    }
    if plan.regenerates_outline() {
        println!("    +  outline      recompiled last with the final page map");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Selection;
    use crate::project::{DocumentLayout, Hierarchy};

    #[test]
    fn test_output_mode_choice() {
        assert_eq!(OutputMode::choose(false, true), OutputMode::Json);
        assert_eq!(OutputMode::choose(true, false), OutputMode::Plain);
    }

    #[test]
    fn test_plan_json() {
        let hierarchy = Hierarchy::from_json(r#"[{"title": "A", "pages": [{"title": "a"}]}]"#).unwrap();
        let plan = BuildPlan::new(
            &hierarchy,
            &Selection::all(&hierarchy),
            &DocumentLayout::default(),
            false,
            Path::new("build"),
        );
        let value = plan_json(&plan);
        assert_eq!(value["total_units"], 2);
        assert_eq!(value["regenerate_outline"], false);
        assert_eq!(value["targets"][0]["target"], "chapter-0");
        assert_eq!(value["targets"][0]["key"], "chapter-1");
        assert_eq!(value["targets"][1]["label"], "Section 1: a");
    }
}

//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod doctor;

use clap::{Parser, Subcommand};
use env_logger::{Env, Target};
use log::LevelFilter;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::build::{BuildContext, ProjectData, SelectItem, Selection};
use crate::config::{default_config, find_config, load_config, merge_cli_overrides, project_root, CliOverrides};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;
pub(crate) const EXIT_CANCELLED: u8 = 130;

/// Noteworthy - build Typst document projects into a single PDF
#[derive(Parser)]
#[command(name = "noteworthy")]
#[command(about = "Noteworthy - compile Typst notes section by section and merge them into one PDF")]
#[command(version)]
pub struct Cli {
    /// Path to noteworthy.toml (default: search upward from the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Page selection and frontmatter arguments shared by `build` and `plan`
#[derive(clap::Args, Debug, Clone)]
pub struct SelectArgs {
    /// Build only these chapters or pages: `2` for a whole chapter, `2/0`
    /// for one page (zero-based indices). Repeatable; default is everything.
    #[arg(short, long = "select", value_name = "CH[/PG]")]
    pub select: Vec<SelectItem>,

    /// Compile cover, preface and table of contents
    #[arg(long, overrides_with = "no_frontmatter")]
    pub frontmatter: bool,

    /// Skip cover, preface and table of contents
    #[arg(long)]
    pub no_frontmatter: bool,
}

impl SelectArgs {
    fn frontmatter_override(&self) -> Option<bool> {
        if self.no_frontmatter {
            Some(false)
        } else if self.frontmatter {
            Some(true)
        } else {
            None
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile, merge and stamp the document
    Build {
        #[command(flatten)]
        select: SelectArgs,

        /// Keep the individual section PDFs in a zip archive
        #[arg(long)]
        keep_pdfs: bool,

        /// Write debug logs to the configured log file
        #[arg(long)]
        debug: bool,

        /// Extra argument passed to every typst invocation (repeatable)
        #[arg(long = "typst-flag", value_name = "ARG", allow_hyphen_values = true)]
        typst_flags: Vec<String>,

        /// Merged output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Plain console output instead of the terminal UI
        #[arg(long)]
        plain: bool,

        /// Machine-readable JSON progress on stderr
        #[arg(long, conflicts_with = "plain")]
        json: bool,

        /// Choose pages and options in a menu before building
        #[arg(short, long, conflicts_with_all = ["plain", "json"])]
        interactive: bool,

        /// Show compiler output in plain mode
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the targets a build would compile, without compiling
    Plan {
        #[command(flatten)]
        select: SelectArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the external tools are installed
    Doctor,
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Build { select, keep_pdfs, debug, typst_flags, output, plain, json, interactive, verbose } => {
            let overrides = CliOverrides {
                output,
                frontmatter: select.frontmatter_override(),
                leave_individual: keep_pdfs.then_some(true),
                debug: debug.then_some(true),
                typst_flags: (!typst_flags.is_empty()).then_some(typst_flags),
            };
            let mode = build::OutputMode::choose(plain, json);
            build::run_build(config, &overrides, &select.select, mode, interactive, verbose)
        }
        Commands::Plan { select, json } => {
            let overrides = CliOverrides { frontmatter: select.frontmatter_override(), ..Default::default() };
            build::run_plan(config, &overrides, &select.select, json)
        }
        Commands::Doctor => doctor::run_doctor(config),
    }
}

/// Load the configuration and apply CLI overrides.
///
/// The project root is the directory holding the config file, or the current
/// directory when none is found.
pub(crate) fn open_context(config_path: Option<&Path>, overrides: &CliOverrides) -> Result<BuildContext, ExitCode> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let found = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config(),
    };

    let (mut config, root) = match found {
        Some(path) => match load_config(Some(&path)) {
            Ok(config) => {
                let root = project_root(&path)
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(|p| cwd.join(p))
                    .unwrap_or_else(|| cwd.clone());
                (config, root)
            }
            Err(e) => {
                eprintln!("Error loading {}: {}", path.display(), e);
                return Err(ExitCode::from(EXIT_INVALID_ARGS));
            }
        },
        None => (default_config(), cwd),
    };

    merge_cli_overrides(&mut config, overrides);
    Ok(BuildContext::new(config, root))
}

/// Load and check the project data.
pub(crate) fn open_project(context: &BuildContext) -> Result<ProjectData, ExitCode> {
    let project = match context.load_project() {
        Ok(project) => project,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
    };
    if let Err(e) = project.check_content() {
        eprintln!("Error: {}", e);
        eprintln!("Fix {} or the content folders to proceed", context.config().project.hierarchy.display());
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }
    Ok(project)
}

/// Resolve `--select` arguments; none means every page.
pub(crate) fn resolve_selection(items: &[SelectItem], project: &ProjectData) -> Result<Selection, ExitCode> {
    if items.is_empty() {
        return Ok(Selection::all(&project.hierarchy));
    }
    Selection::from_items(items, &project.hierarchy).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

/// Install the logger.
///
/// With a debug log every record down to `debug` goes to that file. Otherwise
/// records go to stderr filtered by `RUST_LOG` (default `warn`), unless the
/// terminal UI owns the screen.
pub(crate) fn init_logging(debug_log: Option<&Path>, stderr: bool) {
    if let Some(path) = debug_log {
        match File::create(path) {
            Ok(file) => {
                let _ = env_logger::Builder::new()
                    .filter_level(LevelFilter::Debug)
                    .target(Target::Pipe(Box::new(file)))
                    .format_timestamp_millis()
                    .try_init();
                log::info!("Debug mode enabled");
                return;
            }
            Err(e) => eprintln!("Warning: cannot open debug log {}: {}", path.display(), e),
        }
    }
    if stderr {
        let _ = env_logger::Builder::from_env(Env::default().default_filter_or("warn")).try_init();
    }
}

//! Build pipeline module for noteworthy
//!
//! Compiles a Typst document section by section and assembles the merged
//! PDF.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Planning**: Turn a selection of pages into ordered compile targets
//! - **Compiling**: Run `typst compile` per target, tracking page offsets
//! - **Merging**: Concatenate the section PDFs with `pdfunite` or Ghostscript
//! - **Metadata**: Stamp title, author and bookmarks with `pdftk` or Ghostscript
//!
//! # Example
//!
//! ```ignore
//! use noteworthy::build::{BuildContext, BuildOrchestrator, NullProgress, Selection};
//! use noteworthy::config::load_config;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root);
//! let project = context.load_project()?;
//! let orchestrator = BuildOrchestrator::from_context(&context, context.options());
//!
//! let report = orchestrator.run(&project, &Selection::all(&project.hierarchy), &NullProgress)?;
//! println!("Built {} pages", report.total_pages);
//! ```

pub mod archive;
pub mod compiler;
pub mod context;
pub mod diagnostics;
pub mod merge;
pub mod metadata;
pub mod page_map;
pub mod pages;
pub mod phase;
pub mod pipeline;
pub mod progress;
pub mod result;
pub mod selection;
pub mod target;
pub mod tools;

pub use archive::*;
pub use compiler::*;
pub use context::*;
pub use diagnostics::*;
pub use merge::*;
pub use metadata::*;
pub use page_map::*;
pub use pages::*;
pub use phase::*;
pub use pipeline::*;
pub use progress::*;
pub use result::*;
pub use selection::*;
pub use target::*;
pub use tools::*;

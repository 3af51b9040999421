//! Noteworthy - build orchestrator for Typst document projects
//!
//! This library provides functionality to:
//! - Plan the sections of a document selection and compile each with Typst
//! - Track page offsets so every section knows where it lands in the result
//! - Merge section PDFs and stamp title, author and bookmarks
//! - Report progress to the console, as JSON lines, or in a terminal UI

pub mod build;
pub mod cli;
pub mod config;
pub mod project;
pub mod ui;

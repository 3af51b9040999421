//! Noteworthy - command-line build tool for Typst document projects

use std::process::ExitCode;

use noteworthy::cli;

fn main() -> ExitCode {
    cli::run()
}

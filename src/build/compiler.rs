//! Section compilation through the Typst CLI.
//!
//! The compiler runs as a child process. Its stdout and stderr are read
//! line by line on two reader threads and forwarded over a channel, so the
//! calling thread can keep polling for cancellation, forward output live and
//! sleep briefly between ticks without ever blocking on the child.

use log::{debug, error, info, warn};
use std::ffi::OsString;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::build::PageMap;

/// Default sleep between polls of a running compiler.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Error compiling one section
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("typst failed on '{target}' (exit code {code})")]
    Failed { target: String, code: i32, diagnostics: String },
    #[error("build cancelled")]
    Cancelled,
    #[error("Failed to launch '{tool}': {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error while compiling: {0}")]
    Io(#[from] std::io::Error),
}

/// One compiler invocation.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Value of the renderer's `target` input
    pub target: &'a str,
    /// Artifact to produce
    pub output: &'a Path,
    pub page_offset: Option<u32>,
    pub page_map: Option<&'a PageMap>,
    /// Passed through verbatim after the generated arguments
    pub extra_flags: &'a [String],
}

/// Compiles one logical section into one artifact.
pub trait SectionCompiler: Send + Sync {
    /// Compile a section, forwarding output lines to `on_output` and
    /// checking `on_poll` between ticks; returning `false` from `on_poll`
    /// cancels the compile.
    ///
    /// Returns the combined stdout and stderr text on success.
    fn compile(
        &self,
        request: &CompileRequest<'_>,
        on_output: &mut dyn FnMut(&str),
        on_poll: &mut dyn FnMut() -> bool,
    ) -> Result<String, CompileError>;
}

/// [`SectionCompiler`] running `typst compile`.
#[derive(Debug, Clone)]
pub struct TypstCompiler {
    program: String,
    renderer: PathBuf,
    root: PathBuf,
    page_map_file: PathBuf,
    poll_interval: Duration,
}

impl TypstCompiler {
    /// Create a compiler for `renderer`, resolving paths against `root` and
    /// writing page-map files into `scratch_dir`.
    pub fn new(program: impl Into<String>, renderer: PathBuf, root: PathBuf, scratch_dir: &Path) -> Self {
        Self {
            program: program.into(),
            renderer,
            root,
            page_map_file: scratch_dir.join("page_map.json"),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Path of the page-map file handed to the renderer.
    pub fn page_map_file(&self) -> &Path {
        &self.page_map_file
    }

    /// Command-line arguments for a request.
    ///
    /// A page map is written to the scratch file and referenced by its
    /// root-relative path. It is inlined only when the file cannot be
    /// written or lies outside the root.
    pub fn arguments(&self, request: &CompileRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "compile".into(),
            self.renderer.clone().into(),
            request.output.into(),
            "--root".into(),
            self.root.clone().into(),
            "--input".into(),
            format!("target={}", request.target).into(),
        ];

        if let Some(offset) = request.page_offset {
            args.push("--input".into());
            args.push(format!("page-offset={}", offset).into());
        }

        if let Some(map) = request.page_map {
            args.push("--input".into());
            args.push(self.page_map_input(map).into());
        }

        args.extend(request.extra_flags.iter().map(OsString::from));
        args
    }

    fn page_map_input(&self, map: &PageMap) -> String {
        match map.write_to(&self.page_map_file) {
            Ok(()) => {
                debug!("Wrote page map to {}", self.page_map_file.display());
                match self.page_map_file.strip_prefix(&self.root) {
                    Ok(rel) => {
                        let rel: Vec<String> =
                            rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
                        return format!("page-map-file=/{}", rel.join("/"));
                    }
                    Err(_) => warn!(
                        "{} is outside {}; passing page map inline",
                        self.page_map_file.display(),
                        self.root.display()
                    ),
                }
            }
            Err(e) => error!("Failed to write {}: {}", self.page_map_file.display(), e),
        }
        format!("page-map={}", map.to_json())
    }
}

impl SectionCompiler for TypstCompiler {
    fn compile(
        &self,
        request: &CompileRequest<'_>,
        on_output: &mut dyn FnMut(&str),
        on_poll: &mut dyn FnMut() -> bool,
    ) -> Result<String, CompileError> {
        let args = self.arguments(request);
        info!("Compiling {} -> {}", request.target, request.output.display());
        debug!("{} {:?}", self.program, args);

        let file_name = request.output.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        on_output(&format!("[compile] {} -> {}\n", request.target, file_name));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompileError::Launch { tool: self.program.clone(), source })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx.clone()));
        }
        drop(tx);

        let mut collected = String::new();
        let status = loop {
            if !on_poll() {
                warn!("Cancelling compile of {}", request.target);
                let _ = child.kill();
                let _ = child.wait();
                remove_partial(request.output);
                return Err(CompileError::Cancelled);
            }
            forward(&rx, &mut collected, on_output);
            if let Some(status) = child.try_wait()? {
                break status;
            }
            thread::sleep(self.poll_interval);
        };

        for reader in readers {
            let _ = reader.join();
        }
        forward(&rx, &mut collected, on_output);

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            error!("typst failed on {} with exit code {}", request.target, code);
            error!("{}", collected);
            return Err(CompileError::Failed { target: request.target.to_string(), code, diagnostics: collected });
        }

        on_output(&format!("[done] {}\n", request.target));
        Ok(collected)
    }
}

fn spawn_reader<R: Read + Send + 'static>(stream: R, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn forward(rx: &Receiver<String>, collected: &mut String, on_output: &mut dyn FnMut(&str)) {
    while let Ok(chunk) = rx.try_recv() {
        collected.push_str(&chunk);
        on_output(&chunk);
    }
}

fn remove_partial(output: &Path) {
    if output.exists() {
        if let Err(e) = fs::remove_file(output) {
            warn!("Failed to remove partial {}: {}", output.display(), e);
        }
    }
}

//! Zip archive of the individual section PDFs.

use glob::{glob, Pattern};
use log::info;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Error writing the archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Archive every PDF under `build_dir` into `archive`.
///
/// Entries are named `<build dir name>/<relative path>` and written in
/// sorted order. Returns the number of files archived.
pub fn archive_artifacts(build_dir: &Path, archive: &Path) -> Result<usize, ArchiveError> {
    let pattern = format!("{}/**/*.pdf", Pattern::escape(&build_dir.display().to_string()));
    let mut files: Vec<PathBuf> = glob(&pattern)?.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    files.sort();

    let prefix = build_dir.file_name().map(PathBuf::from).unwrap_or_default();
    if let Some(parent) = archive.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut zip = ZipWriter::new(File::create(archive)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in &files {
        let relative = file.strip_prefix(build_dir).unwrap_or(file);
        let name: Vec<String> = prefix
            .join(relative)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        zip.start_file(name.join("/"), options)?;
        zip.write_all(&fs::read(file)?)?;
    }
    zip.finish()?;

    info!("Archived {} files to {}", files.len(), archive.display());
    Ok(files.len())
}

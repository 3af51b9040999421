//! Document info and bookmark outline for the merged PDF.
//!
//! Bookmarks are derived from the page map, so only sections that were
//! actually compiled appear. They are then stamped onto the merged PDF with
//! `pdftk` or, failing that, Ghostscript pdfmarks.

use log::{error, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::build::tools::{find_executable, run_tool, ToolError};
use crate::build::PageMap;
use crate::project::Hierarchy;

/// One outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    /// 1 for frontmatter and chapters, 2 for pages
    pub level: u8,
    /// 1-based page in the merged PDF
    pub page: u32,
}

impl Bookmark {
    pub fn new(title: impl Into<String>, level: u8, page: u32) -> Self {
        Self { title: title.into(), level, page }
    }
}

/// Derive the outline from the page map.
///
/// Frontmatter entries come first, then each chapter heading followed by
/// its pages, in hierarchy order. Sections absent from the page map are
/// skipped.
pub fn write_bookmarks(hierarchy: &Hierarchy, page_map: &PageMap) -> Vec<Bookmark> {
    let mut bookmarks = Vec::new();

    for (key, title) in [("cover", "Cover"), ("preface", "Preface"), ("outline", "Table of Contents")] {
        if let Some(page) = page_map.get(key) {
            bookmarks.push(Bookmark::new(title, 1, page));
        }
    }

    for (ci, chapter) in hierarchy.chapters().iter().enumerate() {
        if let Some(page) = page_map.get(&format!("chapter-{}", ci + 1)) {
            bookmarks.push(Bookmark::new(chapter.title.clone(), 1, page));
        }
        for (pi, p) in chapter.pages.iter().enumerate() {
            if let Some(page) = page_map.get(&format!("{}/{}", ci, pi)) {
                bookmarks.push(Bookmark::new(p.title.clone(), 2, page));
            }
        }
    }

    bookmarks
}

/// pdftk bookmark blocks.
pub fn bookmark_text(bookmarks: &[Bookmark]) -> String {
    let mut text = String::new();
    for b in bookmarks {
        text.push_str("BookmarkBegin\n");
        text.push_str(&format!("BookmarkTitle: {}\n", b.title));
        text.push_str(&format!("BookmarkLevel: {}\n", b.level));
        text.push_str(&format!("BookmarkPageNumber: {}\n", b.page));
    }
    text
}

/// pdftk info block.
pub fn info_text(title: &str, author: &str) -> String {
    format!("InfoBegin\nInfoKey: Title\nInfoValue: {}\nInfoKey: Author\nInfoValue: {}\n", title, author)
}

/// Ghostscript pdfmark directives.
///
/// `/Count` holds the number of direct children so nested pages render
/// under their chapter.
pub fn pdfmark_text(title: &str, author: &str, bookmarks: &[Bookmark]) -> String {
    let mut lines = vec![format!(
        "[ /Title {} /Author {} /DOCINFO pdfmark",
        pdf_string(title),
        pdf_string(author)
    )];
    for (i, b) in bookmarks.iter().enumerate() {
        let children = bookmarks[i + 1..]
            .iter()
            .take_while(|next| next.level > b.level)
            .filter(|next| next.level == b.level + 1)
            .count();
        lines.push(format!(
            "[ /Title {} /Page {} /Count {} /OUT pdfmark",
            pdf_string(&b.title),
            b.page,
            children
        ));
    }
    lines.join("\n") + "\n"
}

/// Encode a PostScript string literal, as UTF-16BE hex when not ASCII.
fn pdf_string(s: &str) -> String {
    if s.is_ascii() {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('(');
        for c in s.chars() {
            match c {
                '(' | ')' | '\\' => {
                    out.push('\\');
                    out.push(c);
                }
                '\n' | '\r' => out.push(' '),
                c => out.push(c),
            }
        }
        out.push(')');
        out
    } else {
        let hex: String = s.encode_utf16().map(|u| format!("{:04X}", u)).collect();
        format!("<FEFF{}>", hex)
    }
}

/// An external program that stamps info and bookmarks onto a PDF in place.
pub trait MetadataTool: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Rewrite `pdf` with metadata, using `work_dir` for intermediate files.
    fn apply(
        &self,
        pdf: &Path,
        title: &str,
        author: &str,
        bookmarks: &[Bookmark],
        work_dir: &Path,
    ) -> Result<(), ToolError>;
}

/// `pdftk update_info_utf8`, info then bookmarks.
#[derive(Debug, Clone)]
pub struct PdfTk {
    program: String,
}

impl PdfTk {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl MetadataTool for PdfTk {
    fn name(&self) -> &str {
        "pdftk"
    }

    fn is_available(&self) -> bool {
        find_executable(&self.program).is_some()
    }

    fn apply(
        &self,
        pdf: &Path,
        title: &str,
        author: &str,
        bookmarks: &[Bookmark],
        work_dir: &Path,
    ) -> Result<(), ToolError> {
        let info = work_dir.join("info.txt");
        let marks = work_dir.join("bookmarks.txt");
        let temp = work_dir.join("temp.pdf");
        let temp2 = work_dir.join("temp2.pdf");
        fs::write(&info, info_text(title, author))?;
        fs::write(&marks, bookmark_text(bookmarks))?;

        run_tool(&self.program, [pdf, Path::new("update_info_utf8"), info.as_path(), Path::new("output"), temp.as_path()])?;
        run_tool(&self.program, [temp.as_path(), Path::new("update_info_utf8"), marks.as_path(), Path::new("output"), temp2.as_path()])?;
        let _ = fs::remove_file(&temp);
        replace_file(&temp2, pdf)?;
        Ok(())
    }
}

/// Ghostscript with a pdfmark file appended to the inputs.
#[derive(Debug, Clone)]
pub struct GhostscriptMarks {
    program: String,
}

impl GhostscriptMarks {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl MetadataTool for GhostscriptMarks {
    fn name(&self) -> &str {
        "ghostscript"
    }

    fn is_available(&self) -> bool {
        find_executable(&self.program).is_some()
    }

    fn apply(
        &self,
        pdf: &Path,
        title: &str,
        author: &str,
        bookmarks: &[Bookmark],
        work_dir: &Path,
    ) -> Result<(), ToolError> {
        let pdfmark = work_dir.join("bookmarks.pdfmark");
        let temp = work_dir.join("temp.pdf");
        fs::write(&pdfmark, pdfmark_text(title, author, bookmarks))?;

        run_tool(
            &self.program,
            [
                "-dBATCH".to_string(),
                "-dNOPAUSE".to_string(),
                "-q".to_string(),
                "-sDEVICE=pdfwrite".to_string(),
                format!("-sOutputFile={}", temp.display()),
                pdf.display().to_string(),
                pdfmark.display().to_string(),
            ],
        )?;
        replace_file(&temp, pdf)?;
        Ok(())
    }
}

/// Move `from` over `to`, copying when they are on different filesystems.
fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

/// Applies metadata with the first metadata tool that works.
pub struct MetadataWriter {
    tools: Vec<Box<dyn MetadataTool>>,
    work_dir: PathBuf,
}

impl std::fmt::Debug for MetadataWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
        f.debug_struct("MetadataWriter").field("tools", &names).field("work_dir", &self.work_dir).finish()
    }
}

impl MetadataWriter {
    pub fn new(tools: Vec<Box<dyn MetadataTool>>, work_dir: PathBuf) -> Self {
        Self { tools, work_dir }
    }

    /// `pdftk` first, then Ghostscript.
    pub fn standard(pdftk: &str, ghostscript: &str, work_dir: PathBuf) -> Self {
        Self::new(vec![Box::new(PdfTk::new(pdftk)), Box::new(GhostscriptMarks::new(ghostscript))], work_dir)
    }

    /// Stamp `artifact`; returns whether any tool succeeded.
    pub fn apply(&self, artifact: &Path, bookmarks: &[Bookmark], title: &str, author: &str) -> bool {
        if let Err(e) = fs::create_dir_all(&self.work_dir) {
            error!("Cannot create {}: {}", self.work_dir.display(), e);
            return false;
        }
        for tool in &self.tools {
            if !tool.is_available() {
                info!("{} not available", tool.name());
                continue;
            }
            match tool.apply(artifact, title, author, bookmarks, &self.work_dir) {
                Ok(()) => {
                    info!("Applied {} bookmarks with {}", bookmarks.len(), tool.name());
                    return true;
                }
                Err(e) => warn!("{} failed to apply metadata: {}", tool.name(), e),
            }
        }
        false
    }
}

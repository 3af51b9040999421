//! Classification and retention of compiler output.

use std::collections::VecDeque;

/// Lines kept for display.
pub const DIAGNOSTIC_LINE_LIMIT: usize = 200;

/// Severity of one compiler output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Error,
    Warning,
    Hint,
    Plain,
}

impl LineKind {
    /// Classify a line by its `error:`, `warning:` or `hint:` marker.
    pub fn classify(line: &str) -> Self {
        let lower = line.to_lowercase();
        if lower.contains("error:") {
            LineKind::Error
        } else if lower.contains("warning:") {
            LineKind::Warning
        } else if lower.contains("hint:") {
            LineKind::Hint
        } else {
            LineKind::Plain
        }
    }
}

/// Compiler output collected across a build.
///
/// Chunks may split lines; incomplete trailing text is held until the next
/// newline or [`DiagnosticLog::finish`].
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    recent: VecDeque<(LineKind, String)>,
    limit: usize,
    full_text: String,
    pending: String,
    errors: usize,
    warnings: usize,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::with_limit(DIAGNOSTIC_LINE_LIMIT)
    }
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            recent: VecDeque::new(),
            limit,
            full_text: String::new(),
            pending: String::new(),
            errors: 0,
            warnings: 0,
        }
    }

    /// Append a chunk of output.
    pub fn push(&mut self, chunk: &str) {
        self.full_text.push_str(chunk);
        self.pending.push_str(chunk);
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            self.push_line(line.trim_end_matches(['\n', '\r']));
        }
    }

    /// Flush any incomplete trailing line.
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.push_line(&line);
        }
    }

    fn push_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let kind = LineKind::classify(line);
        match kind {
            LineKind::Error => self.errors += 1,
            LineKind::Warning => self.warnings += 1,
            _ => {}
        }
        self.recent.push_back((kind, line.to_string()));
        while self.recent.len() > self.limit {
            self.recent.pop_front();
        }
    }

    /// The most recent non-blank lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &(LineKind, String)> {
        self.recent.iter()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    /// Everything received, unabridged.
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }
}

//! Interactive terminal screens: page selection and live build progress.
//!
//! [`BuildView`] and [`SelectionMenu`] hold all screen state and render into
//! any ratatui [`Frame`]; [`TerminalProgress`] owns the real terminal and
//! feeds build events and key presses into a [`BuildView`].

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use log::debug;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Gauge, List, ListItem, ListState, Paragraph};
use ratatui::{DefaultTerminal, Frame};
use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use crate::build::progress::{format_duration, ProgressEvent, ProgressReporter, TargetStatus};
use crate::build::{BuildOptions, BuildPhase, DiagnosticLog, LineKind, Selection};
use crate::project::{ContentLayout, Hierarchy};

/// Build log lines kept on screen.
pub const LOG_LINE_LIMIT: usize = 20;

const SCREEN_WIDTH: u16 = 64;
const BUILD_FOOTER: &str = "Esc: Cancel  |  v: Toggle Typst Log";
const MENU_FOOTER: &str = "Space: Toggle  a/n: All/None  d/f/l/c: Options  Enter: Build  Esc: Back";
const FLAGS_FOOTER: &str = "1: --font-path  2: --ppi 144  3: Clear  Enter: Apply  Esc: Cancel";

/// What the lower panel of the build screen shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    BuildLog,
    CompilerOutput,
}

/// Effect of a key press on the build screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Ignored,
    Redraw,
    Cancel,
}

/// State of the build progress screen.
#[derive(Debug, Clone)]
pub struct BuildView {
    debug: bool,
    phase: Option<BuildPhase>,
    task: String,
    completed: usize,
    total: usize,
    log: VecDeque<(String, bool)>,
    compiler: DiagnosticLog,
    mode: ViewMode,
    scroll: usize,
    cancelled: bool,
    footer: Option<String>,
}

impl BuildView {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            phase: None,
            task: String::new(),
            completed: 0,
            total: 0,
            log: VecDeque::new(),
            compiler: DiagnosticLog::new(),
            mode: ViewMode::BuildLog,
            scroll: 0,
            cancelled: false,
            footer: None,
        }
    }

    /// Append a build log line, keeping the most recent ones.
    pub fn log(&mut self, message: impl Into<String>, ok: bool) {
        self.log.push_back((message.into(), ok));
        while self.log.len() > LOG_LINE_LIMIT {
            self.log.pop_front();
        }
    }

    /// Fold a progress event into the screen state.
    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted { total_units, pages, chapters } => {
                self.total = *total_units;
                self.log(format!("Building {} pages from {} chapters", pages, chapters), true);
            }
            ProgressEvent::PhaseChanged { phase } => self.phase = Some(*phase),
            ProgressEvent::TaskChanged { task } => self.task = task.clone(),
            ProgressEvent::Progress { completed, total } => {
                self.completed = *completed;
                self.total = *total;
            }
            ProgressEvent::TargetStarted { .. } => {}
            ProgressEvent::TargetCompleted { target_id, status, .. } => match status {
                TargetStatus::Success => {}
                TargetStatus::Failed(_) => self.log(format!("{} failed", target_id), false),
                TargetStatus::Cancelled => self.log(format!("{} cancelled", target_id), false),
            },
            ProgressEvent::CompilerOutput { chunk, .. } => self.compiler.push(chunk),
            ProgressEvent::Log { message, ok } => self.log(message.clone(), *ok),
            ProgressEvent::Warning { message, .. } => self.log(format!("Warning: {}", message), false),
            ProgressEvent::Error { message, .. } => self.log(format!("Error: {}", message), false),
            ProgressEvent::BuildCompleted { success, duration_ms, .. } => {
                self.compiler.finish();
                self.task = if *success {
                    format!("Finished in {}", format_duration(*duration_ms))
                } else {
                    format!("Stopped after {}", format_duration(*duration_ms))
                };
            }
        }
    }

    /// React to a key press.
    pub fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        match key.code {
            KeyCode::Esc => {
                if self.cancelled {
                    return KeyAction::Ignored;
                }
                self.cancelled = true;
                self.log("Cancelling...", false);
                KeyAction::Cancel
            }
            KeyCode::Char('v') => {
                self.mode = match self.mode {
                    ViewMode::BuildLog => ViewMode::CompilerOutput,
                    ViewMode::CompilerOutput => ViewMode::BuildLog,
                };
                self.scroll = 0;
                KeyAction::Redraw
            }
            KeyCode::Up | KeyCode::Char('k') if self.mode == ViewMode::CompilerOutput => {
                self.scroll = self.scroll.saturating_sub(1);
                KeyAction::Redraw
            }
            KeyCode::Down | KeyCode::Char('j') if self.mode == ViewMode::CompilerOutput => {
                self.scroll = (self.scroll + 1).min(self.compiler.len().saturating_sub(1));
                KeyAction::Redraw
            }
            _ => KeyAction::Ignored,
        }
    }

    pub fn phase(&self) -> Option<BuildPhase> {
        self.phase
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Build log lines, oldest first.
    pub fn log_lines(&self) -> impl Iterator<Item = &(String, bool)> {
        self.log.iter()
    }

    /// Compiler output received so far.
    pub fn compiler_log(&self) -> &DiagnosticLog {
        &self.compiler
    }

    /// Replace the key help line.
    pub fn set_footer(&mut self, footer: impl Into<String>) {
        self.footer = Some(footer.into());
    }

    /// Completed share of the build, 0 to 100.
    pub fn percent(&self) -> u16 {
        if self.total == 0 {
            return 0;
        }
        (100 * self.completed.min(self.total) / self.total) as u16
    }

    pub fn render(&self, frame: &mut Frame) {
        let [body, footer] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());
        let column = centered_column(body, SCREEN_WIDTH);
        let [title, _, progress, panel] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(5),
            Constraint::Min(3),
        ])
        .areas(column);

        let heading = if self.debug { "NOTEWORTHY BUILD SYSTEM [DEBUG]" } else { "NOTEWORTHY BUILD SYSTEM" };
        frame.render_widget(
            Paragraph::new(Line::from(heading).centered())
                .style(Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            title,
        );

        self.render_progress(frame, progress);
        match self.mode {
            ViewMode::BuildLog => self.render_log(frame, panel),
            ViewMode::CompilerOutput => self.render_compiler_output(frame, panel),
        }

        let help = self.footer.as_deref().unwrap_or(BUILD_FOOTER);
        frame.render_widget(
            Paragraph::new(Line::from(help).centered()).style(Style::new().fg(Color::DarkGray)),
            footer,
        );
    }

    fn render_progress(&self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().title(" Progress ");
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let [phase, task, gauge] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)]).areas(inner);

        let count = if self.total > 0 { format!("({}/{})", self.completed, self.total) } else { String::new() };
        let [phase_label, phase_count] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(count.chars().count() as u16)]).areas(phase);
        if let Some(current) = self.phase {
            frame.render_widget(
                Paragraph::new(current.to_string()).style(Style::new().fg(Color::Magenta)),
                phase_label,
            );
        }
        frame.render_widget(Paragraph::new(count).style(Style::new().fg(Color::DarkGray)), phase_count);
        if !self.task.is_empty() {
            frame.render_widget(Paragraph::new(format!("→ {}", self.task)), task);
        }
        if self.total > 0 {
            frame.render_widget(
                Gauge::default()
                    .gauge_style(Style::new().fg(Color::Yellow))
                    .percent(self.percent())
                    .label(format!("{:3}%", self.percent())),
                gauge,
            );
        }
    }

    fn render_log(&self, frame: &mut Frame, area: Rect) {
        let title = if self.compiler.has_warnings() { " Build Log (typst warnings: v) " } else { " Build Log " };
        let block = Block::bordered().title(title);
        let visible = block.inner(area).height as usize;
        let skip = self.log.len().saturating_sub(visible);
        let lines: Vec<Line> = self
            .log
            .iter()
            .skip(skip)
            .map(|(message, ok)| {
                if *ok {
                    Line::from(vec![
                        Span::styled("✓ ", Style::new().fg(Color::Green)),
                        Span::styled(message.as_str(), Style::new().fg(Color::Green)),
                    ])
                } else {
                    Line::from(format!("  {}", message))
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_compiler_output(&self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().title(" Typst Output (↑↓ scroll) ");
        let visible = block.inner(area).height as usize;
        let lines: Vec<Line> = if self.compiler.is_empty() {
            vec![Line::styled("(no output yet)", Style::new().fg(Color::DarkGray))]
        } else {
            self.compiler
                .lines()
                .skip(self.scroll)
                .take(visible)
                .map(|(kind, text)| Line::styled(text.as_str(), line_style(*kind)))
                .collect()
        };
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

fn line_style(kind: LineKind) -> Style {
    match kind {
        LineKind::Error => Style::new().fg(Color::Red),
        LineKind::Warning => Style::new().fg(Color::Yellow),
        LineKind::Hint => Style::new().fg(Color::Cyan),
        LineKind::Plain => Style::new(),
    }
}

fn centered_column(area: Rect, width: u16) -> Rect {
    let [_, column, _] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(width.min(area.width)), Constraint::Fill(1)])
            .areas(area);
    column
}

struct TerminalState {
    view: BuildView,
    terminal: Option<DefaultTerminal>,
}

impl TerminalState {
    fn draw(&mut self) {
        let TerminalState { view, terminal } = self;
        if let Some(terminal) = terminal {
            if let Err(e) = terminal.draw(|frame| view.render(frame)) {
                debug!("Failed to draw build screen: {}", e);
            }
        }
    }
}

/// Progress reporter drawing the build screen on the terminal.
///
/// Takes over the terminal on [`TerminalProgress::start`] and gives it back
/// on [`TerminalProgress::finish`] or drop.
pub struct TerminalProgress {
    state: Mutex<TerminalState>,
}

impl std::fmt::Debug for TerminalProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalProgress").finish_non_exhaustive()
    }
}

impl TerminalProgress {
    /// Enter the alternate screen and draw the empty build screen.
    pub fn start(debug: bool) -> io::Result<Self> {
        let terminal = ratatui::try_init()?;
        let progress = Self {
            state: Mutex::new(TerminalState { view: BuildView::new(debug), terminal: Some(terminal) }),
        };
        if let Ok(mut state) = progress.state.lock() {
            state.draw();
        }
        Ok(progress)
    }

    /// Show `prompt` in the footer and block until a key is pressed.
    pub fn wait_for_key(&self, prompt: &str) -> io::Result<()> {
        if let Ok(mut state) = self.state.lock() {
            state.view.set_footer(prompt);
            state.draw();
        }
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(());
                }
            }
        }
    }

    /// Restore the terminal and return the final screen state.
    pub fn finish(&self) -> BuildView {
        match self.state.lock() {
            Ok(mut state) => {
                if state.terminal.take().is_some() {
                    ratatui::restore();
                }
                state.view.clone()
            }
            Err(_) => BuildView::new(false),
        }
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        if let Ok(state) = self.state.get_mut() {
            if state.terminal.take().is_some() {
                ratatui::restore();
            }
        }
    }
}

impl ProgressReporter for TerminalProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            state.view.apply(&event);
            state.draw();
        }
    }

    fn poll(&self) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return true;
        };
        let mut redraw = false;
        while let Ok(true) = event::poll(Duration::ZERO) {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    redraw |= state.view.handle_key(key) != KeyAction::Ignored;
                }
                Ok(Event::Resize(..)) => redraw = true,
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read terminal event: {}", e);
                    break;
                }
            }
        }
        if redraw {
            state.draw();
        }
        !state.view.is_cancelled()
    }
}

/// One line of the page selection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Chapter { index: usize },
    Page { chapter: usize, page: usize },
}

/// How much of a chapter is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterCheck {
    All,
    Partial,
    None,
}

/// Result of a key press on the selection menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Continue,
    Build,
    Back,
}

/// Text entry open on the selection menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagPrompt {
    /// Flags or a preset number
    Flags(String),
    /// Directory for the `--font-path` preset
    FontPath(String),
}

impl FlagPrompt {
    fn buffer(&mut self) -> &mut String {
        match self {
            FlagPrompt::Flags(text) | FlagPrompt::FontPath(text) => text,
        }
    }
}

/// Page selection screen shown before an interactive build.
#[derive(Debug, Clone)]
pub struct SelectionMenu<'a> {
    hierarchy: &'a Hierarchy,
    content: &'a ContentLayout,
    rows: Vec<Row>,
    cursor: usize,
    selection: Selection,
    options: BuildOptions,
    message: Option<String>,
    prompt: Option<FlagPrompt>,
}

impl<'a> SelectionMenu<'a> {
    pub fn new(
        hierarchy: &'a Hierarchy,
        content: &'a ContentLayout,
        selection: Selection,
        options: BuildOptions,
    ) -> Self {
        let mut rows = Vec::new();
        for (ci, chapter) in hierarchy.chapters().iter().enumerate() {
            rows.push(Row::Chapter { index: ci });
            rows.extend((0..chapter.pages.len()).map(|pi| Row::Page { chapter: ci, page: pi }));
        }
        Self { hierarchy, content, rows, cursor: 0, selection, options, message: None, prompt: None }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn prompt(&self) -> Option<&FlagPrompt> {
        self.prompt.as_ref()
    }

    /// Consume the menu, yielding the chosen pages and options.
    pub fn into_choice(self) -> (Selection, BuildOptions) {
        (self.selection, self.options)
    }

    pub fn chapter_check(&self, chapter: usize) -> ChapterCheck {
        let total = self.hierarchy.chapter(chapter).map_or(0, |c| c.pages.len());
        let selected = self.selection.pages_of(chapter).len();
        if total > 0 && selected == total {
            ChapterCheck::All
        } else if selected > 0 {
            ChapterCheck::Partial
        } else {
            ChapterCheck::None
        }
    }

    /// Toggle the row under the cursor; a chapter row toggles all its pages.
    pub fn toggle_current(&mut self) {
        match self.rows.get(self.cursor).copied() {
            Some(Row::Chapter { index }) => {
                let pages = self.hierarchy.chapter(index).map_or(0, |c| c.pages.len());
                let select = self.chapter_check(index) != ChapterCheck::All;
                for pi in 0..pages {
                    if select {
                        self.selection.insert(index, pi);
                    } else {
                        self.selection.remove(index, pi);
                    }
                }
            }
            Some(Row::Page { chapter, page }) => {
                if self.selection.contains(chapter, page) {
                    self.selection.remove(chapter, page);
                } else {
                    self.selection.insert(chapter, page);
                }
            }
            None => {}
        }
    }

    /// Keys while the typst flag prompt is open. An empty entry keeps the
    /// current flags.
    fn handle_prompt_key(&mut self, mut prompt: FlagPrompt, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Backspace => {
                prompt.buffer().pop();
            }
            KeyCode::Char(c) => prompt.buffer().push(c),
            KeyCode::Enter => {
                match prompt {
                    FlagPrompt::Flags(text) => match text.trim() {
                        "" => {}
                        "1" => {
                            self.prompt = Some(FlagPrompt::FontPath(String::new()));
                            return;
                        }
                        "2" => self.options.typst_flags = vec!["--ppi".to_string(), "144".to_string()],
                        "3" => self.options.typst_flags.clear(),
                        flags => self.options.typst_flags = flags.split_whitespace().map(String::from).collect(),
                    },
                    FlagPrompt::FontPath(path) => {
                        let path = path.trim();
                        if !path.is_empty() {
                            self.options.typst_flags = vec!["--font-path".to_string(), path.to_string()];
                        }
                    }
                }
                return;
            }
            _ => {}
        }
        self.prompt = Some(prompt);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> MenuAction {
        self.message = None;
        if let Some(prompt) = self.prompt.take() {
            self.handle_prompt_key(prompt, key);
            return MenuAction::Continue;
        }
        match key.code {
            KeyCode::Esc => return MenuAction::Back,
            KeyCode::Enter => {
                if self.selection.is_empty() {
                    self.message = Some("Select at least one page".to_string());
                } else {
                    return MenuAction::Build;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = (self.cursor + 1).min(self.rows.len().saturating_sub(1));
            }
            KeyCode::Char(' ') => self.toggle_current(),
            KeyCode::Char('a') => self.selection = Selection::all(self.hierarchy),
            KeyCode::Char('n') => self.selection = Selection::new(),
            KeyCode::Char('d') => self.options.debug = !self.options.debug,
            KeyCode::Char('f') => self.options.frontmatter = !self.options.frontmatter,
            KeyCode::Char('l') => self.options.leave_individual = !self.options.leave_individual,
            KeyCode::Char('c') => self.prompt = Some(FlagPrompt::Flags(String::new())),
            _ => {}
        }
        MenuAction::Continue
    }

    fn row_line(&self, row: Row) -> Line<'static> {
        match row {
            Row::Chapter { index } => {
                let (mark, color) = match self.chapter_check(index) {
                    ChapterCheck::All => ("[✓]", Color::Green),
                    ChapterCheck::Partial => ("[~]", Color::Yellow),
                    ChapterCheck::None => ("[ ]", Color::Gray),
                };
                let folder = self.content.chapter_folders.get(index).cloned().unwrap_or_else(|| index.to_string());
                let title = self.hierarchy.chapter(index).map(|c| c.title.as_str()).unwrap_or_default();
                Line::from(vec![
                    Span::styled(mark, Style::new().fg(color)),
                    Span::styled(format!(" Ch {}: {}", folder, title), Style::new().fg(Color::Cyan)),
                ])
            }
            Row::Page { chapter, page } => {
                let selected = self.selection.contains(chapter, page);
                let mark = if selected { "[✓]" } else { "[ ]" };
                let folder = self
                    .content
                    .page_folders
                    .get(&chapter)
                    .and_then(|pages| pages.get(page))
                    .cloned()
                    .unwrap_or_else(|| page.to_string());
                let title = self.hierarchy.page(chapter, page).map(|p| p.title.as_str()).unwrap_or_default();
                Line::from(vec![
                    Span::raw("  "),
                    Span::styled(mark, Style::new().fg(if selected { Color::Green } else { Color::Gray })),
                    Span::raw(format!(" {}: {}", folder, title)),
                ])
            }
        }
    }

    fn option_line(label: &str, on: bool, key: char) -> Line<'static> {
        Line::from(vec![
            Span::raw(format!("{:14}", label)),
            Span::styled(
                if on { "[ON] " } else { "[OFF]" },
                Style::new().fg(if on { Color::Green } else { Color::Red }).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" ({})", key), Style::new().fg(Color::DarkGray)),
        ])
    }

    pub fn render(&self, frame: &mut Frame) {
        let [body, status, footer] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)]).areas(frame.area());
        let column = centered_column(body, SCREEN_WIDTH);
        let [options, list] = Layout::vertical([Constraint::Length(6), Constraint::Min(3)]).areas(column);

        let flags = if self.options.typst_flags.is_empty() {
            "(none)".to_string()
        } else {
            self.options.typst_flags.join(" ")
        };
        let flags_line = match &self.prompt {
            Some(FlagPrompt::Flags(text)) => Line::from(vec![
                Span::raw(format!("{:14}", "Typst Flags:")),
                Span::styled(format!("{}_", text), Style::new().fg(Color::Yellow)),
            ]),
            Some(FlagPrompt::FontPath(text)) => Line::from(vec![
                Span::raw(format!("{:14}", "Font path:")),
                Span::styled(format!("{}_", text), Style::new().fg(Color::Yellow)),
            ]),
            None => Line::from(vec![
                Span::raw(format!("{:14}", "Typst Flags:")),
                Span::raw(flags),
                Span::styled(" (c)", Style::new().fg(Color::DarkGray)),
            ]),
        };
        let option_lines = vec![
            Self::option_line("Debug Mode:", self.options.debug, 'd'),
            Self::option_line("Frontmatter:", self.options.frontmatter, 'f'),
            Self::option_line("Leave PDFs:", self.options.leave_individual, 'l'),
            flags_line,
        ];
        frame.render_widget(Paragraph::new(option_lines).block(Block::bordered().title(" Options ")), options);

        let items: Vec<ListItem> = self.rows.iter().map(|&row| ListItem::new(self.row_line(row))).collect();
        let list_widget = List::new(items)
            .block(Block::bordered().title(" Select Chapters "))
            .highlight_symbol("▶ ")
            .highlight_style(Style::new().add_modifier(Modifier::BOLD));
        let mut state = ListState::default().with_selected(Some(self.cursor));
        frame.render_stateful_widget(list_widget, list, &mut state);

        if let Some(message) = &self.message {
            frame.render_widget(
                Paragraph::new(Line::from(message.as_str()).centered()).style(Style::new().fg(Color::Red)),
                status,
            );
        }
        frame.render_widget(
            Paragraph::new(Line::from(if self.prompt.is_some() { FLAGS_FOOTER } else { MENU_FOOTER }).centered())
                .style(Style::new().fg(Color::DarkGray)),
            footer,
        );
    }
}

/// Run the selection menu on the terminal; `true` means start the build.
pub fn run_selection_menu(menu: &mut SelectionMenu<'_>) -> io::Result<bool> {
    let mut terminal = ratatui::try_init()?;
    let result = menu_loop(&mut terminal, menu);
    ratatui::restore();
    result
}

fn menu_loop(terminal: &mut DefaultTerminal, menu: &mut SelectionMenu<'_>) -> io::Result<bool> {
    loop {
        terminal.draw(|frame| menu.render(frame))?;
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match menu.handle_key(key) {
                MenuAction::Build => return Ok(true),
                MenuAction::Back => return Ok(false),
                MenuAction::Continue => {}
            }
        }
    }
}

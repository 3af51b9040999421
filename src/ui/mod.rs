//! Terminal user interface.

pub mod tui;

pub use tui::{
    run_selection_menu, BuildView, ChapterCheck, FlagPrompt, KeyAction, MenuAction, Row, SelectionMenu,
    TerminalProgress, ViewMode, LOG_LINE_LIMIT,
};

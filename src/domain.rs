use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::view::PageSize;

#[derive(Debug, Error)]
pub enum TabvError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("unknown file type: {}", .0.display())]
    UnknownFileType(PathBuf),
    #[error("bad argument: {0}")]
    BadArgument(String),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TabvConfig {
    /// Milliseconds to wait for a terminal event per loop turn.
    pub event_poll_time: u64,
    /// Rendered column width cap, in characters.
    pub max_column_width: usize,
    /// Page size new tabs start with.
    pub page_size: PageSize,
}

impl Default for TabvConfig {
    fn default() -> Self {
        TabvConfig {
            event_poll_time: 100,
            max_column_width: 40,
            page_size: PageSize::Rows(25),
        }
    }
}

/// What the command line at the bottom is currently reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdMode {
    Search,
    FilterColumn,
    GoToPage,
    PageSize,
    ExportPath,
}

impl CmdMode {
    pub fn prompt(self) -> &'static str {
        match self {
            CmdMode::Search => "search: ",
            CmdMode::FilterColumn => "filter column: ",
            CmdMode::GoToPage => "go to page: ",
            CmdMode::PageSize => "page size: ",
            CmdMode::ExportPath => "export to: ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Quit,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    NextTab,
    PrevTab,
    Search,
    FilterColumn,
    ClearFilters,
    SortColumn,
    GoToPage,
    PageSize,
    Export,
    CopyCell,
    CopyRow,
    MoveColumnLeft,
    MoveColumnRight,
}

pub const HELP_TEXT: &str = "\
tabv keys

  arrows / hjkl     move the cell cursor
  PgDn PgUp n p     next / previous page
  Home End          first / last page
  g                 go to page ...
  z                 page size (rows or \"all\")
  /                 search all columns
  f                 filter the cursor column
  c                 clear search and filters
  s                 sort by the cursor column (again to flip)
  < >               move the cursor column left / right
  Tab S-Tab         next / previous tab
  y Y               copy cell / row (CSV) to the clipboard
  e                 export the view as CSV to a file
  ?                 this help
  Esc               close / cancel
  q                 quit";

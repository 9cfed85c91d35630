use arboard::Clipboard;
use tracing::{debug, trace, warn};

use crate::domain::{CmdMode, HELP_TEXT, Message, TabvConfig};
use crate::export;
use crate::inputter::{InputResult, Inputter};
use crate::session::{Action, Session};
use crate::ui::{COLUMN_WIDTH_MARGIN, MIN_COLUMN_WIDTH};
use crate::view::{PageSize, SortOrder};

#[derive(Debug, PartialEq, Eq)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy)]
enum Modus {
    Table,
    Popup,
    CmdInput,
}

/// Pagination numbers of the rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub page: usize,
    pub total_pages: usize,
    pub filtered: usize,
    pub total: usize,
    pub page_size: PageSize,
}

impl PageMeta {
    fn empty() -> Self {
        PageMeta {
            page: 1,
            total_pages: 1,
            filtered: 0,
            total: 0,
            page_size: PageSize::All,
        }
    }

    pub fn label(&self) -> String {
        if self.filtered == self.total {
            format!("page {}/{}  {} rows", self.page, self.total_pages, self.total)
        } else {
            format!(
                "page {}/{}  {} of {} rows",
                self.page, self.total_pages, self.filtered, self.total
            )
        }
    }
}

/// One rendered column header.
#[derive(Debug, Clone)]
pub struct UiColumn {
    pub label: String,
    pub width: usize,
    pub sorted: Option<SortOrder>,
    pub filtered: bool,
}

/// Everything the UI layer needs for one frame. Rebuilt by the model after
/// every state mutation; rendering never reaches back into the session.
pub struct UiData {
    pub title: String,
    pub columns: Vec<UiColumn>,
    pub rows: Vec<Vec<String>>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub meta: PageMeta,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CmdMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UiData {
    pub fn empty() -> Self {
        UiData {
            title: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            meta: PageMeta::empty(),
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

pub struct Model {
    config: TabvConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    session: Session,
    cursor_row: usize,
    cursor_column: usize,
    offset_column: usize,
    width: usize,
    height: usize,
    uidata: UiData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CmdMode>,
    status_message: String,
}

impl Model {
    pub fn init(config: &TabvConfig, session: Session, width: usize, height: usize) -> Self {
        let clipboard = match Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                warn!("clipboard unavailable: {e}");
                None
            }
        };
        let mut model = Model {
            config: config.clone(),
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            session,
            cursor_row: 0,
            cursor_column: 0,
            offset_column: 0,
            width,
            height,
            uidata: UiData::empty(),
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            status_message: String::new(),
        };
        model.status_message = match model.session.len() {
            0 => "no data loaded".to_string(),
            1 => "loaded 1 table".to_string(),
            n => format!("loaded {n} tables"),
        };
        model.refresh();
        model
    }

    pub fn get_uidata(&self) -> &UiData {
        &self.uidata
    }

    /// While the command line is open every key goes to the line editor.
    pub fn raw_keyevents(&self) -> bool {
        matches!(self.modus, Modus::CmdInput)
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    pub fn update(&mut self, message: Message) {
        trace!("update: {:?} in {:?}", message, self.modus);
        match self.modus {
            Modus::Table => self.update_table(message),
            Modus::Popup => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.close_popup(),
                Message::Resize(w, h) => self.resize(w, h),
                _ => {}
            },
            Modus::CmdInput => match message {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(w, h) => self.resize(w, h),
                _ => {}
            },
        }
    }

    fn update_table(&mut self, message: Message) {
        match message {
            Message::Quit => self.quit(),
            Message::Help => self.show_help(),
            Message::Exit => self.set_status_message(""),
            Message::Resize(w, h) => self.resize(w, h),
            Message::MoveUp => self.move_cursor_row(-1),
            Message::MoveDown => self.move_cursor_row(1),
            Message::MoveLeft => self.move_cursor_column(-1),
            Message::MoveRight => self.move_cursor_column(1),
            Message::NextPage => self.go_to_page(self.uidata.meta.page + 1),
            Message::PrevPage => self.go_to_page(self.uidata.meta.page.saturating_sub(1)),
            Message::FirstPage => self.go_to_page(1),
            Message::LastPage => self.go_to_page(self.uidata.meta.total_pages),
            Message::NextTab => self.switch_tab(true),
            Message::PrevTab => self.switch_tab(false),
            Message::Search => self.enter_cmd_mode(CmdMode::Search),
            Message::FilterColumn => self.enter_cmd_mode(CmdMode::FilterColumn),
            Message::GoToPage => self.enter_cmd_mode(CmdMode::GoToPage),
            Message::PageSize => self.enter_cmd_mode(CmdMode::PageSize),
            Message::Export => self.enter_cmd_mode(CmdMode::ExportPath),
            Message::ClearFilters => {
                self.session.apply(Action::ClearFilters);
                self.refresh();
                self.set_status_message("cleared search and filters");
            }
            Message::SortColumn => self.sort_cursor_column(),
            Message::CopyCell => self.copy_cell(),
            Message::CopyRow => self.copy_row(),
            Message::MoveColumnLeft => self.move_column(false),
            Message::MoveColumnRight => self.move_column(true),
            Message::RawKey(_) => {}
        }
    }

    // ------------------------- table handling -------------------------- //

    fn go_to_page(&mut self, page: usize) {
        self.session.apply(Action::GoToPage(page.max(1)));
        self.cursor_row = 0;
        self.refresh();
    }

    fn switch_tab(&mut self, forward: bool) {
        if forward {
            self.session.next_tab();
        } else {
            self.session.prev_tab();
        }
        self.cursor_row = 0;
        self.cursor_column = 0;
        self.offset_column = 0;
        self.refresh();
        let name = self.session.active_name().map(str::to_string);
        if let Some(name) = name {
            self.set_status_message(format!("tab {name}"));
        }
    }

    fn move_cursor_row(&mut self, step: isize) {
        let rows = self.uidata.rows.len();
        if rows == 0 {
            return;
        }
        self.cursor_row = if step < 0 {
            self.cursor_row.saturating_sub(step.unsigned_abs())
        } else {
            (self.cursor_row + step as usize).min(rows - 1)
        };
        self.refresh();
    }

    fn move_cursor_column(&mut self, step: isize) {
        let ncols = self
            .session
            .active_tab()
            .map(|tab| tab.table.columns().len())
            .unwrap_or(0);
        if ncols == 0 {
            return;
        }
        self.cursor_column = if step < 0 {
            self.cursor_column.saturating_sub(step.unsigned_abs())
        } else {
            (self.cursor_column + step as usize).min(ncols - 1)
        };
        self.refresh();
    }

    fn cursor_column_name(&self) -> Option<String> {
        let tab = self.session.active_tab()?;
        tab.table
            .columns()
            .get(self.cursor_column)
            .map(|c| c.name.clone())
    }

    fn sort_cursor_column(&mut self) {
        let Some(column) = self.cursor_column_name() else {
            return;
        };
        self.session.apply(Action::SortBy(column.clone()));
        self.refresh();
        let order = self
            .session
            .active_tab()
            .and_then(|tab| tab.state.sort())
            .map(|sort| sort.order);
        let message = match order {
            Some(SortOrder::Ascending) => format!("sorted by {column}, ascending"),
            Some(SortOrder::Descending) => format!("sorted by {column}, descending"),
            None => String::new(),
        };
        self.set_status_message(message);
    }

    fn move_column(&mut self, right: bool) {
        let Some(tab) = self.session.active_tab_mut() else {
            return;
        };
        let moved = if right {
            tab.table.move_column_right(self.cursor_column)
        } else {
            tab.table.move_column_left(self.cursor_column)
        };
        if moved {
            self.cursor_column = if right {
                self.cursor_column + 1
            } else {
                self.cursor_column - 1
            };
            self.refresh();
        }
    }

    fn copy_cell(&mut self) {
        let Some(tab) = self.session.active_tab() else {
            return;
        };
        let view = tab.view();
        let Some(&row) = view.rows.get(self.cursor_row) else {
            return;
        };
        let Some(column) = tab.table.columns().get(self.cursor_column) else {
            return;
        };
        let cell = column.cell(row).to_string();
        self.copy_to_clipboard(cell, "copied cell");
    }

    fn copy_row(&mut self) {
        let Some(tab) = self.session.active_tab() else {
            return;
        };
        let view = tab.view();
        let Some(&row) = view.rows.get(self.cursor_row) else {
            return;
        };
        let fields: Vec<&str> = tab.table.columns().iter().map(|c| c.cell(row)).collect();
        let line = export::csv_line(fields);
        self.copy_to_clipboard(line, "copied row");
    }

    fn copy_to_clipboard(&mut self, text: String, ok_message: &str) {
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text),
            None => {
                self.set_status_message("clipboard unavailable");
                return;
            }
        };
        match result {
            Ok(()) => self.set_status_message(ok_message),
            Err(e) => {
                warn!("clipboard write failed: {e}");
                self.set_status_message("clipboard write failed");
            }
        }
    }

    // ------------------------ popup and cmdline ------------------------ //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn close_popup(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::Popup;
        self.uidata.show_popup = false;
    }

    fn enter_cmd_mode(&mut self, mode: CmdMode) {
        trace!("entering command mode {mode:?}");
        self.previous_modus = self.modus;
        self.modus = Modus::CmdInput;
        self.cmd_mode = Some(mode);
        self.input.clear();
        self.uidata.cmdinput = self.input.get();
        self.uidata.cmd_mode = self.cmd_mode;
        self.uidata.active_cmdinput = true;
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        let result = self.input.read(key);
        if result.finished {
            self.leave_cmd_mode();
            if !result.canceled {
                self.handle_cmd_input(&result.input);
            }
        }
        self.uidata.cmdinput = self.input.get();
        self.uidata.cmd_mode = self.cmd_mode;
        self.uidata.active_cmdinput = matches!(self.modus, Modus::CmdInput);
    }

    fn leave_cmd_mode(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CmdInput;
    }

    fn handle_cmd_input(&mut self, input: &str) {
        debug!("command input {:?} for {:?}", input, self.cmd_mode);
        match self.cmd_mode.take() {
            Some(CmdMode::Search) => {
                self.session.apply(Action::SetSearch(input.to_string()));
                self.cursor_row = 0;
                self.refresh();
                let message = format!("{} rows match", self.uidata.meta.filtered);
                self.set_status_message(message);
            }
            Some(CmdMode::FilterColumn) => self.filter_cursor_column(input),
            Some(CmdMode::GoToPage) => match input.trim().parse::<usize>() {
                Ok(page) => self.go_to_page(page),
                Err(_) => self.set_status_message(format!("not a page number: {input:?}")),
            },
            Some(CmdMode::PageSize) => match input.parse::<PageSize>() {
                Ok(size) => {
                    self.session.apply(Action::SetPageSize(size));
                    self.cursor_row = 0;
                    self.refresh();
                    self.set_status_message(format!("page size {size}"));
                }
                Err(e) => self.set_status_message(e),
            },
            Some(CmdMode::ExportPath) => self.export_view(input),
            None => {}
        }
    }

    fn filter_cursor_column(&mut self, needle: &str) {
        let Some(column) = self.cursor_column_name() else {
            return;
        };
        self.session.apply(Action::SetColumnFilter {
            column: column.clone(),
            value: needle.to_string(),
        });
        self.cursor_row = 0;
        self.refresh();
        let message = if needle.is_empty() {
            format!("cleared filter on {column}")
        } else {
            format!("{} rows match", self.uidata.meta.filtered)
        };
        self.set_status_message(message);
    }

    fn export_view(&mut self, raw_path: &str) {
        if raw_path.trim().is_empty() {
            self.set_status_message("export canceled: empty path");
            return;
        }
        let path = match shellexpand::full(raw_path.trim()) {
            Ok(expanded) => std::path::PathBuf::from(expanded.as_ref()),
            Err(e) => {
                self.set_status_message(format!("bad path: {e}"));
                return;
            }
        };
        let Some(tab) = self.session.active_tab() else {
            return;
        };
        let message = match export::export_csv_file(&tab.table, &tab.state, &path) {
            Ok(()) => format!("exported to {}", path.display()),
            Err(e) => format!("export failed: {e}"),
        };
        self.set_status_message(message);
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    fn resize(&mut self, width: usize, height: usize) {
        trace!(
            "resize w:{}->{width}, h:{}->{height}",
            self.width, self.height
        );
        self.width = width;
        self.height = height;
        self.refresh();
    }

    // ----------------------------- uidata ------------------------------ //

    fn render_width(&self, label: &str, max_width: usize) -> usize {
        let width = label.chars().count().max(max_width) + COLUMN_WIDTH_MARGIN;
        width.clamp(MIN_COLUMN_WIDTH, self.config.max_column_width)
    }

    /// Rebuild the UI snapshot from the session. Called after every
    /// mutation; the render loop only ever reads the snapshot.
    fn refresh(&mut self) {
        let Some(tab) = self.session.active_tab() else {
            self.uidata = UiData::empty();
            self.uidata.status_message = self.status_message.clone();
            return;
        };
        let view = tab.view();
        let ncols = tab.table.columns().len();

        let cursor_row = self.cursor_row.min(view.rows.len().saturating_sub(1));
        let cursor_column = self.cursor_column.min(ncols.saturating_sub(1));

        let widths: Vec<usize> = tab
            .table
            .columns()
            .iter()
            .map(|c| self.render_width(&c.label, c.max_width()))
            .collect();

        // Keep the cursor column inside the visible window, then take as
        // many columns as fit the terminal width.
        let table_width = self.width.saturating_sub(1);
        let mut offset = self.offset_column.min(cursor_column);
        loop {
            let mut used = 0;
            let mut fits = false;
            for idx in offset..ncols {
                used += widths[idx] + 1;
                if used > table_width {
                    break;
                }
                if idx == cursor_column {
                    fits = true;
                }
            }
            if fits || offset >= cursor_column || offset + 1 >= ncols {
                break;
            }
            offset += 1;
        }
        let mut visible: Vec<usize> = Vec::new();
        let mut used = 0;
        for idx in offset..ncols {
            used += widths[idx] + 1;
            if used > table_width && !visible.is_empty() {
                break;
            }
            visible.push(idx);
        }

        let columns: Vec<UiColumn> = visible
            .iter()
            .map(|&idx| {
                let column = &tab.table.columns()[idx];
                UiColumn {
                    label: column.label.clone(),
                    width: widths[idx],
                    sorted: tab
                        .state
                        .sort()
                        .filter(|sort| sort.column == column.name)
                        .map(|sort| sort.order),
                    filtered: tab.state.filter_for(&column.name).is_some(),
                }
            })
            .collect();

        let rows: Vec<Vec<String>> = view
            .rows
            .iter()
            .map(|&row| {
                visible
                    .iter()
                    .map(|&idx| sanitize_cell(tab.table.columns()[idx].cell(row)))
                    .collect()
            })
            .collect();

        let meta = PageMeta {
            page: view.page,
            total_pages: view.total_pages,
            filtered: view.filtered,
            total: tab.table.nrows(),
            page_size: tab.state.page_size(),
        };
        let title = format!(
            "{} [{}/{}]",
            self.session.active_name().unwrap_or("?"),
            self.session.active_index() + 1,
            self.session.len()
        );

        self.cursor_row = cursor_row;
        self.cursor_column = cursor_column;
        self.offset_column = offset;
        let show_popup = self.uidata.show_popup;
        let popup_message = std::mem::take(&mut self.uidata.popup_message);
        self.uidata = UiData {
            title,
            columns,
            rows,
            selected_row: cursor_row,
            selected_column: cursor_column.saturating_sub(offset),
            meta,
            show_popup,
            popup_message,
            cmdinput: self.input.get(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: matches!(self.modus, Modus::CmdInput),
            status_message: self.status_message.clone(),
        };
    }
}

/// Cells are stored verbatim; line breaks only get flattened for display.
fn sanitize_cell(cell: &str) -> String {
    if cell.contains('\n') {
        cell.replace("\r\n", " ↵ ").replace('\n', " ↵ ")
    } else {
        cell.to_string()
    }
}

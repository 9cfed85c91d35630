use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState},
};

use crate::model::{Model, UiColumn, UiData};

pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGHT: usize = 2;
pub const COLUMN_WIDTH_MARGIN: usize = 2;
pub const MIN_COLUMN_WIDTH: usize = 4;

#[derive(Default)]
pub struct TableUi;

impl TableUi {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [table_area, status_area, cmd_area] = Layout::vertical([
            Constraint::Min(TABLE_HEADER_HEIGHT as u16 + 1),
            Constraint::Length(1),
            Constraint::Length((CMDLINE_HEIGHT - 1) as u16),
        ])
        .areas(frame.area());

        self.draw_table(uidata, frame, table_area);
        self.draw_status(uidata, frame, status_area);
        self.draw_cmdline(uidata, frame, cmd_area);

        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_table(&self, uidata: &UiData, frame: &mut Frame, area: Rect) {
        let header = Row::new(
            uidata
                .columns
                .iter()
                .enumerate()
                .map(|(idx, column)| header_cell(column, idx == uidata.selected_column)),
        )
        .height(TABLE_HEADER_HEIGHT as u16);

        let rows = uidata.rows.iter().map(|cells| {
            Row::new(cells.iter().map(|cell| Cell::from(cell.as_str())))
        });
        let widths: Vec<Constraint> = uidata
            .columns
            .iter()
            .map(|c| Constraint::Length(c.width as u16))
            .collect();

        let table = Table::new(rows, widths)
            .header(header.style(Style::new().add_modifier(Modifier::BOLD)))
            .column_spacing(1)
            .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED));

        let mut state = TableState::default();
        if !uidata.rows.is_empty() {
            state.select(Some(uidata.selected_row));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_status(&self, uidata: &UiData, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::from(uidata.title.clone()).bold(),
            Span::from("  "),
            Span::from(uidata.meta.label()),
        ];
        let marks: Vec<String> = uidata
            .columns
            .iter()
            .filter_map(|column| {
                column
                    .sorted
                    .map(|order| format!("{} {}", column.label, order.arrow()))
            })
            .collect();
        if !marks.is_empty() {
            spans.push(Span::from("  sort: ").dim());
            spans.push(Span::from(marks.join(", ")));
        }
        let line = Line::from(spans).style(Style::new().bg(Color::DarkGray).fg(Color::White));
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_cmdline(&self, uidata: &UiData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = uidata.cmd_mode.map(|m| m.prompt()).unwrap_or("> ");
            let line = Line::from(vec![
                Span::from(prompt).bold(),
                Span::from(uidata.cmdinput.input.clone()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.chars().count() + uidata.cmdinput.cursor) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
        } else {
            let line = Line::from(uidata.status_message.clone()).dim();
            frame.render_widget(Paragraph::new(line), area);
        }
    }

    fn draw_popup(&self, uidata: &UiData, frame: &mut Frame) {
        let area = centered_rect(60, 80, frame.area());
        frame.render_widget(Clear, area);
        let block = Block::bordered().title(Line::from(" help ").centered());
        frame.render_widget(
            Paragraph::new(uidata.popup_message.as_str()).block(block),
            area,
        );
    }
}

fn header_cell(column: &UiColumn, selected: bool) -> Cell<'_> {
    let mut label = column.label.clone();
    if let Some(order) = column.sorted {
        label.push(' ');
        label.push_str(order.arrow());
    }
    if column.filtered {
        label.push_str(" *");
    }
    let mut style = Style::new();
    if selected {
        style = style.add_modifier(Modifier::UNDERLINED | Modifier::REVERSED);
    }
    Cell::from(label).style(style)
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let [_, mid, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(r);
    let [_, mid, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(mid);
    mid
}

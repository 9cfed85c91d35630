use indexmap::IndexMap;
use tracing::debug;

use crate::data::Table;
use crate::view::{PageSize, SortOrder, ViewPage, ViewState, compute_view};

/// One loaded table with its own view parameters. Tabs never share state.
#[derive(Debug, Clone)]
pub struct Tab {
    pub table: Table,
    pub state: ViewState,
}

impl Tab {
    pub fn new(table: Table, page_size: PageSize) -> Self {
        Tab {
            state: ViewState::new(page_size),
            table,
        }
    }

    pub fn view(&self) -> ViewPage {
        compute_view(&self.table, &self.state)
    }
}

/// A view-state mutation, decoupled from any input source: the TUI maps
/// keystrokes to actions, the CLI maps flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetSearch(String),
    SetColumnFilter { column: String, value: String },
    SortBy(String),
    SetSort { column: String, order: SortOrder },
    GoToPage(usize),
    SetPageSize(PageSize),
    ClearFilters,
}

/// All open tabs, keyed by a unique display name, plus which one is active.
pub struct Session {
    tabs: IndexMap<String, Tab>,
    active: usize,
    default_page_size: PageSize,
}

impl Session {
    pub fn new(default_page_size: PageSize) -> Self {
        Session {
            tabs: IndexMap::new(),
            active: 0,
            default_page_size,
        }
    }

    /// Open a new tab for `table` and make it active. Name collisions get a
    /// numeric suffix so every tab keeps its own key.
    pub fn add_tab(&mut self, table: Table) -> &str {
        let mut key = table.name.clone();
        let mut n = 1;
        while self.tabs.contains_key(&key) {
            n += 1;
            key = format!("{} ({n})", table.name);
        }
        debug!("opening tab {key:?} with {} rows", table.nrows());
        self.tabs.insert(key.clone(), Tab::new(table, self.default_page_size));
        self.active = self.tabs.len() - 1;
        self.tabs.get_index(self.active).map(|(k, _)| k.as_str()).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_name(&self) -> Option<&str> {
        self.tabs.get_index(self.active).map(|(k, _)| k.as_str())
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.get_index(self.active).map(|(_, t)| t)
    }

    pub fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        self.tabs.get_index_mut(self.active).map(|(_, t)| t)
    }

    pub fn next_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.active = (self.active + 1) % self.tabs.len();
        }
    }

    pub fn prev_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.active = (self.active + self.tabs.len() - 1) % self.tabs.len();
        }
    }

    /// Apply an action to the active tab's view state. A session without
    /// tabs ignores every action.
    pub fn apply(&mut self, action: Action) {
        let Some(tab) = self.active_tab_mut() else {
            return;
        };
        debug!("applying {action:?}");
        match action {
            Action::SetSearch(term) => tab.state.set_search(&term),
            Action::SetColumnFilter { column, value } => tab.state.set_column_filter(&column, &value),
            Action::SortBy(column) => tab.state.sort_by(&column),
            Action::SetSort { column, order } => tab.state.set_sort(&column, order),
            Action::GoToPage(page) => tab.state.go_to_page(page),
            Action::SetPageSize(size) => tab.state.set_page_size(size),
            Action::ClearFilters => tab.state.clear_filters(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnSpec, Record, Table};

    fn table(name: &str, values: &[&str]) -> Table {
        let columns = vec![ColumnSpec::new("v")];
        let records: Vec<Record> = values
            .iter()
            .map(|v| [("v".to_string(), v.to_string())].into_iter().collect())
            .collect();
        Table::from_records(name, &columns, records)
    }

    #[test]
    fn actions_drive_the_active_tab() {
        let mut session = Session::new(PageSize::rows(2));
        session.add_tab(table("t", &["apple", "banana", "cherry"]));

        session.apply(Action::SetSearch("an".to_string()));
        let page = session.active_tab().unwrap().view();
        assert_eq!(page.filtered, 1);

        session.apply(Action::ClearFilters);
        session.apply(Action::SortBy("v".to_string()));
        session.apply(Action::SortBy("v".to_string()));
        let page = session.active_tab().unwrap().view();
        let tab = session.active_tab().unwrap();
        assert_eq!(tab.table.cell(page.rows[0], "v"), "cherry");
    }

    #[test]
    fn tabs_are_isolated() {
        let mut session = Session::new(PageSize::All);
        session.add_tab(table("a", &["x", "y"]));
        session.add_tab(table("b", &["x", "y"]));

        session.apply(Action::SetSearch("x".to_string()));
        assert_eq!(session.active_tab().unwrap().view().filtered, 1);

        session.prev_tab();
        assert_eq!(session.active_name(), Some("a"));
        assert_eq!(session.active_tab().unwrap().view().filtered, 2);
    }

    #[test]
    fn tab_cycling_wraps() {
        let mut session = Session::new(PageSize::All);
        session.add_tab(table("a", &[]));
        session.add_tab(table("b", &[]));
        assert_eq!(session.active_index(), 1);
        session.next_tab();
        assert_eq!(session.active_name(), Some("a"));
        session.prev_tab();
        assert_eq!(session.active_name(), Some("b"));
    }

    #[test]
    fn duplicate_tab_names_get_suffixes() {
        let mut session = Session::new(PageSize::All);
        session.add_tab(table("data.csv", &[]));
        let key = session.add_tab(table("data.csv", &[])).to_string();
        assert_eq!(key, "data.csv (2)");
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn an_empty_session_ignores_actions() {
        let mut session = Session::new(PageSize::All);
        session.apply(Action::SetSearch("x".to_string()));
        assert!(session.is_empty());
        assert!(session.active_tab().is_none());
    }
}

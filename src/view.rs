use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use tracing::trace;

use crate::data::{ColumnKind, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortOrder::Ascending => "▲",
            SortOrder::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub order: SortOrder,
}

/// Number of rows shown per page, or everything at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Rows(usize),
    All,
}

impl PageSize {
    /// A fixed page size of at least one row.
    pub fn rows(n: usize) -> Self {
        PageSize::Rows(n.max(1))
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Rows(n) => write!(f, "{n}"),
            PageSize::All => write!(f, "all"),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(PageSize::All);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(PageSize::Rows(n)),
            _ => Err(format!("expected a positive row count or \"all\", got {s:?}")),
        }
    }
}

/// Search, filter, sort and pagination parameters of a single table view.
///
/// Created when a tab is loaded, mutated in place by user interaction and
/// dropped with the session. The stored page is unclamped; [`compute_view`]
/// clamps it against the filtered row count on every derivation.
#[derive(Debug, Clone)]
pub struct ViewState {
    search: String,
    filters: IndexMap<String, String>,
    sort: Option<Sort>,
    page: usize,
    page_size: PageSize,
}

impl ViewState {
    pub fn new(page_size: PageSize) -> Self {
        ViewState {
            search: String::new(),
            filters: IndexMap::new(),
            sort: None,
            page: 1,
            page_size,
        }
    }

    /// Store the lowercased search term and jump back to the first page.
    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_lowercase();
        self.page = 1;
        trace!("search term set to {:?}", self.search);
    }

    /// Store a substring filter for one column. An empty value clears the
    /// filter for that column. The page is left alone; the clamp in
    /// [`compute_view`] catches a page that ran past the shrunken row set.
    pub fn set_column_filter(&mut self, column: &str, value: &str) {
        if value.is_empty() {
            self.filters.shift_remove(column);
        } else {
            self.filters.insert(column.to_string(), value.to_string());
        }
    }

    /// Sort by `column`, flipping the direction when it already is the sort
    /// column.
    pub fn sort_by(&mut self, column: &str) {
        self.sort = Some(match self.sort.take() {
            Some(sort) if sort.column == column => Sort {
                column: sort.column,
                order: sort.order.flipped(),
            },
            _ => Sort {
                column: column.to_string(),
                order: SortOrder::Ascending,
            },
        });
    }

    /// Fix the sort column and direction in one step (CLI flags).
    pub fn set_sort(&mut self, column: &str, order: SortOrder) {
        self.sort = Some(Sort {
            column: column.to_string(),
            order,
        });
    }

    /// Store the requested page as-is; clamping happens when the view is
    /// derived.
    pub fn go_to_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn set_page_size(&mut self, size: PageSize) {
        self.page_size = size;
        self.page = 1;
    }

    /// Drop the search term and all column filters.
    pub fn clear_filters(&mut self) {
        self.search.clear();
        self.filters.clear();
        self.page = 1;
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filters(&self) -> &IndexMap<String, String> {
        &self.filters
    }

    pub fn filter_for(&self, column: &str) -> Option<&str> {
        self.filters.get(column).map(String::as_str)
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }
}

/// One derived page of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewPage {
    /// Row indices into the backing table, in display order.
    pub rows: Vec<usize>,
    /// Rows surviving search and filters, before pagination.
    pub filtered: usize,
    /// Always at least one, even for an empty filter result.
    pub total_pages: usize,
    /// The page actually shown after clamping.
    pub page: usize,
}

/// Row indices surviving search and filters, sorted into display order but
/// not yet paginated. CSV export serializes exactly this order.
pub fn visible_order(table: &Table, state: &ViewState) -> Vec<usize> {
    let mut order: Vec<usize> = (0..table.nrows())
        .filter(|&row| row_matches(table, state, row))
        .collect();

    if let Some(sort) = state.sort()
        && let Some(column) = table.column(&sort.column)
    {
        // Stable sort: ties keep their filtered order. Descending swaps the
        // operands, which leaves equal cells stable as well.
        match sort.order {
            SortOrder::Ascending => {
                order.sort_by(|&a, &b| compare_cells(column.kind, column.cell(a), column.cell(b)));
            }
            SortOrder::Descending => {
                order.sort_by(|&a, &b| compare_cells(column.kind, column.cell(b), column.cell(a)));
            }
        }
    }
    order
}

/// Derive the visible page for `state`. Pure; neither input is touched.
pub fn compute_view(table: &Table, state: &ViewState) -> ViewPage {
    let order = visible_order(table, state);
    let filtered = order.len();

    match state.page_size() {
        PageSize::All => ViewPage {
            rows: order,
            filtered,
            total_pages: 1,
            page: 1,
        },
        PageSize::Rows(per_page) => {
            let per_page = per_page.max(1);
            let total_pages = filtered.div_ceil(per_page).max(1);
            let page = state.page().clamp(1, total_pages);
            let begin = (page - 1) * per_page;
            let end = (begin + per_page).min(filtered);
            let rows = if begin < filtered {
                order[begin..end].to_vec()
            } else {
                Vec::new()
            };
            ViewPage {
                rows,
                filtered,
                total_pages,
                page,
            }
        }
    }
}

fn row_matches(table: &Table, state: &ViewState, row: usize) -> bool {
    if !state.search().is_empty() {
        let hit = table
            .columns()
            .iter()
            .any(|column| column.cell(row).to_lowercase().contains(state.search()));
        if !hit {
            return false;
        }
    }
    // A filter naming an absent column reads the cell as "" and therefore
    // matches nothing, without erroring.
    state
        .filters()
        .iter()
        .all(|(column, needle)| table.cell(row, column).contains(needle.as_str()))
}

/// Per-column comparison: numeric columns compare parsed values with
/// unparseable cells ordered after all numbers, text columns compare
/// case-insensitively. The strategy is fixed by the column kind, never
/// re-detected per pair.
fn compare_cells(kind: ColumnKind, a: &str, b: &str) -> Ordering {
    match kind {
        ColumnKind::Numeric => match (parse_number(a), parse_number(b)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => compare_text(a, b),
        },
        ColumnKind::Text => compare_text(a, b),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

pub(crate) fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnSpec, Record, Table};

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn people() -> Table {
        let columns = vec![
            ColumnSpec::new("name"),
            ColumnSpec::new("team"),
            ColumnSpec::new("score"),
        ];
        let records = vec![
            record(&[("name", "Natalia"), ("team", "blue"), ("score", "2")]),
            record(&[("name", "Bob"), ("team", "red"), ("score", "10")]),
            record(&[("name", "alice"), ("team", "blue"), ("score", "1")]),
            record(&[("name", "Dave"), ("team", "green"), ("score", "")]),
        ];
        Table::from_records("people", &columns, records)
    }

    fn names(table: &Table, rows: &[usize]) -> Vec<String> {
        rows.iter()
            .map(|&r| table.cell(r, "name").to_string())
            .collect()
    }

    #[test]
    fn unfiltered_view_shows_everything() {
        let table = people();
        let state = ViewState::new(PageSize::All);
        let page = compute_view(&table, &state);
        assert_eq!(page.rows, vec![0, 1, 2, 3]);
        assert_eq!(page.filtered, 4);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.set_search("ALI");
        let page = compute_view(&table, &state);
        assert_eq!(names(&table, &page.rows), vec!["Natalia", "alice"]);
    }

    #[test]
    fn search_resets_page() {
        let mut state = ViewState::new(PageSize::rows(2));
        state.go_to_page(7);
        state.set_search("x");
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn filtering_is_idempotent() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.set_search("blue");
        let once = compute_view(&table, &state);
        state.set_search("blue");
        let twice = compute_view(&table, &state);
        assert_eq!(once, twice);
    }

    #[test]
    fn column_filters_and_together() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.set_column_filter("team", "blue");
        assert_eq!(compute_view(&table, &state).filtered, 2);
        state.set_column_filter("name", "ice");
        let page = compute_view(&table, &state);
        assert_eq!(names(&table, &page.rows), vec!["alice"]);
    }

    #[test]
    fn empty_filter_value_clears_the_filter() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.set_column_filter("team", "blue");
        state.set_column_filter("team", "");
        assert_eq!(compute_view(&table, &state).filtered, 4);
    }

    #[test]
    fn filter_on_absent_column_matches_nothing() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.set_column_filter("nope", "x");
        let page = compute_view(&table, &state);
        assert_eq!(page.filtered, 0);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn numeric_column_sorts_numerically() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.sort_by("score");
        let page = compute_view(&table, &state);
        // 1, 2, 10 numerically, the empty cell after all numbers.
        assert_eq!(names(&table, &page.rows), vec!["alice", "Natalia", "Bob", "Dave"]);
    }

    #[test]
    fn text_column_sorts_case_insensitively() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.sort_by("name");
        let page = compute_view(&table, &state);
        assert_eq!(names(&table, &page.rows), vec!["alice", "Bob", "Dave", "Natalia"]);
    }

    #[test]
    fn sort_by_again_flips_direction() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.sort_by("name");
        state.sort_by("name");
        assert_eq!(
            state.sort(),
            Some(&Sort {
                column: "name".to_string(),
                order: SortOrder::Descending
            })
        );
        let page = compute_view(&table, &state);
        assert_eq!(names(&table, &page.rows), vec!["Natalia", "Dave", "Bob", "alice"]);
    }

    #[test]
    fn switching_sort_column_starts_ascending() {
        let mut state = ViewState::new(PageSize::All);
        state.sort_by("name");
        state.sort_by("name");
        state.sort_by("score");
        assert_eq!(
            state.sort(),
            Some(&Sort {
                column: "score".to_string(),
                order: SortOrder::Ascending
            })
        );
    }

    #[test]
    fn sorting_twice_is_a_no_op_on_order() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.set_sort("team", SortOrder::Ascending);
        let once = compute_view(&table, &state);
        state.set_sort("team", SortOrder::Ascending);
        let twice = compute_view(&table, &state);
        assert_eq!(once.rows, twice.rows);
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.sort_by("team");
        let page = compute_view(&table, &state);
        // Natalia precedes alice in the source; equal "blue" keys keep that.
        assert_eq!(names(&table, &page.rows), vec!["Natalia", "alice", "Dave", "Bob"]);
    }

    #[test]
    fn sort_on_absent_column_keeps_order() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.sort_by("nope");
        assert_eq!(compute_view(&table, &state).rows, vec![0, 1, 2, 3]);
    }

    #[test]
    fn page_is_clamped_to_the_filtered_range() {
        let columns = vec![ColumnSpec::new("n")];
        let records = (0..60)
            .map(|i| record(&[("n", i.to_string().as_str())]))
            .collect();
        let table = Table::from_records("sixty", &columns, records);

        let mut state = ViewState::new(PageSize::rows(25));
        state.go_to_page(5);
        let page = compute_view(&table, &state);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
        assert_eq!(page.rows.len(), 10);

        state.go_to_page(0);
        assert_eq!(compute_view(&table, &state).page, 1);
    }

    #[test]
    fn visible_rows_never_exceed_the_page_size() {
        let table = people();
        let mut state = ViewState::new(PageSize::rows(3));
        let page = compute_view(&table, &state);
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.total_pages, 2);

        state.set_page_size(PageSize::All);
        let page = compute_view(&table, &state);
        assert_eq!(page.rows.len(), page.filtered);
    }

    #[test]
    fn set_page_size_resets_page() {
        let mut state = ViewState::new(PageSize::rows(2));
        state.go_to_page(2);
        state.set_page_size(PageSize::rows(10));
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn page_size_parses_counts_and_all() {
        assert_eq!("25".parse::<PageSize>(), Ok(PageSize::Rows(25)));
        assert_eq!("all".parse::<PageSize>(), Ok(PageSize::All));
        assert_eq!("All".parse::<PageSize>(), Ok(PageSize::All));
        assert!("0".parse::<PageSize>().is_err());
        assert!("-3".parse::<PageSize>().is_err());
    }

    #[test]
    fn clear_filters_drops_search_and_filters() {
        let table = people();
        let mut state = ViewState::new(PageSize::All);
        state.set_search("blue");
        state.set_column_filter("name", "a");
        state.clear_filters();
        assert_eq!(compute_view(&table, &state).filtered, 4);
    }
}

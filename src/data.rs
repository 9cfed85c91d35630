use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use indexmap::IndexMap;
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::TabvError;

/// One ingested row: field name to cell value, in field order. Missing
/// fields read as the empty string once the row is loaded into a [`Table`].
pub type Record = IndexMap<String, String>;

/// Comparison strategy of a column, fixed at ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

/// Column name plus the label shown in the header.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub label: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        ColumnSpec {
            label: name.clone(),
            name,
        }
    }

    pub fn labeled(name: impl Into<String>, label: impl Into<String>) -> Self {
        ColumnSpec {
            name: name.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub label: String,
    pub kind: ColumnKind,
    cells: Vec<String>,
    max_width: usize,
}

impl Column {
    fn new(spec: ColumnSpec, kind: ColumnKind, cells: Vec<String>) -> Self {
        let max_width = cells.iter().map(|c| c.chars().count()).max().unwrap_or(0);
        Column {
            name: spec.name,
            label: spec.label,
            kind,
            cells,
            max_width,
        }
    }

    /// Cell in string form; rows outside the column read as "".
    pub fn cell(&self, row: usize) -> &str {
        self.cells.get(row).map(String::as_str).unwrap_or("")
    }

    /// Widest cell, in characters.
    pub fn max_width(&self) -> usize {
        self.max_width
    }
}

/// A loaded record set in columnar form. Rows are identified by position;
/// column order is display order and can be rearranged.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    columns: Vec<Column>,
    nrows: usize,
}

impl Table {
    /// Build a table from flat records. Fields a record lacks become empty
    /// cells; fields no [`ColumnSpec`] names are dropped.
    pub fn from_records(name: impl Into<String>, columns: &[ColumnSpec], records: Vec<Record>) -> Self {
        let nrows = records.len();
        let columns = columns
            .iter()
            .map(|spec| {
                let cells: Vec<String> = records
                    .iter()
                    .map(|record| record.get(&spec.name).cloned().unwrap_or_default())
                    .collect();
                let kind = infer_kind(&cells);
                Column::new(spec.clone(), kind, cells)
            })
            .collect();
        Table {
            name: name.into(),
            columns,
            nrows,
        }
    }

    /// Load a table from a CSV, Parquet or Arrow/IPC file.
    pub fn from_path(path: &Path) -> Result<Self, TabvError> {
        let file_info = FileInfo::inspect(path)?;
        info!(
            "loading {} ({} bytes, {:?})",
            file_info.path.display(),
            file_info.file_size,
            file_info.file_type
        );
        let frame = match file_info.file_type {
            FileType::Csv => load_csv(&file_info.path)?,
            FileType::Parquet => load_parquet(&file_info.path)?,
            FileType::Arrow => load_arrow(&file_info.path)?,
        };

        // Materialize every column as strings, one rayon task per column.
        let start_time = Instant::now();
        let df = frame.collect()?;
        let names = df.get_column_names_owned();
        let columns = names
            .par_iter()
            .enumerate()
            .map(|(idx, name)| load_column(&df, idx, name.as_str()))
            .collect::<Result<Vec<Column>, PolarsError>>()?;
        info!("materialized {} columns in {}ms", columns.len(), start_time.elapsed().as_millis());
        for column in &columns {
            debug!(
                "column {:?}: {:?}, {} rows, max width {}",
                column.name,
                column.kind,
                column.cells.len(),
                column.max_width
            );
        }

        let nrows = columns.first().map(|c| c.cells.len()).unwrap_or(0);
        let name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        Ok(Table {
            name,
            columns,
            nrows,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Cell in string form; absent columns and out-of-range rows read as "".
    pub fn cell(&self, row: usize, column: &str) -> &str {
        self.column(column).map(|c| c.cell(row)).unwrap_or("")
    }

    /// Swap the column at display position `idx` with its left neighbour.
    pub fn move_column_left(&mut self, idx: usize) -> bool {
        if idx == 0 || idx >= self.columns.len() {
            return false;
        }
        self.columns.swap(idx - 1, idx);
        true
    }

    /// Swap the column at display position `idx` with its right neighbour.
    pub fn move_column_right(&mut self, idx: usize) -> bool {
        if idx + 1 >= self.columns.len() {
            return false;
        }
        self.columns.swap(idx, idx + 1);
        true
    }
}

/// Numeric when there is at least one non-empty cell and every non-empty
/// cell parses as a finite float.
fn infer_kind(cells: &[String]) -> ColumnKind {
    let mut saw_value = false;
    for cell in cells {
        if cell.is_empty() {
            continue;
        }
        if crate::view::parse_number(cell).is_none() {
            return ColumnKind::Text;
        }
        saw_value = true;
    }
    if saw_value { ColumnKind::Numeric } else { ColumnKind::Text }
}

#[derive(Debug)]
enum FileType {
    Csv,
    Parquet,
    Arrow,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

impl FileInfo {
    fn inspect(path: &Path) -> Result<Self, TabvError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TabvError::FileNotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => TabvError::PermissionDenied(path.to_path_buf()),
            _ => TabvError::Io(e),
        })?;
        if !metadata.is_file() {
            return Err(TabvError::LoadingFailed(format!(
                "{} is not a file",
                path.display()
            )));
        }
        Ok(FileInfo {
            path: path.to_path_buf(),
            file_size: metadata.len(),
            file_type: detect_file_type(path)?,
        })
    }
}

fn detect_file_type(path: &Path) -> Result<FileType, TabvError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::Csv),
        Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::Arrow),
        _ => Err(TabvError::UnknownFileType(path.to_path_buf())),
    }
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn load_column(df: &DataFrame, idx: usize, name: &str) -> Result<Column, PolarsError> {
    let dtype = df.column(name)?.dtype().clone();
    let casted = df.column(name)?.cast(&DataType::String)?;
    let series = casted.str()?;

    let mut cells = Vec::with_capacity(series.len());
    for value in series.into_iter() {
        // Nulls read as empty cells; the value is kept verbatim otherwise
        // and only sanitized at render time.
        cells.push(value.map(str::to_string).unwrap_or_default());
    }

    // Schema-typed numeric columns keep their kind; string columns that
    // happen to hold only numbers are still sorted numerically.
    let kind = if is_numeric_dtype(&dtype) {
        ColumnKind::Numeric
    } else {
        infer_kind(&cells)
    };
    debug!("loaded column {idx} {name:?} as {kind:?}");
    Ok(Column::new(ColumnSpec::new(name), kind, cells))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_fields_become_empty_cells() {
        let columns = vec![ColumnSpec::new("a"), ColumnSpec::new("b")];
        let records = vec![record(&[("a", "1")]), record(&[("b", "x"), ("a", "2")])];
        let table = Table::from_records("t", &columns, records);
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.cell(0, "b"), "");
        assert_eq!(table.cell(1, "b"), "x");
        assert_eq!(table.cell(0, "missing"), "");
        assert_eq!(table.cell(9, "a"), "");
    }

    #[test]
    fn kind_is_inferred_per_column() {
        let columns = vec![
            ColumnSpec::new("num"),
            ColumnSpec::new("mixed"),
            ColumnSpec::new("blank"),
        ];
        let records = vec![
            record(&[("num", "1.5"), ("mixed", "7"), ("blank", "")]),
            record(&[("num", ""), ("mixed", "seven"), ("blank", "")]),
            record(&[("num", "-2"), ("mixed", "8"), ("blank", "")]),
        ];
        let table = Table::from_records("t", &columns, records);
        assert_eq!(table.column("num").map(|c| c.kind), Some(ColumnKind::Numeric));
        assert_eq!(table.column("mixed").map(|c| c.kind), Some(ColumnKind::Text));
        assert_eq!(table.column("blank").map(|c| c.kind), Some(ColumnKind::Text));
    }

    #[test]
    fn columns_reorder_in_place() {
        let columns = vec![ColumnSpec::new("a"), ColumnSpec::new("b"), ColumnSpec::new("c")];
        let mut table = Table::from_records("t", &columns, Vec::new());
        assert!(table.move_column_right(0));
        let order: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert!(table.move_column_left(1));
        assert!(!table.move_column_left(0));
        assert!(!table.move_column_right(2));
    }

    #[test]
    fn labels_default_to_names() {
        let spec = ColumnSpec::new("speed");
        assert_eq!(spec.label, "speed");
        let spec = ColumnSpec::labeled("speed", "Speed (km/h)");
        assert_eq!(spec.label, "Speed (km/h)");
    }
}

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::data::Table;
use crate::view::{ViewState, visible_order};

/// Quote one CSV field. Every field is quoted, embedded quotes doubled.
pub fn csv_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Join fields into one CSV line, without the trailing newline.
pub fn csv_line<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| csv_field(f.as_ref()))
        .collect::<Vec<String>>()
        .join(",")
}

/// Serialize the view as CSV: a header of display labels, then every row
/// surviving search and filters in exactly the on-screen sort order, with
/// pagination removed.
pub fn write_csv<W: Write>(table: &Table, state: &ViewState, out: &mut W) -> io::Result<()> {
    let header: Vec<&str> = table.columns().iter().map(|c| c.label.as_str()).collect();
    writeln!(out, "{}", csv_line(header))?;

    for row in visible_order(table, state) {
        let fields: Vec<&str> = table.columns().iter().map(|c| c.cell(row)).collect();
        writeln!(out, "{}", csv_line(fields))?;
    }
    Ok(())
}

/// Write the view to a CSV file, creating or truncating it.
pub fn export_csv_file(table: &Table, state: &ViewState, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_csv(table, state, &mut out)?;
    out.flush()?;
    info!("exported {:?} to {}", table.name, path.display());
    Ok(())
}

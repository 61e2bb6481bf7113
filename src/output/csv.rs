//! Canonical CSV rendering of a projected table.
//!
//! Fields are written as-is: no quoting and no escaping, so a comma or newline
//! inside a cell shifts the columns of that row.

use crate::error::TypedSheetError;
use crate::schema::projector::TableRow;
use csv::QuoteStyle;
use csv::Terminator;
use csv::WriterBuilder;
use std::path::Path;
use std::path::PathBuf;

/// Renders rows as comma-joined lines, each terminated by `\n`.
///
/// ```
/// let rows = vec![vec!["Key".to_owned(), "ID".to_owned()], vec!["1".to_owned(), "7".to_owned()]];
/// assert_eq!(typed_sheet::output::csv::render(&rows).unwrap(), "Key,ID\n1,7\n");
/// ```
pub fn render(rows: &[TableRow]) -> Result<String, TypedSheetError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|error| error.into_error())?;
    Ok(String::from_utf8(bytes).map_err(|error| error.utf8_error())?)
}

/// File name for a sheet's CSV. Path separators in the sheet name become `_`.
pub fn csv_file_name(sheet_name: &str) -> String {
    format!("{}.csv", sheet_name.replace(['/', '\\'], "_"))
}

/// Writes `<out_dir>/<sheet_name>.csv`, replacing any existing file. Zero rows give an empty file.
pub fn write_table(rows: &[TableRow], out_dir: &Path, sheet_name: &str) -> Result<PathBuf, TypedSheetError> {
    let text = render(rows)?;
    let path = out_dir.join(csv_file_name(sheet_name));
    std::fs::write(&path, text).map_err(|source| TypedSheetError::WriteError { path: path.clone(), source })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(rows: &[&[&str]]) -> Vec<TableRow> {
        rows.iter().map(|row| row.iter().map(|it| it.to_string()).collect()).collect()
    }

    #[test]
    fn renders_without_quoting() {
        let text = render(&rows(&[&["Key", "ID", "Name"], &["1", "7", "Tom \"T\", Jr"], &["2", "", ""]])).unwrap();
        assert_eq!(text, "Key,ID,Name\n1,7,Tom \"T\", Jr\n2,,\n");
    }

    #[test]
    fn renders_nothing_for_no_rows() {
        assert_eq!(render(&[]).unwrap(), "");
    }

    #[test]
    fn writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_table(&rows(&[&["Key", "ID"]]), dir.path(), "Items").unwrap();
        assert_eq!(path, dir.path().join("Items.csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Key,ID\n");
    }

    #[test]
    fn missing_directory_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_table(&[], &dir.path().join("missing"), "Items");
        assert!(matches!(result, Err(TypedSheetError::WriteError { .. })));
    }

    #[test]
    fn file_name_keeps_sheet_name() {
        assert_eq!(csv_file_name("Item Drops"), "Item Drops.csv");
        assert_eq!(csv_file_name("a/b"), "a_b.csv");
    }
}

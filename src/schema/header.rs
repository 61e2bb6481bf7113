//! Locating the typed header row of a sheet.

use crate::schema::vocabulary::is_valid_type;
use crate::spreadsheet::sheet::Sheet;
use tracing::debug;

/// Separates the type tag from the column name in a header cell (`int32=ID`).
pub const FIELD_SEPARATOR: char = '=';

/// Header-row text marking the column that supplies each data row's key. Matched exactly.
pub const KEY_MARKER: &str = "KEY";

/// Where the typed header of a sheet begins.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HeaderPosition {
    /// Row of the first valid type tag (0-based)
    pub header_row: usize,
    /// Column of the first valid type tag (0-based)
    pub header_col: usize,
    /// Column of the first key marker on the header row, never left of `header_col`
    pub key_col: Option<usize>,
}

/// Streaming header detection over the cells of one sheet.
///
/// Cells must be observed in row-major order. The first `=`-separated part that
/// names a valid type fixes the header position; from then on only the rest of
/// the header row is inspected, looking for the key marker.
#[derive(Clone, Debug, Default)]
pub struct HeaderScan {
    position: Option<HeaderPosition>,
}

impl HeaderScan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, row: usize, col: usize, text: &str) {
        if self.is_settled(row) {
            return;
        }
        for part in text.split(FIELD_SEPARATOR) {
            match &mut self.position {
                None if is_valid_type(part) => {
                    self.position = Some(HeaderPosition { header_row: row, header_col: col, key_col: None });
                }
                Some(position) if position.key_col.is_none() && part == KEY_MARKER => {
                    position.key_col = Some(col);
                }
                _ => (),
            }
        }
    }

    /// True once the header is fixed and `row` lies below it, so further cells change nothing.
    pub fn is_settled(&self, row: usize) -> bool {
        self.position.is_some_and(|position| row > position.header_row)
    }

    pub fn position(&self) -> Option<HeaderPosition> {
        self.position
    }
}

/// Scans a sheet for its typed header. `None` if no cell holds a valid type tag.
pub fn locate_header(sheet: &Sheet) -> Option<HeaderPosition> {
    let mut scan = HeaderScan::new();
    for row in sheet.rows() {
        if scan.is_settled(row.index()) {
            break;
        }
        for (col, cell) in row.cells().iter().enumerate() {
            if let Some(cell) = cell {
                scan.observe(row.index(), col, &cell.text());
            }
        }
    }
    match scan.position() {
        Some(position) => debug!(sheet = sheet.name(), ?position, "Located header"),
        None => debug!(sheet = sheet.name(), "No typed header"),
    }
    scan.position()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate(rows: Vec<Vec<&str>>) -> Option<HeaderPosition> {
        locate_header(&Sheet::from_rows("Sheet", rows))
    }

    #[test]
    fn header_at_origin() {
        assert_eq!(
            locate(vec![vec!["int32=ID", "string=Name"]]),
            Some(HeaderPosition { header_row: 0, header_col: 0, key_col: None })
        );
    }

    #[test]
    fn key_marker_on_header_row() {
        assert_eq!(
            locate(vec![vec!["int32=ID", "string=Name", "KEY"]]).and_then(|it| it.key_col),
            Some(2)
        );
    }

    #[test]
    fn header_after_free_text() {
        let position = locate(vec![
            vec!["Item table", "", ""],
            vec![],
            vec!["", "notes", "uint8=Level", "KEY", "KEY"],
        ]);
        assert_eq!(position, Some(HeaderPosition { header_row: 2, header_col: 2, key_col: Some(3) }));
    }

    #[test]
    fn key_marker_is_case_sensitive() {
        assert_eq!(locate(vec![vec!["int32=ID", "key"]]).and_then(|it| it.key_col), None);
        assert_eq!(locate(vec![vec!["int32=ID", "Key"]]).and_then(|it| it.key_col), None);
    }

    #[test]
    fn key_marker_only_counts_on_header_row() {
        let position = locate(vec![vec!["KEY"], vec!["int32=ID"], vec!["KEY"]]);
        assert_eq!(position, Some(HeaderPosition { header_row: 1, header_col: 0, key_col: None }));
    }

    #[test]
    fn key_marker_inside_a_field_cell() {
        assert_eq!(locate(vec![vec!["KEY=int32"]]).and_then(|it| it.key_col), None);
        assert_eq!(locate(vec![vec!["string=ID", "int32=KEY"]]).and_then(|it| it.key_col), Some(1));
    }

    #[test]
    fn no_type_token_means_no_header() {
        assert_eq!(locate(vec![]), None);
        assert_eq!(locate(vec![vec!["ID", "Name"], vec!["1", "Alice"]]), None);
    }

    #[test]
    fn type_tag_is_case_insensitive() {
        assert_eq!(
            locate(vec![vec!["", "INT32=ID"]]),
            Some(HeaderPosition { header_row: 0, header_col: 1, key_col: None })
        );
    }

    #[test]
    fn later_rows_are_not_rescanned() {
        let mut scan = HeaderScan::new();
        scan.observe(0, 1, "int32=ID");
        scan.observe(1, 0, "string=Name");
        scan.observe(1, 1, "KEY");
        assert_eq!(scan.position(), Some(HeaderPosition { header_row: 0, header_col: 1, key_col: None }));
    }
}

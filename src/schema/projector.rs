//! Projecting a sheet below its typed header into a rectangular table.

use crate::schema::header::locate_header;
use crate::schema::header::HeaderPosition;
use crate::schema::header::FIELD_SEPARATOR;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::sheet::SheetRow;
use tracing::debug;

/// Label of the key column on the two header rows.
pub const KEY_LABEL: &str = "Key";

/// One output row: the key followed by the declared columns.
pub type TableRow = Vec<String>;

/// How data rows get a key when the header declares no key column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum KeyPolicy {
    /// 1, 2, 3, ... per emitted data row
    #[default]
    Counter,
    /// The same literal on every data row
    Constant(String),
}

/// The rectangular projection of one sheet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectedTable {
    pub header: Option<HeaderPosition>,
    /// Every row has `1 + width` fields
    pub rows: Vec<TableRow>,
    /// Non-empty cells right of the declared columns that were left out
    pub dropped_cells: usize,
}

impl ProjectedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of fields per row, including the key.
    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }
}

/// Locates the header of `sheet` and projects the rows from there on.
pub fn project_sheet(sheet: &Sheet, policy: &KeyPolicy) -> ProjectedTable {
    match locate_header(sheet) {
        Some(header) => project_with_header(sheet, header, policy),
        None => ProjectedTable::default(),
    }
}

/// Projects `sheet` with an already located header.
///
/// The declared width spans from `header_col` to the last non-empty cell of the
/// header row. On the header row each value is the type tag part of the cell;
/// below it values are the full cell text. The header row and the sheet row right
/// below it are keyed `Key`; every later row is a data row. Rows with nothing in
/// the declared span are skipped.
pub fn project_with_header(sheet: &Sheet, header: HeaderPosition, policy: &KeyPolicy) -> ProjectedTable {
    let mut rows = sheet.rows().skip(header.header_row);
    let header_row = match rows.next() {
        Some(row) => row,
        None => return ProjectedTable { header: Some(header), ..Default::default() },
    };
    let width = header_row.cells().len().saturating_sub(header.header_col);

    let mut table = ProjectedTable { header: Some(header), rows: Vec::new(), dropped_cells: 0 };
    let mut values = project_values(&header_row, header.header_col, width, true);
    values.insert(0, KEY_LABEL.to_owned());
    table.rows.push(values);

    let mut counter = 0usize;
    for row in rows {
        let dropped = row.cells().iter().skip(header.header_col + width).flatten().count();
        if dropped > 0 {
            debug!(sheet = sheet.name(), row = row.index(), dropped, "Dropped cells right of the declared columns");
            table.dropped_cells += dropped;
        }

        let mut values = project_values(&row, header.header_col, width, false);
        if values.iter().all(String::is_empty) {
            continue;
        }
        let key = if row.index() <= header.header_row + 1 {
            KEY_LABEL.to_owned()
        } else if let Some(key_col) = header.key_col {
            values.get(key_col - header.header_col).cloned().unwrap_or_default()
        } else {
            match policy {
                KeyPolicy::Counter => {
                    counter += 1;
                    counter.to_string()
                }
                KeyPolicy::Constant(value) => value.to_owned(),
            }
        };
        values.insert(0, key);
        table.rows.push(values);
    }
    table
}

fn project_values(row: &SheetRow<'_>, header_col: usize, width: usize, is_header_row: bool) -> Vec<String> {
    (header_col..header_col + width)
        .map(|col| match row.text(col) {
            Some(text) if is_header_row => text.split(FIELD_SEPARATOR).next().unwrap_or_default().to_owned(),
            Some(text) => text.into_owned(),
            None => String::new(),
        })
        .collect()
}

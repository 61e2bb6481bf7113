use crate::spreadsheet::cell::Cell;
use std::borrow::Cow;

/// One sheet of a workbook, holding its non-empty cells in row-major order.
#[derive(Clone, Debug)]
pub struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    /// All non-empty cells, sorted by (row, col)
    pub(crate) cells: Vec<Cell>,
    /// Actual data range (determined from cell data)
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
    /// Whether cells arrived out of row-major order and need sorting
    unordered: bool,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            row_upper_bound: None,
            col_upper_bound: None,
            unordered: false,
        }
    }

    /// Builds a sheet from rows of cell text. Empty strings are treated as empty cells.
    ///
    /// ```
    /// use typed_sheet::Sheet;
    ///
    /// let sheet = Sheet::from_rows("Items", [vec!["int32=ID", "string=Name"], vec!["", "Sword"]]);
    /// assert_eq!(sheet.cell(1, 1).map(|cell| cell.text().into_owned()), Some("Sword".to_owned()));
    /// assert!(sheet.cell(1, 0).is_none());
    /// ```
    pub fn from_rows<R, C, S>(name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sheet = Sheet::new(name);
        for (row, cells) in rows.into_iter().enumerate() {
            for (col, text) in cells.into_iter().enumerate() {
                let text = text.into();
                if !text.is_empty() {
                    sheet.push(Cell::text_cell(row, col, text));
                }
            }
        }
        sheet.finish();
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the sheet contains no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of rows from row 0 through the last row holding a cell.
    pub fn row_count(&self) -> usize {
        self.row_upper_bound.map(|row| row + 1).unwrap_or(0)
    }

    /// Number of columns from column 0 through the right-most cell.
    pub fn col_count(&self) -> usize {
        self.col_upper_bound.map(|col| col + 1).unwrap_or(0)
    }

    /// Looks up a cell by 0-based position.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells
            .binary_search_by(|cell| (cell.row, cell.col).cmp(&(row, col)))
            .ok()
            .map(|index| &self.cells[index])
    }

    /// Adds a cell to the sheet, updating the data range.
    pub(crate) fn push(&mut self, cell: Cell) {
        if let Some(last) = self.cells.last() {
            if (last.row, last.col) >= (cell.row, cell.col) {
                self.unordered = true;
            }
        }
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_upper_bound.map(|row_upper_bound| row_upper_bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Restores row-major order after all cells have been added.
    /// A later cell at the same position replaces the earlier one.
    pub(crate) fn finish(&mut self) {
        if self.unordered {
            self.cells.sort_by_key(|cell| (cell.row, cell.col));
            self.cells.reverse();
            self.cells.dedup_by_key(|cell| (cell.row, cell.col));
            self.cells.reverse();
            self.unordered = false;
        }
    }

    /// Iterates over every row from row 0 through the last non-empty row,
    /// including the empty rows in between.
    pub fn rows(&self) -> SheetRows<'_> {
        SheetRows {
            sheet: self,
            row: 0,
            index: 0,
        }
    }
}

/// Iterator over the rows of a [`Sheet`].
pub struct SheetRows<'a> {
    sheet: &'a Sheet,
    row: usize,
    index: usize,
}

impl<'a> Iterator for SheetRows<'a> {
    type Item = SheetRow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.sheet.row_count() {
            return None;
        }
        let mut cells = Vec::<Option<&Cell>>::new();
        while let Some(cell) = self.sheet.cells.get(self.index).filter(|cell| cell.row == self.row) {
            cells.resize(cell.col, None);
            cells.push(Some(cell));
            self.index += 1;
        }
        let row = SheetRow { index: self.row, cells };
        self.row += 1;
        Some(row)
    }
}

/// One row of a sheet, dense from column 0 through the last non-empty cell.
#[derive(Debug)]
pub struct SheetRow<'a> {
    index: usize,
    cells: Vec<Option<&'a Cell>>,
}

impl<'a> SheetRow<'a> {
    /// Row index (0-based)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cells of the row, with gaps as `None`.
    pub fn cells(&self) -> &[Option<&'a Cell>] {
        &self.cells
    }

    /// Rendered text at a column, `None` for an empty cell.
    pub fn text(&self, col: usize) -> Option<Cow<'a, str>> {
        self.cells.get(col).copied().flatten().map(Cell::text)
    }

    /// True if the row has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

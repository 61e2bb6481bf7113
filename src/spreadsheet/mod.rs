//! Workbook readers for Office Open XML (`.xlsx`, `.xlsm`) and OpenDocument (`.ods`) files.
//!
//! Readers expose sheet names and the rendered text of every non-empty cell.
//! Formulas are not evaluated; the cached value stored in the file is used.
pub mod cell;
mod excel;
pub(crate) mod ods;
pub mod reference;
pub mod selection;
pub mod sheet;
mod xlsx;

use crate::error::TypedSheetError;
use crate::helpers::reader::SourceReader;
use crate::spreadsheet::ods::OdsWorkbook;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxWorkbook;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading the structure of a workbook
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing part '{0}' in workbook")]
    FileError(String),

    #[error("Workbook '{0}' has no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Workbook '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Sheet '{sheet}' not found in workbook '{workbook}'")]
    SheetNotFound { workbook: String, sheet: String },

    #[error("Shared string index {index} out of range at '{reference}'")]
    SharedStringIndexError { reference: String, index: usize },
}

/// Read access to the sheets of an opened workbook.
pub trait Workbook {
    /// File name of the workbook
    fn name(&self) -> &str;

    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Reads every non-empty cell of the named sheet
    fn read_sheet(&mut self, name: &str) -> Result<Sheet, TypedSheetError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum WorkbookFormat {
    Xlsx,
    Ods,
}

impl WorkbookFormat {
    fn detect(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "ods" => Some(Self::Ods),
            _ => None,
        }
    }
}

/// Returns true if a reader exists for the file's extension.
pub fn is_supported_workbook(path: &Path) -> bool {
    WorkbookFormat::detect(path).is_some()
}

/// Opens a workbook from disk, choosing the reader by file extension.
pub fn open_workbook(path: &Path) -> Result<Box<dyn Workbook>, TypedSheetError> {
    let format = WorkbookFormat::detect(path)
        .ok_or_else(|| TypedSheetError::UnsupportedFormat { path: path.to_path_buf() })?;
    let reader = SourceReader::open(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    open_with_reader(&name, format, reader)
}

/// Opens a workbook held in memory. `name` must carry the file extension.
pub fn open_workbook_from_bytes(name: &str, bytes: Vec<u8>) -> Result<Box<dyn Workbook>, TypedSheetError> {
    let format = WorkbookFormat::detect(Path::new(name))
        .ok_or_else(|| TypedSheetError::UnsupportedFormat { path: name.into() })?;
    open_with_reader(name, format, SourceReader::from_bytes(bytes))
}

fn open_with_reader(name: &str, format: WorkbookFormat, reader: SourceReader) -> Result<Box<dyn Workbook>, TypedSheetError> {
    Ok(match format {
        WorkbookFormat::Xlsx => Box::new(XlsxWorkbook::open(name, reader)?),
        WorkbookFormat::Ods => Box::new(OdsWorkbook::open(name, reader)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_by_extension() {
        assert_eq!(WorkbookFormat::detect(Path::new("Items.xlsx")), Some(WorkbookFormat::Xlsx));
        assert_eq!(WorkbookFormat::detect(Path::new("dir/Items.XLSM")), Some(WorkbookFormat::Xlsx));
        assert_eq!(WorkbookFormat::detect(Path::new("Items.ods")), Some(WorkbookFormat::Ods));
        assert_eq!(WorkbookFormat::detect(Path::new("Items.xls")), None);
        assert_eq!(WorkbookFormat::detect(Path::new("Items")), None);
    }

    #[test]
    fn unsupported_extension_fails_before_reading() {
        let result = open_workbook_from_bytes("Items.csv", Vec::new());
        assert!(matches!(result, Err(TypedSheetError::UnsupportedFormat { .. })));
    }

    #[test]
    fn garbage_bytes_are_a_parse_failure() {
        let error = open_workbook_from_bytes("Items.xlsx", b"not a zip".to_vec()).err().unwrap();
        assert!(error.is_parse_failure());
    }
}

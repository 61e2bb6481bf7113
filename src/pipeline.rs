//! Batch operations over workbooks: conversion to CSV, declaration generation
//! and status listing.
//!
//! Path problems fail fast with an error before anything is read. Everything
//! after that is recorded in a [`BatchReport`] and processing moves on to the
//! next sheet; files already written stay on disk.

use crate::error::ResultMessage;
use crate::error::TypedSheetError;
use crate::output::csv::csv_file_name;
use crate::output::csv::write_table;
use crate::output::declaration::declaration_file_name;
use crate::output::declaration::write_declaration;
use crate::output::declaration::DeclarationOptions;
use crate::output::declaration::DeclarationTarget;
use crate::schema::fields::extract_schema;
use crate::schema::fields::FieldProblem;
use crate::schema::fields::TableSchema;
use crate::schema::projector::project_sheet;
use crate::schema::projector::KeyPolicy;
use crate::spreadsheet::is_supported_workbook;
use crate::spreadsheet::open_workbook;
use crate::spreadsheet::selection::SheetSelection;
use crate::spreadsheet::Workbook;
use glob::Pattern;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::info_span;
use tracing::warn;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub key_policy: KeyPolicy,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The workbook could not be opened or a sheet could not be read
    Parse,
    /// An output file could not be written
    Write,
}

/// A failure recorded for a workbook, or for one sheet of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub workbook: PathBuf,
    pub sheet: Option<String>,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenFile {
    pub workbook: PathBuf,
    /// The sheet a CSV file was projected from, `None` for a declaration file
    pub sheet: Option<String>,
    pub path: PathBuf,
    /// Table rows in a CSV file, records in a declaration file
    pub rows: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedSheet {
    pub workbook: PathBuf,
    pub sheet: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetProblem {
    pub workbook: PathBuf,
    pub sheet: String,
    pub problem: FieldProblem,
}

/// Outcome of a batch operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub written: Vec<WrittenFile>,
    pub skipped: Vec<SkippedSheet>,
    pub problems: Vec<SheetProblem>,
    pub failures: Vec<Failure>,
}

impl BatchReport {
    /// True when nothing failed. Skipped sheets and field problems do not count.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.written.extend(other.written);
        self.skipped.extend(other.skipped);
        self.problems.extend(other.problems);
        self.failures.extend(other.failures);
    }

    fn fail(&mut self, workbook: &Path, sheet: Option<&str>, error: TypedSheetError) {
        let kind = if error.is_parse_failure() { FailureKind::Parse } else { FailureKind::Write };
        self.fail_as(workbook, sheet, kind, error);
    }

    /// Records a failure of the output step. Everything `write_table` and
    /// `write_declaration` raise is a write failure, whatever its error variant.
    fn fail_write(&mut self, workbook: &Path, sheet: Option<&str>, error: TypedSheetError) {
        self.fail_as(workbook, sheet, FailureKind::Write, error);
    }

    fn fail_as(&mut self, workbook: &Path, sheet: Option<&str>, kind: FailureKind, error: TypedSheetError) {
        error!(workbook = %workbook.display(), sheet, "{}", error);
        self.failures.push(Failure {
            workbook: workbook.to_path_buf(),
            sheet: sheet.map(str::to_owned),
            kind,
            message: error.to_string(),
        });
    }
}

/// Whether the outputs of one sheet already exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetStatus {
    pub workbook: PathBuf,
    pub sheet: String,
    pub csv_exists: bool,
    pub declaration_exists: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusListing {
    pub sheets: Vec<SheetStatus>,
    pub failures: Vec<Failure>,
}

/// Checks that `path` is an existing workbook file with a supported extension.
pub fn validate_workbook_path(path: &Path) -> Result<(), TypedSheetError> {
    if !path.is_file() {
        return Err(TypedSheetError::InvalidPath { path: path.to_path_buf(), reason: "workbook file not found" });
    }
    if !is_supported_workbook(path) {
        return Err(TypedSheetError::UnsupportedFormat { path: path.to_path_buf() });
    }
    Ok(())
}

pub fn validate_directory(path: &Path) -> Result<(), TypedSheetError> {
    if !path.is_dir() {
        return Err(TypedSheetError::InvalidPath { path: path.to_path_buf(), reason: "directory not found" });
    }
    Ok(())
}

/// Recursively finds `.xlsx`, `.xlsm` and `.ods` workbooks under `dir`, sorted by path.
/// Office lock files (`~$Book.xlsx`) are ignored.
pub fn find_workbooks(dir: &Path) -> Result<Vec<PathBuf>, TypedSheetError> {
    validate_directory(dir)?;
    let root = dir.to_str().ok_or_else(|| TypedSheetError::InvalidPath {
        path: dir.to_path_buf(),
        reason: "path is not valid UTF-8",
    })?;
    let pattern = format!("{}/**/*", Pattern::escape(root));
    let mut workbooks = Vec::<PathBuf>::new();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        let is_lock_file = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("~$"));
        if path.is_file() && !is_lock_file && is_supported_workbook(&path) {
            workbooks.push(path);
        }
    }
    workbooks.sort();
    debug!(dir = %dir.display(), count = workbooks.len(), "Found workbooks");
    Ok(workbooks)
}

/// Sheet names of a workbook, in workbook order.
pub fn list_sheets(path: &Path) -> Result<Vec<String>, TypedSheetError> {
    validate_workbook_path(path)?;
    let workbook = open_workbook(path)?;
    Ok(workbook.sheet_names())
}

/// Schemas of the selected sheets, without writing anything.
pub fn inspect_schemas(path: &Path, selection: &SheetSelection) -> Result<Vec<TableSchema>, TypedSheetError> {
    validate_workbook_path(path)?;
    let mut workbook = open_workbook(path)?;
    let mut schemas = Vec::new();
    for sheet_name in selection.select(&workbook.sheet_names()) {
        let sheet = workbook.read_sheet(&sheet_name).with_prefix(&sheet_name)?;
        schemas.push(extract_schema(&sheet));
    }
    Ok(schemas)
}

/// Writes `<out_dir>/<sheet>.csv` for every selected sheet of a workbook.
///
/// A sheet without a typed header produces an empty file. A sheet whose file
/// name matches one already written for this workbook (`a/b` and `a_b` both
/// give `a_b.csv`) is reported as a write failure and not written.
pub fn convert_workbook(
    path: &Path,
    selection: &SheetSelection,
    out_dir: &Path,
    options: &ConvertOptions,
) -> Result<BatchReport, TypedSheetError> {
    validate_workbook_path(path)?;
    validate_directory(out_dir)?;
    let span = info_span!("convert", workbook = %path.display());
    let _guard = span.enter();

    let mut report = BatchReport::default();
    let mut workbook = match open_workbook(path) {
        Ok(workbook) => workbook,
        Err(error) => {
            report.fail(path, None, error);
            return Ok(report);
        }
    };
    let mut outputs = HashMap::<PathBuf, String>::new();
    for sheet_name in selection.select(&workbook.sheet_names()) {
        convert_sheet(workbook.as_mut(), path, &sheet_name, out_dir, options, &mut outputs, &mut report);
    }
    Ok(report)
}

fn convert_sheet(
    workbook: &mut dyn Workbook,
    path: &Path,
    sheet_name: &str,
    out_dir: &Path,
    options: &ConvertOptions,
    outputs: &mut HashMap<PathBuf, String>,
    report: &mut BatchReport,
) {
    let csv_path = out_dir.join(csv_file_name(sheet_name));
    if let Some(first) = outputs.get(&csv_path) {
        let error = TypedSheetError::OutputCollision { path: csv_path, sheet: first.to_owned() };
        return report.fail_write(path, Some(sheet_name), error);
    }
    let sheet = match workbook.read_sheet(sheet_name).with_prefix(&format!("Read sheet '{sheet_name}'")) {
        Ok(sheet) => sheet,
        Err(error) => return report.fail(path, Some(sheet_name), error),
    };
    let table = project_sheet(&sheet, &options.key_policy);
    if table.header.is_none() {
        warn!(sheet = sheet_name, "No typed header, writing an empty table");
    }
    match write_table(&table.rows, out_dir, sheet_name) {
        Ok(csv_path) => {
            outputs.insert(csv_path.clone(), sheet_name.to_owned());
            info!(sheet = sheet_name, rows = table.rows.len(), path = %csv_path.display(), "Wrote CSV");
            report.written.push(WrittenFile {
                workbook: path.to_path_buf(),
                sheet: Some(sheet_name.to_owned()),
                path: csv_path,
                rows: table.rows.len(),
            });
        }
        Err(error) => report.fail_write(path, Some(sheet_name), error),
    }
}

/// Writes one declaration file for the selected sheets of a workbook.
///
/// Sheets without a typed header get no record and are reported as skipped.
/// Field problems are reported and the fields left out.
pub fn generate_declaration(
    path: &Path,
    selection: &SheetSelection,
    out_dir: &Path,
    options: &DeclarationOptions,
) -> Result<BatchReport, TypedSheetError> {
    validate_workbook_path(path)?;
    validate_directory(out_dir)?;
    let span = info_span!("generate", workbook = %path.display());
    let _guard = span.enter();

    let mut report = BatchReport::default();
    let mut workbook = match open_workbook(path) {
        Ok(workbook) => workbook,
        Err(error) => {
            report.fail(path, None, error);
            return Ok(report);
        }
    };

    let mut schemas = Vec::<TableSchema>::new();
    for sheet_name in selection.select(&workbook.sheet_names()) {
        let sheet = match workbook.read_sheet(&sheet_name).with_prefix(&format!("Read sheet '{sheet_name}'")) {
            Ok(sheet) => sheet,
            Err(error) => {
                report.fail(path, Some(sheet_name.as_str()), error);
                continue;
            }
        };
        let schema = extract_schema(&sheet);
        for problem in &schema.problems {
            warn!(sheet = %sheet_name, "{}", problem);
            report.problems.push(SheetProblem {
                workbook: path.to_path_buf(),
                sheet: sheet_name.to_owned(),
                problem: problem.clone(),
            });
        }
        if schema.has_header() {
            schemas.push(schema);
        } else {
            warn!(sheet = %sheet_name, "No typed header, skipping sheet");
            report.skipped.push(SkippedSheet {
                workbook: path.to_path_buf(),
                sheet: sheet_name,
                reason: "no typed header".to_owned(),
            });
        }
    }

    let stem = workbook_stem(path);
    match write_declaration(&stem, &schemas, out_dir, options) {
        Ok(declaration_path) => {
            info!(records = schemas.len(), path = %declaration_path.display(), "Wrote declaration");
            report.written.push(WrittenFile {
                workbook: path.to_path_buf(),
                sheet: None,
                path: declaration_path,
                rows: schemas.len(),
            });
        }
        Err(error) => report.fail_write(path, None, error),
    }
    Ok(report)
}

/// Lists every sheet of every workbook under `excel_dir` with the state of its outputs.
///
/// Workbooks that fail to open are reported in `failures` and do not stop the listing.
pub fn workbook_status(
    excel_dir: &Path,
    csv_dir: &Path,
    struct_dir: &Path,
    target: DeclarationTarget,
    selection: &SheetSelection,
) -> Result<StatusListing, TypedSheetError> {
    let mut listing = StatusListing::default();
    for path in find_workbooks(excel_dir)? {
        let workbook = match open_workbook(&path) {
            Ok(workbook) => workbook,
            Err(error) => {
                warn!(workbook = %path.display(), "{}", error);
                listing.failures.push(Failure {
                    workbook: path,
                    sheet: None,
                    kind: FailureKind::Parse,
                    message: error.to_string(),
                });
                continue;
            }
        };
        let declaration_exists = struct_dir.join(declaration_file_name(&workbook_stem(&path), target)).is_file();
        for sheet in selection.select(&workbook.sheet_names()) {
            listing.sheets.push(SheetStatus {
                workbook: path.clone(),
                csv_exists: csv_dir.join(csv_file_name(&sheet)).is_file(),
                declaration_exists,
                sheet,
            });
        }
    }
    Ok(listing)
}

/// File name of a workbook without its extension.
pub fn workbook_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_workbook_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let result = convert_workbook(
            &dir.path().join("Missing.xlsx"),
            &SheetSelection::all(),
            dir.path(),
            &ConvertOptions::default(),
        );
        assert!(matches!(result, Err(TypedSheetError::InvalidPath { .. })));
    }

    #[test]
    fn unsupported_extension_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Items.xls");
        std::fs::write(&path, b"legacy").unwrap();
        let result = list_sheets(&path);
        assert!(matches!(result, Err(TypedSheetError::UnsupportedFormat { .. })));
    }

    #[test]
    fn missing_output_directory_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Items.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();
        let result = generate_declaration(
            &path,
            &SheetSelection::all(),
            &dir.path().join("out"),
            &DeclarationOptions::default(),
        );
        assert!(matches!(result, Err(TypedSheetError::InvalidPath { .. })));
    }

    #[test]
    fn corrupt_workbook_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Items.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();
        let report = convert_workbook(&path, &SheetSelection::all(), dir.path(), &ConvertOptions::default()).unwrap();
        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Parse);
        assert_eq!(report.failures[0].sheet, None);
        assert!(report.written.is_empty());
    }

    #[test]
    fn output_step_failures_are_write_failures() {
        let mut report = BatchReport::default();
        let invalid = std::str::from_utf8(&[0xff]).unwrap_err();
        report.fail_write(Path::new("Items.xlsx"), Some("Items"), TypedSheetError::from(invalid));
        report.fail(Path::new("Items.xlsx"), Some("Items"), TypedSheetError::from(invalid));
        let kinds = report.failures.iter().map(|failure| failure.kind).collect::<Vec<_>>();
        assert_eq!(kinds, vec![FailureKind::Write, FailureKind::Parse]);
    }

    #[test]
    fn finds_workbooks_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["b.xlsx", "nested/a.ods", "notes.txt", "~$b.xlsx", "old.xls"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let found = find_workbooks(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("b.xlsx"), dir.path().join("nested/a.ods")]);
    }

    #[test]
    fn stem_drops_extension() {
        assert_eq!(workbook_stem(Path::new("data/GameData.xlsx")), "GameData");
    }
}

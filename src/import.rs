//! Handing converted CSV files to an asset importer.
//!
//! The importer itself lives in the host engine. This module resolves which
//! record type a table uses and prepares the CSV text the importer expects.

use crate::error::TypedSheetError;
use crate::output::declaration::struct_name;
use crate::output::declaration::DeclarationTarget;
use crate::schema::fields::TableSchema;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing::warn;

/// A row the importer could not take. The rest of the table is still imported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportProblem {
    /// Line of the prepared CSV text (0-based), if known
    pub row: Option<usize>,
    pub message: String,
}

impl Display for ImportProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}: {}", row, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Creates or updates a table asset from CSV text.
pub trait TableImporter {
    fn create_or_update_table(
        &mut self,
        table_name: &str,
        csv_text: &str,
        record_type: &str,
    ) -> Result<(), Vec<ImportProblem>>;
}

/// Record types known to the host, keyed by table (sheet) name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordCatalog {
    entries: BTreeMap<String, String>,
}

impl RecordCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table_name: impl Into<String>, record_type: impl Into<String>) {
        self.entries.insert(table_name.into(), record_type.into());
    }

    /// Registers the record types a declaration generated for `schemas` defines.
    pub fn from_schemas(schemas: &[TableSchema], target: DeclarationTarget) -> Self {
        let mut catalog = Self::new();
        for schema in schemas.iter().filter(|schema| schema.has_header()) {
            catalog.insert(schema.sheet.clone(), struct_name(&schema.sheet, target));
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact table name first, then a case-insensitive match.
    pub fn resolve(&self, table_name: &str) -> Option<&str> {
        self.entries
            .get(table_name)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(table_name))
                    .map(|(_, record_type)| record_type)
            })
            .map(String::as_str)
    }
}

/// Drops the type declaration line. Importers expect the column names first.
pub fn prepare_import_csv(csv_text: &str) -> &str {
    match csv_text.split_once('\n') {
        Some((_, rest)) => rest,
        None => "",
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOutcome {
    pub table_name: String,
    pub record_type: String,
    pub problems: Vec<ImportProblem>,
}

impl ImportOutcome {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Reads `<table>.csv`, resolves its record type and passes it to `importer`.
///
/// Row problems reported by the importer end up in the outcome. A missing
/// file or an unknown table is an error and the importer is not called.
pub fn import_sheet_csv(
    importer: &mut dyn TableImporter,
    csv_path: &Path,
    catalog: &RecordCatalog,
) -> Result<ImportOutcome, TypedSheetError> {
    if !csv_path.is_file() {
        return Err(TypedSheetError::InvalidPath { path: csv_path.to_path_buf(), reason: "CSV file not found" });
    }
    let table_name = csv_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let record_type = catalog
        .resolve(&table_name)
        .ok_or_else(|| TypedSheetError::RecordTypeNotFound { table: table_name.clone() })?
        .to_owned();

    let content = fs::read_to_string(csv_path)?;
    let problems = match importer.create_or_update_table(&table_name, prepare_import_csv(&content), &record_type) {
        Ok(()) => Vec::new(),
        Err(problems) => problems,
    };
    for problem in &problems {
        warn!(table = %table_name, "{}", problem);
    }
    info!(table = %table_name, record_type = %record_type, problems = problems.len(), "Imported table");
    Ok(ImportOutcome { table_name, record_type, problems })
}

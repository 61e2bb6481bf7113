//! # typed_sheet
//!
//! Turns spreadsheet sheets that declare a typed header into CSV tables and
//! row struct declarations for a game engine's data table importer.
//!
//! A sheet declares its columns on a header row of `type=name` cells:
//!
//! | int32=ID | string=Name | KEY |
//! |----------|-------------|-----|
//! | ID       | Name        |     |
//! | 1        | Sword       | sw  |
//!
//! The header may start anywhere in the sheet. Rows above it and cells left of
//! it are ignored. A `KEY` cell on the header row names the column that keys
//! each data row; without one, keys come from a [`KeyPolicy`].
//!
//! ## Features
//!
//! - **Workbook readers**: `.xlsx`, `.xlsm` and `.ods`, without external tools
//! - **CSV tables**: a `Key` column followed by the declared columns, one file per sheet
//! - **Declarations**: Unreal `USTRUCT` headers or serde Rust structs, one file per workbook
//! - **Batch pipeline**: per-sheet failures are collected in a [`pipeline::BatchReport`]
//!   instead of aborting the run
//!
//! ```
//! use typed_sheet::{project_sheet, KeyPolicy, Sheet};
//!
//! let sheet = Sheet::from_rows("Items", vec![
//!     vec!["int32=ID", "fstring=Name"],
//!     vec!["ID", "Name"],
//!     vec!["1", "Alice"],
//! ]);
//! let table = project_sheet(&sheet, &KeyPolicy::Counter);
//! assert_eq!(table.rows[2], vec!["1", "1", "Alice"]);
//! ```
pub mod config;
pub mod error;
mod helpers;
pub mod import;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod schema;
pub mod spreadsheet;

pub use error::TypedSheetError;
pub use output::declaration::DeclarationOptions;
pub use output::declaration::DeclarationTarget;
pub use schema::fields::extract_schema;
pub use schema::fields::FieldProblem;
pub use schema::fields::SchemaField;
pub use schema::fields::TableSchema;
pub use schema::header::locate_header;
pub use schema::header::HeaderPosition;
pub use schema::projector::project_sheet;
pub use schema::projector::KeyPolicy;
pub use schema::projector::ProjectedTable;
pub use schema::projector::TableRow;
pub use schema::vocabulary::is_valid_type;
pub use schema::vocabulary::TypeTag;
pub use spreadsheet::cell::Cell;
pub use spreadsheet::open_workbook;
pub use spreadsheet::open_workbook_from_bytes;
pub use spreadsheet::selection::SheetSelection;
pub use spreadsheet::sheet::Sheet;
pub use spreadsheet::sheet::SheetRow;
pub use spreadsheet::Workbook;

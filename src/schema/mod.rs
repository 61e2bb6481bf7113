//! Typed header detection, table projection and schema extraction.
//!
//! A sheet declares its schema on a header row of `type=name` cells, optionally
//! marking a key column with `KEY`. [`header::locate_header`] finds that row once,
//! and both [`projector::project_sheet`] and [`fields::extract_schema`] build on it.
pub mod fields;
pub mod header;
pub mod projector;
pub mod vocabulary;

//! Files produced from sheets: CSV tables and row struct declarations.
pub mod csv;
pub mod declaration;

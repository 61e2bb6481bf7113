use std::path::PathBuf;
use thiserror::Error;

/// Main error type for typed_sheet.
/// Aggregates errors from the workbook readers, the emitters and the dependencies they use.
#[derive(Error, Debug)]
pub enum TypedSheetError {
    #[error("{0}")]
    WithContextError(String),

    // Call boundary errors
    #[error("Invalid path '{}': {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: &'static str },

    #[error("Unsupported workbook format '{}'", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("No record type registered for table '{table}'")]
    RecordTypeNotFound { table: String },

    #[error("Output '{}' already written for sheet '{sheet}' in this run", path.display())]
    OutputCollision { path: PathBuf, sheet: String },

    #[error("Write '{}' failed: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    GlobError(#[from] glob::GlobError),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    #[error("{0}")]
    ConfigError(#[from] toml::de::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    OdsError(#[from] crate::spreadsheet::ods::OdsError),
}

impl TypedSheetError {
    /// Returns true for failures raised while opening or reading a workbook,
    /// as opposed to path validation, lookup or output failures.
    pub fn is_parse_failure(&self) -> bool {
        !matches!(
            self,
            Self::InvalidPath { .. }
                | Self::UnsupportedFormat { .. }
                | Self::RecordTypeNotFound { .. }
                | Self::OutputCollision { .. }
                | Self::WriteError { .. }
        )
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, TypedSheetError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| match e {
            // keep the variant so callers can still classify the failure
            TypedSheetError::InvalidPath { .. }
            | TypedSheetError::UnsupportedFormat { .. }
            | TypedSheetError::RecordTypeNotFound { .. }
            | TypedSheetError::OutputCollision { .. }
            | TypedSheetError::WriteError { .. } => e,
            _ => TypedSheetError::WithContextError(format!("{}: {}", message, e)),
        })
    }
}

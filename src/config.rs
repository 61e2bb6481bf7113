//! Project configuration loaded from `typed-sheet.toml`.
//!
//! ```toml
//! [paths]
//! excel_dir = "Data/Excel"
//! csv_dir = "Data/CSV"
//! struct_dir = "Source/Game/Tables"
//!
//! [convert]
//! key_policy = "counter"   # or "constant"
//! fallback_key = "1"
//!
//! [generate]
//! target = "unreal"        # or "rust"
//!
//! [sheets]
//! include = ["Item*"]
//! ```

use crate::error::TypedSheetError;
use crate::output::declaration::DeclarationOptions;
use crate::output::declaration::DeclarationTarget;
use crate::schema::projector::KeyPolicy;
use crate::spreadsheet::selection::SheetSelection;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "typed-sheet.toml";

/// Literal used by the constant key policy when none is configured.
pub const DEFAULT_FALLBACK_KEY: &str = "1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub paths: PathsConfig,
    pub convert: ConvertConfig,
    pub generate: GenerateConfig,
    pub sheets: SheetsConfig,
}

/// Default directories for workbooks, CSV files and declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub excel_dir: Option<PathBuf>,
    pub csv_dir: Option<PathBuf>,
    pub struct_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPolicyKind {
    #[default]
    Counter,
    Constant,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    pub key_policy: KeyPolicyKind,
    /// Literal for the constant policy
    pub fallback_key: Option<String>,
}

impl ConvertConfig {
    pub fn key_policy(&self) -> KeyPolicy {
        match self.key_policy {
            KeyPolicyKind::Counter => KeyPolicy::Counter,
            KeyPolicyKind::Constant => KeyPolicy::Constant(
                self.fallback_key.clone().unwrap_or_else(|| DEFAULT_FALLBACK_KEY.to_owned()),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateConfig {
    pub target: DeclarationTarget,
    pub header_comment: Option<String>,
}

impl GenerateConfig {
    pub fn declaration_options(&self) -> DeclarationOptions {
        DeclarationOptions {
            target: self.target,
            header_comment: self.header_comment.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetsConfig {
    /// Sheet names or glob patterns, empty for all sheets
    pub include: Vec<String>,
}

impl SheetsConfig {
    pub fn selection(&self) -> Result<SheetSelection, TypedSheetError> {
        SheetSelection::from_patterns(&self.include)
    }
}

pub fn parse_config(text: &str) -> Result<ProjectConfig, TypedSheetError> {
    Ok(toml::from_str(text)?)
}

/// Loads the project configuration.
///
/// A named file must exist and parse. Without one, `typed-sheet.toml` in the
/// working directory is used when present, otherwise the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ProjectConfig, TypedSheetError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !path.is_file() {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                return Ok(ProjectConfig::default());
            }
            path
        }
    };
    let content = fs::read_to_string(&path).map_err(|error| match error.kind() {
        std::io::ErrorKind::NotFound => TypedSheetError::InvalidPath { path: path.clone(), reason: "config file not found" },
        _ => TypedSheetError::IoError(error),
    })?;
    let config = parse_config(&content)?;
    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

use crate::error::TypedSheetError;
use glob::Pattern;

/// Selects which sheets of a workbook to process by name.
///
/// Each entry selects the sheet with exactly that name, or the sheets its glob
/// pattern matches. Without entries every sheet is selected.
#[derive(Clone, Debug, Default)]
pub struct SheetSelection {
    /// Sheet names with their compiled patterns, `None` selects all sheets.
    sheet_name_patterns: Option<Vec<(String, Pattern)>>,
}

impl SheetSelection {
    pub fn all() -> Self {
        Self::default()
    }

    /// Builds a selection from glob patterns such as `Item*`. An empty list selects all sheets.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, TypedSheetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let name = pattern.as_ref();
                Pattern::new(name).map(|compiled| (name.to_owned(), compiled))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            sheet_name_patterns: Some(patterns).filter(|patterns| !patterns.is_empty()),
        })
    }

    /// Checks if a sheet name matches the selection.
    /// Returns true if no patterns are specified, or if any entry equals the name or matches it as a glob.
    pub fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns
                .iter()
                .any(|(name, pattern)| name == sheet_name || pattern.matches(sheet_name)),
            None => true,
        }
    }

    /// Filters sheet names, keeping workbook order.
    pub fn select(&self, sheet_names: &[String]) -> Vec<String> {
        sheet_names
            .iter()
            .filter(|name| self.accept(name))
            .cloned()
            .collect()
    }
}

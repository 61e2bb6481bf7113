//! Deriving the ordered field list of a sheet from its header row.

use crate::schema::header::locate_header;
use crate::schema::header::HeaderPosition;
use crate::schema::header::FIELD_SEPARATOR;
use crate::schema::header::KEY_MARKER;
use crate::schema::vocabulary::TypeTag;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::sheet::Sheet;
use std::collections::HashSet;
use std::fmt::Display;

/// A declared column: `<tag>=<name>` in the header row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub tag: TypeTag,
    /// Sheet column of the header cell (0-based)
    pub col: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldProblemKind {
    /// The part before `=` is not in the vocabulary
    InvalidType { token: String },
    /// Nothing after `=`, or no `=` at all
    MissingName,
    /// An earlier field already uses the name
    DuplicateName { name: String },
}

/// A header cell that could not become a field. The cell is skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldProblem {
    pub col: usize,
    /// A1-style reference of the header cell
    pub reference: String,
    pub kind: FieldProblemKind,
}

impl Display for FieldProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            FieldProblemKind::InvalidType { token } => write!(f, "{}: unknown type '{}'", self.reference, token),
            FieldProblemKind::MissingName => write!(f, "{}: missing field name", self.reference),
            FieldProblemKind::DuplicateName { name } => write!(f, "{}: duplicate field name '{}'", self.reference, name),
        }
    }
}

/// The schema declared by one sheet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub sheet: String,
    pub header: Option<HeaderPosition>,
    /// Fields in header column order
    pub fields: Vec<SchemaField>,
    pub problems: Vec<FieldProblem>,
}

impl TableSchema {
    /// True if the sheet declares a header, even one whose fields all failed.
    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }

    /// The field supplying data row keys, if the key marker names one.
    pub fn key_field(&self) -> Option<&SchemaField> {
        let key_col = self.header?.key_col?;
        self.fields.iter().find(|field| field.col == key_col)
    }
}

/// Locates the header of `sheet` and extracts its fields.
pub fn extract_schema(sheet: &Sheet) -> TableSchema {
    match locate_header(sheet) {
        Some(header) => extract_with_header(sheet, header),
        None => TableSchema { sheet: sheet.name().to_owned(), ..Default::default() },
    }
}

/// Extracts the fields of an already located header.
/// Empty cells and bare key markers are not fields. A trailing `=KEY` on a
/// field cell marks the key column and is not part of the name.
pub fn extract_with_header(sheet: &Sheet, header: HeaderPosition) -> TableSchema {
    let mut schema = TableSchema {
        sheet: sheet.name().to_owned(),
        header: Some(header),
        fields: Vec::new(),
        problems: Vec::new(),
    };
    let row = match sheet.rows().nth(header.header_row) {
        Some(row) => row,
        None => return schema,
    };

    let mut names = HashSet::<String>::new();
    for col in header.header_col..row.cells().len() {
        let text = match row.text(col) {
            Some(text) if !text.is_empty() && text != KEY_MARKER => text,
            _ => continue,
        };
        let (token, name) = match text.split_once(FIELD_SEPARATOR) {
            Some((token, rest)) => match rest.split_once(FIELD_SEPARATOR) {
                Some((name, KEY_MARKER)) => (token, name.trim()),
                _ => (token, rest.trim()),
            },
            None => (&*text, ""),
        };
        let kind = match TypeTag::parse(token) {
            None => Some(FieldProblemKind::InvalidType { token: token.to_owned() }),
            Some(_) if name.is_empty() => Some(FieldProblemKind::MissingName),
            Some(_) if !names.insert(name.to_owned()) => Some(FieldProblemKind::DuplicateName { name: name.to_owned() }),
            Some(tag) => {
                schema.fields.push(SchemaField { name: name.to_owned(), tag, col });
                None
            }
        };
        if let Some(kind) = kind {
            schema.problems.push(FieldProblem {
                col,
                reference: index_to_reference(header.header_row, col),
                kind,
            });
        }
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(rows: Vec<Vec<&str>>) -> TableSchema {
        extract_schema(&Sheet::from_rows("Items", rows))
    }

    fn pairs(schema: &TableSchema) -> Vec<(&str, &str)> {
        schema.fields.iter().map(|field| (field.name.as_str(), field.tag.as_str())).collect()
    }

    #[test]
    fn fields_in_column_order() {
        let schema = extract(vec![vec!["int32=ID", "string=Name"], vec!["ID", "Name"], vec!["1", "Alice"]]);
        assert_eq!(pairs(&schema), vec![("ID", "int32"), ("Name", "string")]);
        assert!(schema.problems.is_empty());
        assert_eq!(schema.fields[1].col, 1);
    }

    #[test]
    fn invalid_type_is_reported_and_skipped() {
        let schema = extract(vec![vec!["", "int32=ID", "vector=Pos", "FString=Name"]]);
        assert_eq!(pairs(&schema), vec![("ID", "int32"), ("Name", "string")]);
        assert_eq!(
            schema.problems,
            vec![FieldProblem {
                col: 2,
                reference: "C1".to_owned(),
                kind: FieldProblemKind::InvalidType { token: "vector".to_owned() },
            }]
        );
        assert_eq!(schema.problems[0].to_string(), "C1: unknown type 'vector'");
    }

    #[test]
    fn missing_and_duplicate_names() {
        let schema = extract(vec![vec!["int32=ID", "string=", "bool", "name=ID", "KEY"]]);
        assert_eq!(pairs(&schema), vec![("ID", "int32")]);
        let kinds = schema.problems.iter().map(|problem| problem.kind.clone()).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                FieldProblemKind::MissingName,
                FieldProblemKind::MissingName,
                FieldProblemKind::DuplicateName { name: "ID".to_owned() },
            ]
        );
    }

    #[test]
    fn key_field_follows_the_marker() {
        let schema = extract(vec![vec!["int32=Level", "string=Code=KEY"]]);
        assert_eq!(schema.header.and_then(|it| it.key_col), Some(1));
        assert_eq!(schema.key_field().map(|field| field.name.as_str()), Some("Code"));
        assert!(schema.problems.is_empty());

        let schema = extract(vec![vec!["string=Code=Alt"]]);
        assert_eq!(pairs(&schema), vec![("Code=Alt", "string")]);

        let schema = extract(vec![vec!["int32=Level", "KEY"]]);
        assert_eq!(schema.key_field(), None);
    }

    #[test]
    fn no_header_means_no_fields() {
        let schema = extract(vec![vec!["free", "text"]]);
        assert!(!schema.has_header());
        assert!(schema.fields.is_empty());
        assert!(schema.problems.is_empty());
        assert_eq!(schema.sheet, "Items");
    }
}

//! Row struct declarations generated from sheet schemas.
//!
//! One declaration file covers one workbook: an info block, the include or
//! import lines, then one struct per sheet that declares a typed header.

use crate::error::TypedSheetError;
use crate::schema::fields::SchemaField;
use crate::schema::fields::TableSchema;
use crate::schema::vocabulary::TypeTag;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

static NON_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("Hardcode regex pattern"));
static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("Hardcode regex pattern"));

/// Keywords and reserved words usable as raw identifiers.
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn", "else",
    "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro",
    "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static", "struct", "trait",
    "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Names that cannot be raw identifiers. Lowercase, since field names are snake_case.
const RUST_NON_RAW_NAMES: &[&str] = &["_", "crate", "self", "super"];

/// Language of the generated declaration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationTarget {
    /// Unreal Engine `USTRUCT` data table rows in a C++ header
    #[default]
    Unreal,
    /// serde-deserializable Rust structs
    Rust,
}

impl DeclarationTarget {
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Unreal => "h",
            Self::Rust => "rs",
        }
    }

    /// Target type name for a tag. Total over the vocabulary.
    pub const fn type_name(&self, tag: TypeTag) -> &'static str {
        match self {
            Self::Unreal => match tag {
                TypeTag::Int | TypeTag::Int32 => "int32",
                TypeTag::UInt | TypeTag::UInt32 => "uint32",
                TypeTag::Int8 => "int8",
                TypeTag::UInt8 => "uint8",
                TypeTag::Int16 => "int16",
                TypeTag::UInt16 => "uint16",
                TypeTag::Int64 => "int64",
                TypeTag::UInt64 => "uint64",
                TypeTag::Float => "float",
                TypeTag::Double => "double",
                TypeTag::Bool | TypeTag::Boolean => "bool",
                TypeTag::Char | TypeTag::AnsiChar => "ANSICHAR",
                TypeTag::TChar => "TCHAR",
                TypeTag::String => "FString",
                TypeTag::Text => "FText",
                TypeTag::Name => "FName",
            },
            Self::Rust => match tag {
                TypeTag::Int | TypeTag::Int32 => "i32",
                TypeTag::UInt | TypeTag::UInt32 => "u32",
                TypeTag::Int8 => "i8",
                TypeTag::UInt8 => "u8",
                TypeTag::Int16 => "i16",
                TypeTag::UInt16 => "u16",
                TypeTag::Int64 => "i64",
                TypeTag::UInt64 => "u64",
                TypeTag::Float => "f32",
                TypeTag::Double => "f64",
                TypeTag::Bool | TypeTag::Boolean => "bool",
                TypeTag::Char | TypeTag::AnsiChar => "u8",
                TypeTag::TChar => "char",
                TypeTag::String | TypeTag::Text | TypeTag::Name => "String",
            },
        }
    }
}

impl FromStr for DeclarationTarget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "unreal" => Ok(Self::Unreal),
            "rust" => Ok(Self::Rust),
            _ => Err(format!("unknown declaration target '{value}'")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeclarationOptions {
    pub target: DeclarationTarget,
    /// Replaces the default info line at the top of the file
    pub header_comment: Option<String>,
}

/// `<stem>.h` or `<stem>.rs`.
pub fn declaration_file_name(workbook_stem: &str, target: DeclarationTarget) -> String {
    format!("{}.{}", workbook_stem, target.extension())
}

/// Renders the declaration for one workbook. Schemas without a header are left out.
pub fn render_declaration(workbook_stem: &str, schemas: &[TableSchema], options: &DeclarationOptions) -> String {
    let mut lines = Vec::<String>::new();
    let info = options
        .header_comment
        .clone()
        .unwrap_or_else(|| format!("Generated by typed-sheet from workbook '{workbook_stem}'. Do not edit by hand."));
    lines.extend(info.lines().map(|line| format!("// {line}").trim_end().to_owned()));
    lines.push(String::new());

    match options.target {
        DeclarationTarget::Unreal => {
            lines.push("#pragma once".to_owned());
            lines.push(String::new());
            lines.push("#include \"CoreMinimal.h\"".to_owned());
            lines.push("#include \"Engine/DataTable.h\"".to_owned());
            lines.push(format!("#include \"{workbook_stem}.generated.h\""));
        }
        DeclarationTarget::Rust => {
            lines.push("use serde::Deserialize;".to_owned());
        }
    }

    for schema in schemas.iter().filter(|schema| schema.has_header()) {
        lines.push(String::new());
        match options.target {
            DeclarationTarget::Unreal => write_unreal_struct(&mut lines, schema),
            DeclarationTarget::Rust => write_rust_struct(&mut lines, schema),
        }
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Writes `<out_dir>/<stem>.<ext>`, replacing any existing file.
pub fn write_declaration(
    workbook_stem: &str,
    schemas: &[TableSchema],
    out_dir: &Path,
    options: &DeclarationOptions,
) -> Result<PathBuf, TypedSheetError> {
    let text = render_declaration(workbook_stem, schemas, options);
    let path = out_dir.join(declaration_file_name(workbook_stem, options.target));
    std::fs::write(&path, text).map_err(|source| TypedSheetError::WriteError { path: path.clone(), source })?;
    Ok(path)
}

/// Struct name generated for a sheet.
pub fn struct_name(sheet_name: &str, target: DeclarationTarget) -> String {
    let identifier = to_identifier(sheet_name);
    match target {
        DeclarationTarget::Unreal => format!("F{identifier}"),
        DeclarationTarget::Rust => identifier,
    }
}

fn write_unreal_struct(lines: &mut Vec<String>, schema: &TableSchema) {
    lines.push("USTRUCT(BlueprintType)".to_owned());
    lines.push(format!("struct {} : public FTableRowBase", struct_name(&schema.sheet, DeclarationTarget::Unreal)));
    lines.push("{".to_owned());
    lines.push("\tGENERATED_BODY()".to_owned());
    let mut used = HashSet::<String>::new();
    for field in &schema.fields {
        let name = claim_name(&mut used, to_identifier(&field.name));
        lines.push(String::new());
        lines.push("\tUPROPERTY(EditAnywhere, BlueprintReadWrite)".to_owned());
        lines.push(format!("\t{};", unreal_field(field, &name)));
    }
    lines.push("};".to_owned());
}

fn unreal_field(field: &SchemaField, name: &str) -> String {
    let type_name = DeclarationTarget::Unreal.type_name(field.tag);
    let initializer = match field.tag {
        TypeTag::String | TypeTag::Text | TypeTag::Name => None,
        TypeTag::Bool | TypeTag::Boolean => Some("false"),
        TypeTag::Float => Some("0.f"),
        TypeTag::Double => Some("0.0"),
        _ => Some("0"),
    };
    match initializer {
        Some(value) => format!("{type_name} {name} = {value}"),
        None => format!("{type_name} {name}"),
    }
}

fn write_rust_struct(lines: &mut Vec<String>, schema: &TableSchema) {
    lines.push("#[derive(Clone, Debug, Deserialize)]".to_owned());
    lines.push(format!("pub struct {} {{", struct_name(&schema.sheet, DeclarationTarget::Rust)));
    lines.push("    #[serde(rename = \"Key\")]".to_owned());
    lines.push("    pub row_key: String,".to_owned());
    let mut used = HashSet::from(["row_key".to_owned()]);
    for field in &schema.fields {
        let name = claim_name(&mut used, to_field_name(&field.name));
        if name != field.name {
            lines.push(format!("    #[serde(rename = \"{}\")]", field.name.replace('\\', "\\\\").replace('"', "\\\"")));
        }
        lines.push(format!("    pub {}: {},", name, DeclarationTarget::Rust.type_name(field.tag)));
    }
    lines.push("}".to_owned());
}

/// Replaces runs of characters that cannot appear in an identifier with `_`.
fn to_identifier(name: &str) -> String {
    let identifier = NON_IDENTIFIER.replace_all(name.trim(), "_");
    match identifier.chars().next() {
        None => "_".to_owned(),
        Some(first) if first.is_ascii_digit() => format!("_{identifier}"),
        Some(_) => identifier.into_owned(),
    }
}

/// snake_case field name, escaped as a raw identifier when it is a keyword.
fn to_field_name(name: &str) -> String {
    let identifier = to_identifier(name);
    let snake = WORD_BOUNDARY.replace_all(&identifier, "${1}_${2}").to_ascii_lowercase();
    if snake == "row_key" || RUST_NON_RAW_NAMES.contains(&snake.as_str()) {
        format!("{snake}_")
    } else if RUST_KEYWORDS.contains(&snake.as_str()) {
        format!("r#{snake}")
    } else {
        snake
    }
}

/// Returns `name`, or `name_2`, `name_3`, ... if an earlier field of the same struct took it.
fn claim_name(used: &mut HashSet<String>, name: String) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{name}_{suffix}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

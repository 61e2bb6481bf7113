mod common;

use common::items_rows;
use common::ods_bytes;
use common::write_file;
use common::xlsx_bytes;
use std::fs;
use typed_sheet::import::RecordCatalog;
use typed_sheet::pipeline::generate_declaration;
use typed_sheet::pipeline::inspect_schemas;
use typed_sheet::DeclarationOptions;
use typed_sheet::DeclarationTarget;
use typed_sheet::SheetSelection;
use typed_sheet::TypeTag;

#[test]
fn writes_one_unreal_header_per_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "GameData.xlsx",
        &xlsx_bytes(&[
            ("Items", items_rows()),
            ("Notes", vec![vec!["free text"]]),
            ("Monsters", vec![vec!["int32=Level", "vector=Position", "name=Code", "KEY"]]),
        ]),
    );

    let report = generate_declaration(&path, &SheetSelection::all(), dir.path(), &DeclarationOptions::default()).unwrap();
    assert!(report.is_success());
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.written[0].rows, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].sheet, "Notes");
    assert_eq!(report.problems.len(), 1);
    assert_eq!(report.problems[0].problem.to_string(), "B1: unknown type 'vector'");

    let header = fs::read_to_string(dir.path().join("GameData.h")).unwrap();
    assert!(header.contains("#include \"GameData.generated.h\""));
    assert!(header.contains("struct FItems : public FTableRowBase"));
    assert!(header.contains("\tint32 ID = 0;"));
    assert!(header.contains("\tFString Name;"));
    assert!(header.contains("struct FMonsters : public FTableRowBase"));
    assert!(header.contains("\tFName Code;"));
    assert!(!header.contains("Position"));
    assert!(!header.contains("FNotes"));
}

#[test]
fn writes_rust_structs_from_ods() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Tables.ods", &ods_bytes(&[("Items", items_rows())]));
    let options = DeclarationOptions { target: DeclarationTarget::Rust, header_comment: None };

    let report = generate_declaration(&path, &SheetSelection::all(), dir.path(), &options).unwrap();
    assert!(report.is_success());

    let text = fs::read_to_string(dir.path().join("Tables.rs")).unwrap();
    assert!(text.contains("use serde::Deserialize;"));
    assert!(text.contains("pub struct Items {"));
    assert!(text.contains("    #[serde(rename = \"ID\")]\n    pub id: i32,"));
    assert!(text.contains("    #[serde(rename = \"Name\")]\n    pub name: String,"));
}

#[test]
fn workbook_without_headers_still_gets_a_declaration() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Notes.xlsx", &xlsx_bytes(&[("Notes", vec![vec!["free text"]])]));

    let report = generate_declaration(&path, &SheetSelection::all(), dir.path(), &DeclarationOptions::default()).unwrap();
    assert!(report.is_success());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.written[0].rows, 0);
    let header = fs::read_to_string(dir.path().join("Notes.h")).unwrap();
    assert!(!header.contains("USTRUCT"));
}

#[test]
fn schemas_feed_the_record_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "GameData.xlsx",
        &xlsx_bytes(&[("Items", items_rows()), ("Notes", vec![vec!["free text"]])]),
    );

    let schemas = inspect_schemas(&path, &SheetSelection::all()).unwrap();
    assert_eq!(schemas.len(), 2);
    let fields = schemas[0]
        .fields
        .iter()
        .map(|field| (field.name.as_str(), field.tag))
        .collect::<Vec<_>>();
    assert_eq!(fields, vec![("ID", TypeTag::Int32), ("Name", TypeTag::String)]);
    assert!(!schemas[1].has_header());

    let catalog = RecordCatalog::from_schemas(&schemas, DeclarationTarget::Unreal);
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.resolve("Items"), Some("FItems"));
}

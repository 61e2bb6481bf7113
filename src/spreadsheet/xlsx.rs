use crate::error::TypedSheetError;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::Epoch;
use crate::spreadsheet::excel;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::Workbook;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufReader;
use tracing::debug;
use zip::read::ZipFile;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

/// An Office Open XML workbook (.xlsx, .xlsm)
pub(crate) struct XlsxWorkbook {
    /// File name of the workbook
    name: String,
    zip: ZipArchive<SourceReader>,
    /// Cell types indexed by style id
    number_formats: Vec<CellType>,
    shared_strings: Vec<String>,
    /// Worksheets as (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl XlsxWorkbook {
    /// Opens the archive and loads the sheet list, styles and shared string table.
    pub(crate) fn open(name: &str, reader: SourceReader) -> Result<XlsxWorkbook, TypedSheetError> {
        let mut zip = excel::open(name, reader)?;
        let (sheets, epoch) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, epoch)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        debug!(workbook = name, sheets = sheets.len(), shared_strings = shared_strings.len(), "Opened xlsx workbook");
        Ok(XlsxWorkbook {
            name: name.to_owned(),
            zip,
            number_formats,
            shared_strings,
            sheets,
        })
    }
}

impl Workbook for XlsxWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, TypedSheetError> {
        let zip_path = self.sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, path)| path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFound {
                workbook: self.name.to_owned(),
                sheet: sheet_name.to_owned(),
            })?;

        let mut sheet = Sheet::new(sheet_name);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut reader = self.zip.xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                    row_count = number.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                value.clear();
                kind = event.get_attribute_value("t")?.map(|t| {
                    match t.as_ref() {
                        "inlineStr" | "str" => CellType::Text,
                        "s" => CellType::SharedString,
                        "d" => CellType::IsoDateTime,
                        "b" => CellType::Boolean,
                        "e" => CellType::Error,
                        _ => CellType::Number,
                    }
                }).unwrap_or(CellType::Number);
                if let Some(format_id) = event.get_attribute_value("s")? {
                    if kind == CellType::Number && !format_id.is_empty() {
                        let index = format_id.parse::<usize>()?;
                        kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                    }
                }
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if !value.is_empty() && event.name() == TAG_CELL => {
                if kind == CellType::SharedString {
                    let index = value.trim().parse::<usize>()?;
                    value = self.shared_strings.get(index).cloned().ok_or_else(|| {
                        SpreadsheetError::SharedStringIndexError { reference: index_to_reference(row, col), index }
                    })?;
                    kind = CellType::Text;
                }
                if !value.is_empty() {
                    sheet.push(Cell {
                        row,
                        col,
                        kind,
                        value: std::mem::take(&mut value),
                    });
                }
            },
        });
        sheet.finish();
        Ok(sheet)
    }
}

fn load_shared_strings(zip: &mut ZipArchive<SourceReader>) -> Result<Vec<String>, TypedSheetError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
            shared_strings.push(string);
        }
    });
    Ok(shared_strings)
}

/// Loads the worksheet list and the date system from `xl/workbook.xml`.
fn load_workbook(zip: &mut ZipArchive<SourceReader>) -> Result<(Vec<(String, String)>, Epoch), TypedSheetError> {
    let relationships = excel::load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, Epoch::from_1904_flag(is_1904)))
}

/// Loads number formats and cell style indexes from `xl/styles.xml`,
/// so numeric cells styled as dates render as dates.
fn load_number_formats(zip: &mut ZipArchive<SourceReader>, epoch: Epoch) -> Result<Vec<CellType>, TypedSheetError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();

    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                let style = CellType::parse_custom_number_format(&format, epoch);
                custom_formats.insert(id.to_string(), style);
            }
        }

        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?;
            format_indexes.push(id.map(|id| id.to_string()).unwrap_or_default());
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, epoch))
}

/// Reads the text inside a string element up to `end_tag`, skipping phonetic runs.
fn read_string_value(
    reader: &mut XmlReader<BufReader<ZipFile<'_, SourceReader>>>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, TypedSheetError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr date1904="false"/><sheets><sheet name="Items" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    const RELATIONSHIPS: &str = r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
    const SHARED_STRINGS: &str = r#"<sst><si><t>int32=ID</t></si><si><r><t>string=</t></r><r><t>Name</t></r><rPh><t>ignored</t></rPh></si><si><t>Tom &amp; Jerry</t></si></sst>"#;
    const STYLES: &str = r#"<styleSheet><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy-mm-dd"/></numFmts><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="164"/></cellXfs></styleSheet>"#;
    const WORKSHEET: &str = r#"<worksheet><sheetData>
        <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
        <row r="3"><c r="A3"><v>7</v></c><c r="B3" t="s"><v>2</v></c><c r="C3" s="1"><v>45292</v></c></row>
        <row r="4"><c t="inlineStr"><is><t>inline</t></is></c><c t="b"><v>1</v></c><c t="e"><v>#N/A</v></c></row>
    </sheetData></worksheet>"#;

    fn build(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn workbook() -> XlsxWorkbook {
        let bytes = build(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/styles.xml", STYLES),
            ("xl/worksheets/sheet1.xml", WORKSHEET),
        ]);
        XlsxWorkbook::open("Items.xlsx", SourceReader::from_bytes(bytes)).unwrap()
    }

    fn text(sheet: &Sheet, row: usize, col: usize) -> Option<String> {
        sheet.cell(row, col).map(|cell| cell.text().into_owned())
    }

    #[test]
    fn lists_sheets() {
        assert_eq!(workbook().sheet_names(), vec!["Items"]);
    }

    #[test]
    fn reads_cells_with_rendered_text() {
        let sheet = workbook().read_sheet("Items").unwrap();
        assert_eq!(text(&sheet, 0, 0).as_deref(), Some("int32=ID"));
        assert_eq!(text(&sheet, 0, 1).as_deref(), Some("string=Name"));
        assert_eq!(text(&sheet, 1, 0), None);
        assert_eq!(text(&sheet, 2, 0).as_deref(), Some("7"));
        assert_eq!(text(&sheet, 2, 1).as_deref(), Some("Tom & Jerry"));
        assert_eq!(text(&sheet, 2, 2).as_deref(), Some("2024-01-01"));
        assert_eq!(text(&sheet, 3, 0).as_deref(), Some("inline"));
        assert_eq!(text(&sheet, 3, 1).as_deref(), Some("true"));
        assert_eq!(text(&sheet, 3, 2).as_deref(), Some("#N/A"));
    }

    #[test]
    fn unknown_sheet_is_an_error() {
        let result = workbook().read_sheet("Missing");
        assert!(matches!(
            result,
            Err(TypedSheetError::SpreadsheetError(SpreadsheetError::SheetNotFound { .. }))
        ));
    }

    #[test]
    fn missing_workbook_part_is_an_error() {
        let bytes = build(&[("xl/_rels/workbook.xml.rels", RELATIONSHIPS)]);
        let result = XlsxWorkbook::open("Broken.xlsx", SourceReader::from_bytes(bytes));
        assert!(matches!(
            result,
            Err(TypedSheetError::SpreadsheetError(SpreadsheetError::FileError(_)))
        ));
    }
}

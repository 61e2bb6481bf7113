use crate::error::TypedSheetError;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::Workbook;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
/// XML element name for table (sheet)
const TABLE: QName = QName(b"table:table");
/// XML element name for table row
const TABLE_ROW: QName = QName(b"table:table-row");
/// XML element name for table cell
const TABLE_CELL: QName = QName(b"table:table-cell");
/// XML element name for covered table cell (merged cells)
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// XML element name for annotations (comments)
const ANNOTATION: QName = QName(b"office:annotation");
/// XML element name for paragraph text
const PARAGRAPH: QName = QName(b"text:p");
/// XML element name for string (space) text
const STRING: QName = QName(b"text:s");
const CONTENT: &str = "content.xml";

/// Error types specific to ODS spreadsheet processing
#[derive(Error, Debug)]
pub enum OdsError {
    /// Invalid ODS MIME type detected in file
    #[error("Invalid ODS MIME type")]
    MimeTypeError,
}

/// An OpenDocument spreadsheet (.ods)
pub(crate) struct OdsWorkbook {
    /// File name of the workbook
    name: String,
    zip: ZipArchive<SourceReader>,
    /// Table names in document order
    sheets: Vec<String>,
}

impl OdsWorkbook {
    /// Opens the archive, validates its MIME type and collects the table names.
    pub(crate) fn open(name: &str, reader: SourceReader) -> Result<Self, TypedSheetError> {
        let mut zip = ZipArchive::new(reader)?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(name.to_owned()))?;
        }
        let sheets = load_sheet_names(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
        }
        debug!(workbook = name, sheets = sheets.len(), "Opened ods workbook");
        Ok(OdsWorkbook {
            name: name.to_owned(),
            zip,
            sheets,
        })
    }
}

impl Workbook for OdsWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.clone()
    }

    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, TypedSheetError> {
        if !self.sheets.iter().any(|name| name == sheet_name) {
            Err(SpreadsheetError::SheetNotFound {
                workbook: self.name.to_owned(),
                sheet: sheet_name.to_owned(),
            })?
        }
        let mut reader = self.zip
            .xml_reader(CONTENT)?
            .ok_or_else(|| SpreadsheetError::FileError(CONTENT.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TABLE => {
                if event.get_attribute_value("table:name")?.is_some_and(|name| name == sheet_name) {
                    break;
                }
            }
        });

        let mut sheet = Sheet::new(sheet_name);
        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut element_context = false; // reading the cell's paragraphs
        let mut comment_context = false; // inside an annotation
        match_xml_events!(reader => {
            Event::End(event) if event.name() == TABLE => break,
            Event::Start(event) if event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if event.name() == TABLE_ROW => {
                row += row_count;
            }
            Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                value.clear();
                col_count = event.parse_attribute_value::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                let value_type = event.get_attribute_value("office:value-type")?;
                kind = match value_type.as_deref() {
                    Some("boolean") => CellType::Boolean,
                    Some("date") => CellType::IsoDateTime,
                    Some("time") => CellType::IsoDuration,
                    Some("string") => if event.get_attribute_value("calcext:value-type")?.is_some_and(|it| it == "error") {
                        CellType::Error
                    } else {
                        CellType::Text
                    },
                    Some(_) => CellType::Number,
                    None => CellType::Empty,
                };
                match value_type.as_deref() {
                    Some("string") => element_context = true,
                    Some("boolean") => {
                        let is_true = event.get_attribute_value("office:boolean-value")?
                            .is_some_and(|it| it != "false" && it != "0");
                        value.push(if is_true { '1' } else { '0' });
                    }
                    Some("date") => if let Some(data) = event.get_attribute_value("office:date-value")? {
                        value.push_str(&data);
                    },
                    Some("time") => if let Some(data) = event.get_attribute_value("office:time-value")? {
                        value.push_str(&data);
                    },
                    Some(_) => if let Some(data) = event.get_attribute_value("office:value")? {
                        value.push_str(&data);
                    },
                    None => (),
                }
            }
            Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                if kind != CellType::Empty && !value.is_empty() {
                    for row_offset in 0..row_count {
                        for col_offset in 0..col_count {
                            sheet.push(Cell {
                                row: row + row_offset,
                                col: col + col_offset,
                                kind,
                                value: value.to_owned(),
                            });
                        }
                    }
                }
                col += col_count;
                element_context = false;
                comment_context = false;
            }
            Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if element_context && !comment_context && event.name() == STRING => {
                let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                for _ in 0..count {
                    value.push(' ');
                }
            }
            Event::Text(event) if element_context && !comment_context => value.push_bytes_text(&event)?,
            Event::GeneralRef(event) if element_context && !comment_context => value.push_bytes_ref(&event)?,
        });
        sheet.finish();
        Ok(sheet)
    }
}

fn load_sheet_names(zip: &mut ZipArchive<SourceReader>) -> Result<Vec<String>, TypedSheetError> {
    let mut reader = zip
        .xml_reader(CONTENT)?
        .ok_or_else(|| SpreadsheetError::FileError(CONTENT.to_owned()))?;
    let mut sheets = Vec::<String>::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TABLE => {
            if let Some(name) = event.get_attribute_value("table:name")? {
                sheets.push(name.into_owned());
            }
        }
    });
    Ok(sheets)
}

/// Validates that the ZIP archive contains a valid ODS file by checking MIME type
fn check_mime(zip: &mut ZipArchive<SourceReader>) -> Result<(), TypedSheetError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Checks the manifest for encryption data on any file entry
fn is_password_protected(zip: &mut ZipArchive<SourceReader>) -> Result<bool, TypedSheetError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = true,
        Event::End(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == QName(b"manifest:encryption-data") => {
            return Ok(true);
        }
    });
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const CONTENT_XML: &str = r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0"><office:body><office:spreadsheet>
        <table:table table:name="Notes"><table:table-row><table:table-cell office:value-type="string"><text:p>skip</text:p></table:table-cell></table:table-row></table:table>
        <table:table table:name="Items">
            <table:table-row><table:table-cell office:value-type="string"><text:p>int32=ID</text:p></table:table-cell><table:table-cell office:value-type="string"><text:p>string=Name</text:p><office:annotation><text:p>comment</text:p></office:annotation></table:table-cell></table:table-row>
            <table:table-row table:number-rows-repeated="2"><table:table-cell table:number-columns-repeated="3"/></table:table-row>
            <table:table-row><table:table-cell office:value-type="float" office:value="3"><text:p>3.00</text:p></table:table-cell><table:table-cell office:value-type="string"><text:p>a<text:s text:c="2"/>b</text:p><text:p>c</text:p></table:table-cell><table:table-cell office:value-type="date" office:date-value="2024-01-01T08:30:00"/><table:table-cell office:value-type="boolean" office:boolean-value="true"/></table:table-row>
        </table:table>
    </office:spreadsheet></office:body></office:document-content>"#;

    fn build(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn workbook() -> OdsWorkbook {
        let mime = std::str::from_utf8(MIME_TYPE).unwrap();
        let bytes = build(&[("mimetype", mime), ("content.xml", CONTENT_XML)]);
        OdsWorkbook::open("Items.ods", SourceReader::from_bytes(bytes)).unwrap()
    }

    fn text(sheet: &Sheet, row: usize, col: usize) -> Option<String> {
        sheet.cell(row, col).map(|cell| cell.text().into_owned())
    }

    #[test]
    fn lists_tables_in_order() {
        assert_eq!(workbook().sheet_names(), vec!["Notes", "Items"]);
    }

    #[test]
    fn reads_named_table() {
        let sheet = workbook().read_sheet("Items").unwrap();
        assert_eq!(text(&sheet, 0, 0).as_deref(), Some("int32=ID"));
        assert_eq!(text(&sheet, 0, 1).as_deref(), Some("string=Name"));
        assert_eq!(text(&sheet, 1, 0), None);
        assert_eq!(text(&sheet, 3, 0).as_deref(), Some("3"));
        assert_eq!(text(&sheet, 3, 1).as_deref(), Some("a  b\nc"));
        assert_eq!(text(&sheet, 3, 2).as_deref(), Some("2024-01-01 08:30:00"));
        assert_eq!(text(&sheet, 3, 3).as_deref(), Some("true"));
        assert_eq!(sheet.row_count(), 4);
    }

    #[test]
    fn rejects_wrong_mime_type() {
        let bytes = build(&[("mimetype", "application/zip"), ("content.xml", CONTENT_XML)]);
        let result = OdsWorkbook::open("Items.ods", SourceReader::from_bytes(bytes));
        assert!(matches!(result, Err(TypedSheetError::OdsError(OdsError::MimeTypeError))));
    }

    #[test]
    fn rejects_encrypted_documents() {
        let mime = std::str::from_utf8(MIME_TYPE).unwrap();
        let manifest = r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0"><manifest:file-entry manifest:full-path="content.xml"><manifest:encryption-data/></manifest:file-entry></manifest:manifest>"#;
        let bytes = build(&[("mimetype", mime), ("META-INF/manifest.xml", manifest), ("content.xml", CONTENT_XML)]);
        let result = OdsWorkbook::open("Secret.ods", SourceReader::from_bytes(bytes));
        assert!(matches!(
            result,
            Err(TypedSheetError::SpreadsheetError(SpreadsheetError::SpreadsheetPasswordProtectedError(_)))
        ));
    }
}

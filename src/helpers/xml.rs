//! XML reading utilities shared by the Office Open XML and OpenDocument readers.

use crate::error::TypedSheetError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// Pull-based XML reader that reuses a single event buffer.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, `None` at end of document.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, TypedSheetError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(TypedSheetError::XmlError(error)),
        }
    }
}

pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value
    fn get_value(&self) -> Result<Cow<'a, str>, TypedSheetError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, TypedSheetError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, TypedSheetError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, TypedSheetError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => XmlError::ParseAttributeValueError(value.to_string()).into(),
                Err(error) => TypedSheetError::StringEncodingError(error),
            })
    }
}

pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by its qualified name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, TypedSheetError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, TypedSheetError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, TypedSheetError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, TypedSheetError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Accumulates cell text from text and entity reference events.
pub(crate) trait XmlTextContextHelper {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), TypedSheetError>;

    /// Appends a resolved entity or character reference (`&amp;`, `&#61;`, `&#x3D;`)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), TypedSheetError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), TypedSheetError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), TypedSheetError> {
        let raw = bytes.xml_content()?;
        push_reference(self, &raw)
    }
}

fn push_reference(text: &mut String, raw: &str) -> Result<(), TypedSheetError> {
    if let Some(number) = raw.strip_prefix('#') {
        let code = if let Some(hex) = number.strip_prefix('x') {
            u32::from_str_radix(hex, 16)?
        } else {
            number.parse::<u32>()?
        };
        if let Some(character) = char::from_u32(code) {
            text.push(character);
        }
    } else if let Some(entity) = resolve_xml_entity(raw) {
        text.push_str(entity);
    } else {
        Err(XmlError::ParseEntityError(raw.to_string()))?;
    }
    Ok(())
}

/// Loops over the events of an `XmlReader`, dispatching to the given match arms
/// and ignoring everything else until end of document.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_character_and_named_references() {
        let mut text = String::from("int32");
        push_reference(&mut text, "#61").unwrap();
        push_reference(&mut text, "#x49").unwrap();
        push_reference(&mut text, "amp").unwrap();
        assert_eq!(text, "int32=I&");
    }

    #[test]
    fn rejects_unknown_entity() {
        let mut text = String::new();
        assert!(push_reference(&mut text, "nbspx").is_err());
    }

    #[test]
    fn reads_attributes_and_text() {
        let xml = br#"<row r="3"><c r="B3" t="inlineStr"><is><t>string=Name</t></is></c></row>"#;
        let mut reader = XmlReader::new(&xml[..]);
        let mut reference = None;
        let mut text = String::new();
        let mut in_text = false;
        while let Some(event) = reader.next().unwrap() {
            match event {
                Event::Start(event) if event.name().as_ref() == b"c" => {
                    reference = event.get_attribute_value("r").unwrap().map(|it| it.to_string());
                }
                Event::Start(event) if event.name().as_ref() == b"t" => in_text = true,
                Event::End(event) if event.name().as_ref() == b"t" => in_text = false,
                Event::Text(event) if in_text => text.push_bytes_text(&event).unwrap(),
                _ => (),
            }
        }
        assert_eq!(reference.as_deref(), Some("B3"));
        assert_eq!(text, "string=Name");
    }
}

use std::io::{Cursor, Read};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::extraction::ExtractionError;

/// Extracts paragraph text from the `word/document.xml` part of a DOCX archive.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Corrupt(format!("Failed to open DOCX: {e}")))?;

    let mut document_xml = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Corrupt(format!("Failed to find document.xml: {e}")))?;

    let mut xml = String::new();
    document_xml.read_to_string(&mut xml)?;

    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<String, ExtractionError> {
    // Whitespace is kept as written. Only text inside <w:t> is collected, so
    // indentation between elements never reaches the output.
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_element = true;
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                // <w:tab/> and <w:br/> separate words inside a paragraph
                if matches!(e.local_name().as_ref(), b"tab" | b"br") {
                    text.push(' ');
                }
            }
            Ok(Event::Text(e)) => {
                if in_text_element {
                    let decoded = e.decode().unwrap_or_default();
                    text.push_str(&decoded);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text_element {
                    if let Ok(Some(ch)) = e.resolve_char_ref() {
                        text.push(ch);
                    } else if let Some(resolved) = e
                        .decode()
                        .ok()
                        .and_then(|name| resolve_predefined_entity(&name))
                    {
                        text.push_str(resolved);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::Corrupt(format!("XML parsing error: {e}")));
            }
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}

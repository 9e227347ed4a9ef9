//! OOXML word-processing text extraction

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Error, Result};

use super::ExtractedDocument;

/// Extracts text and core properties from OOXML word-processing packages.
///
/// The main document body is streamed with an event-driven XML walk, so
/// deeply nested documents cannot overflow the stack. Per element: text runs
/// append their literal text, line breaks append a newline, tabs append a
/// tab, and closing a paragraph appends a paragraph separator. All other
/// containers are transparent.
#[derive(Debug, Default)]
pub struct WordExtractor;

impl WordExtractor {
    pub fn extract(&self, data: &[u8], filename: &str) -> Result<ExtractedDocument> {
        let cursor = Cursor::new(data);
        let mut archive =
            ZipArchive::new(cursor).map_err(|e| Error::extraction(filename, e.to_string()))?;

        // A package without a main document body yields an empty record
        // rather than an error.
        let body_xml = match read_archive_file(&mut archive, "word/document.xml") {
            Ok(Some(xml)) => xml,
            Ok(None) => return Ok(ExtractedDocument::default()),
            Err(e) => return Err(Error::extraction(filename, e)),
        };

        let content = body_to_plain_text(&body_xml)
            .map_err(|e| Error::extraction(filename, e.to_string()))?;

        let mut extracted = ExtractedDocument {
            content,
            ..ExtractedDocument::default()
        };

        // Core properties are optional metadata; ignore a missing or
        // unreadable part.
        if let Ok(Some(core_xml)) = read_archive_file(&mut archive, "docProps/core.xml") {
            read_core_properties(&core_xml, &mut extracted);
        }

        Ok(extracted)
    }
}

/// Read a named file from the package, `None` if absent
fn read_archive_file(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> std::result::Result<Option<String>, String> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };

    let mut xml = String::new();
    file.read_to_string(&mut xml).map_err(|e| e.to_string())?;

    Ok(Some(xml))
}

/// Walk the document body and collect plain text.
///
/// `t` carries literal run text, `br`/`cr` are explicit line breaks, `tab`
/// is a tab stop, and the end of a `p` closes a paragraph.
fn body_to_plain_text(xml: &str) -> quick_xml::Result<String> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = true,
                b"br" | b"cr" => text.push('\n'),
                b"tab" => text.push('\t'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"br" | b"cr" => text.push('\n'),
                b"tab" => text.push('\t'),
                _ => {}
            },
            Event::Text(e) => {
                if in_text_run {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

/// Copy the package core properties (creator, title, subject, created date)
/// into the extracted document.
fn read_core_properties(xml: &str, extracted: &mut ExtractedDocument) {
    #[derive(Clone, Copy)]
    enum CoreField {
        Creator,
        Title,
        Subject,
        Created,
    }

    let mut reader = Reader::from_str(xml);
    let mut current: Option<CoreField> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current = match e.local_name().as_ref() {
                    b"creator" => Some(CoreField::Creator),
                    b"title" => Some(CoreField::Title),
                    b"subject" => Some(CoreField::Subject),
                    b"created" => Some(CoreField::Created),
                    _ => None,
                };
            }
            Ok(Event::Text(e)) => {
                let Some(field) = current else { continue };
                let Ok(value) = e.unescape() else { continue };
                let value = value.into_owned();

                if value.is_empty() {
                    continue;
                }

                match field {
                    CoreField::Creator => {
                        extracted.author = Some(value.clone());
                        extracted.creator = Some(value);
                    }
                    CoreField::Title => extracted.title = Some(value),
                    CoreField::Subject => extracted.subject = Some(value),
                    CoreField::Created => extracted.created_at = Some(value),
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
}

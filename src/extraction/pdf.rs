//! PDF text extraction

use crate::error::{Error, Result};

use super::ExtractedDocument;

/// Extracts text and document information from PDF files.
///
/// Page text is taken in content order and pages are joined with a line
/// break. A structurally invalid PDF surfaces as an extraction error so the
/// enclosing ingestion can roll back, rather than silently indexing an empty
/// document.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn extract(&self, data: &[u8], filename: &str) -> Result<ExtractedDocument> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(data)
            .map_err(|e| Error::extraction(filename, e.to_string()))?;

        let content = pages.join("\n");

        let mut extracted = ExtractedDocument {
            content,
            ..ExtractedDocument::default()
        };

        // The Info dictionary is optional; a PDF without one still indexes.
        if let Err(e) = read_document_information(data, &mut extracted) {
            tracing::debug!(filename, "No readable PDF document information: {}", e);
        }

        Ok(extracted)
    }
}

/// Copy the trailer Info dictionary (author, creator, subject, title,
/// creation date) into the extracted document, when present.
fn read_document_information(
    data: &[u8],
    extracted: &mut ExtractedDocument,
) -> std::result::Result<(), lopdf::Error> {
    let document = lopdf::Document::load_mem(data)?;

    let info = match document.trailer.get(b"Info")? {
        lopdf::Object::Reference(id) => document.get_object(*id)?,
        object => object,
    };
    let info = info.as_dict()?;

    extracted.author = info_string(info, b"Author");
    extracted.creator = info_string(info, b"Creator");
    extracted.subject = info_string(info, b"Subject");
    extracted.title = info_string(info, b"Title");
    extracted.created_at = info_string(info, b"CreationDate");

    Ok(())
}

fn info_string(info: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    let bytes = info.get(key).ok()?.as_str().ok()?;
    let text = decode_pdf_string(bytes);

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// PDF text strings are either UTF-16BE with a byte-order mark or a
/// Latin-1-like single-byte encoding.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let (text, _, _) = encoding_rs::UTF_16BE.decode(&bytes[2..]);
        text.into_owned()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_pdf_is_an_extraction_error() {
        let extractor = PdfExtractor;

        let result = extractor.extract(b"this is not a pdf", "broken.pdf");

        match result {
            Err(Error::Extraction { filename, .. }) => assert_eq!(filename, "broken.pdf"),
            other => panic!("expected extraction error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_pdf_string_utf16be() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_pdf_string(&bytes), "Hi");
    }

    #[test]
    fn test_decode_pdf_string_single_byte() {
        assert_eq!(decode_pdf_string(b"Plain Title"), "Plain Title");
    }
}

//! Plain text extraction with charset sniffing

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

use crate::error::Result;

use super::ExtractedDocument;

/// Decodes plain or encoded text uploads.
///
/// The byte encoding is detected statistically over the whole buffer; a
/// byte-order mark wins outright, and an empty buffer falls back to UTF-8.
/// The decoded text is taken as-is with no further processing and no
/// metadata beyond content.
#[derive(Debug, Default)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn extract(&self, data: &[u8]) -> Result<ExtractedDocument> {
        let encoding = detect_encoding(data);
        let (content, _, _) = encoding.decode(data);

        Ok(ExtractedDocument {
            content: content.into_owned(),
            ..ExtractedDocument::default()
        })
    }
}

fn detect_encoding(data: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(data) {
        return encoding;
    }

    if data.is_empty() {
        return UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(data, true);
    detector.guess(None, true)
}

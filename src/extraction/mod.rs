//! Format-dispatching text extraction
//!
//! Each upload is routed by file extension to a format-specific extractor
//! that turns the raw bytes into plain text plus whatever document-level
//! metadata the format carries. Unregistered extensions degrade to an empty
//! content record so the document stays discoverable by title.

mod pdf;
mod text;
mod word;

pub use pdf::PdfExtractor;
pub use text::TextExtractor;
pub use word::WordExtractor;

use std::collections::HashMap;

use crate::error::Result;

/// Plain text and metadata extracted from an uploaded file.
///
/// `content` is always present; an empty string is a valid result for
/// content the extractor cannot represent as text. Metadata fields are
/// filled only when the source format carries them.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    /// Extracted plain-text content
    pub content: String,
    /// Document-level title, if the format carries one
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Creating application or creator name
    pub creator: Option<String>,
    /// Creation timestamp, verbatim from the source metadata
    pub created_at: Option<String>,
}

/// A registered extractor variant
#[derive(Debug)]
pub enum Extractor {
    Pdf(PdfExtractor),
    Word(WordExtractor),
    Text(TextExtractor),
}

impl Extractor {
    /// File extensions handled by this extractor, with the leading dot,
    /// lower-case.
    pub fn supported_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Pdf(_) => &[".pdf"],
            Self::Word(_) => &[".docx"],
            Self::Text(_) => &[".txt", ".htm", ".html", ".md"],
        }
    }

    /// Extract text and metadata from the raw bytes
    pub fn extract(&self, data: &[u8], filename: &str) -> Result<ExtractedDocument> {
        match self {
            Self::Pdf(extractor) => extractor.extract(data, filename),
            Self::Word(extractor) => extractor.extract(data, filename),
            Self::Text(extractor) => extractor.extract(data),
        }
    }
}

/// Extension-keyed extractor registry, built once at startup.
pub struct ExtractorRegistry {
    extractors: Vec<Extractor>,
    by_extension: HashMap<&'static str, usize>,
}

impl ExtractorRegistry {
    /// Build a registry from a fixed set of extractors
    pub fn new(extractors: Vec<Extractor>) -> Self {
        let mut by_extension = HashMap::new();
        for (index, extractor) in extractors.iter().enumerate() {
            for extension in extractor.supported_extensions() {
                by_extension.insert(*extension, index);
            }
        }

        Self {
            extractors,
            by_extension,
        }
    }

    /// Registry with all built-in extractors
    pub fn with_default_extractors() -> Self {
        Self::new(vec![
            Extractor::Pdf(PdfExtractor),
            Extractor::Word(WordExtractor),
            Extractor::Text(TextExtractor),
        ])
    }

    /// Extract content for an upload, dispatching on the filename's
    /// extension.
    ///
    /// The extension is taken verbatim from the filename (no case
    /// normalization), so `.PDF` does not match the `.pdf` extractor. When no
    /// extractor is registered for the extension the result carries the
    /// supplied title and empty content rather than an error.
    pub fn extract(&self, title: &str, filename: &str, data: &[u8]) -> Result<ExtractedDocument> {
        let extension = file_extension(filename);

        let extractor = extension.and_then(|ext| self.by_extension.get(ext));

        match extractor {
            Some(&index) => self.extractors[index].extract(data, filename),
            None => {
                tracing::debug!(
                    filename,
                    "No extractor registered for extension, indexing title only"
                );
                Ok(ExtractedDocument {
                    title: Some(title.to_string()),
                    ..ExtractedDocument::default()
                })
            }
        }
    }
}

/// The filename's extension including the leading dot, verbatim
fn file_extension(filename: &str) -> Option<&str> {
    filename.rfind('.').map(|index| &filename[index..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.pdf"), Some(".pdf"));
        assert_eq!(file_extension("archive.tar.gz"), Some(".gz"));
        assert_eq!(file_extension("README"), None);
    }

    #[test]
    fn test_unknown_extension_returns_title_only() {
        let registry = ExtractorRegistry::with_default_extractors();

        let extracted = registry
            .extract("Quarterly Report", "report.xyz", b"binary junk")
            .unwrap();

        assert_eq!(extracted.content, "");
        assert_eq!(extracted.title.as_deref(), Some("Quarterly Report"));
    }

    #[test]
    fn test_extension_lookup_is_case_sensitive() {
        let registry = ExtractorRegistry::with_default_extractors();

        // ".TXT" is not registered, so the upload degrades to title-only
        // instead of hitting the text extractor.
        let extracted = registry
            .extract("Notes", "NOTES.TXT", b"some text")
            .unwrap();

        assert_eq!(extracted.content, "");
        assert_eq!(extracted.title.as_deref(), Some("Notes"));
    }

    #[test]
    fn test_text_dispatch() {
        let registry = ExtractorRegistry::with_default_extractors();

        let extracted = registry
            .extract("Notes", "notes.txt", b"hello world")
            .unwrap();

        assert_eq!(extracted.content, "hello world");
    }
}

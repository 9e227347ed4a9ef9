//! Ingestion facade over the search database
//!
//! The service owns the extractor registry and exposes the operations the
//! upload layer calls: atomic document creation, full reset and raw file
//! download.

use std::sync::Arc;

use crate::error::Result;
use crate::extraction::ExtractorRegistry;
use crate::storage::{NewDocument, SearchDb};
use crate::types::document::{Document, FileInfo};

/// Fallback content type when the filename extension is unknown
const OCTET_STREAM: &str = "application/octet-stream";

/// Document ingestion and file access
pub struct DocumentService {
    db: Arc<SearchDb>,
    extractors: Arc<ExtractorRegistry>,
}

impl DocumentService {
    pub fn new(db: Arc<SearchDb>, extractors: Arc<ExtractorRegistry>) -> Self {
        Self { db, extractors }
    }

    /// Ingest an uploaded document.
    ///
    /// Inserts the document, find-or-creates the supplied suggestion and
    /// keyword names with their links, extracts the plain text and writes
    /// the full-text shadow row, all inside one transaction. Nothing is
    /// visible to readers until commit.
    pub fn create_document(
        &self,
        title: &str,
        filename: &str,
        data: &[u8],
        suggestions: Option<&[String]>,
        keywords: Option<&[String]>,
        last_edited_by: i64,
    ) -> Result<Document> {
        self.db.create_document(
            NewDocument {
                title,
                filename,
                data,
                suggestions,
                keywords,
                last_edited_by,
            },
            &self.extractors,
        )
    }

    /// Delete every document, vocabulary entry, link and shadow index row
    pub fn delete_all_documents(&self) -> Result<()> {
        self.db.delete_all_documents()
    }

    /// Raw file bytes plus a best-effort content-type guess, for download
    pub fn get_file_info(&self, document_id: i64) -> Result<FileInfo> {
        let (filename, data) = self.db.get_file(document_id)?;
        let content_type = content_type_for(&filename);

        Ok(FileInfo {
            filename,
            content_type,
            data,
        })
    }
}

/// Guess the content type from the filename extension, defaulting to a
/// generic binary type.
fn content_type_for(filename: &str) -> String {
    if filename.trim().is_empty() {
        return OCTET_STREAM.to_string();
    }

    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

//! Persisted entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded document with its raw payload and audit fields.
///
/// Owned exclusively by the ingestion path. Immutable once written, except
/// for the `indexed_at` timestamp stamped when the shadow index row is
/// created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Row id, assigned on insert
    pub id: i64,
    /// Display title
    pub title: String,
    /// Original filename of the upload
    pub filename: String,
    /// Raw byte payload
    #[serde(skip_serializing)]
    pub data: Vec<u8>,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
    /// When the full-text shadow row was written
    pub indexed_at: Option<DateTime<Utc>>,
    /// User id of the last editor
    pub last_edited_by: i64,
    /// Optimistic concurrency version
    pub row_version: i64,
    /// Validity window start
    pub valid_from: DateTime<Utc>,
    /// Validity window end
    pub valid_to: Option<DateTime<Utc>>,
}

/// A keyword vocabulary entry, uniqued by exact name.
///
/// Created lazily on first use by any document; never deleted individually,
/// only bulk-wiped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub id: i64,
    pub name: String,
    pub last_edited_by: i64,
    pub row_version: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

/// A suggestion vocabulary entry, uniqued by exact name.
///
/// Unlike keywords, each suggestion carries a shadow row in the suggestion
/// full-text index so it can be served by autocomplete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: i64,
    pub name: String,
    pub last_edited_by: i64,
    pub row_version: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

/// Raw file content for download, with a best-effort content-type guess
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

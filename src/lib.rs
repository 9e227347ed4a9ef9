//! docsearch: full-text document search over SQLite FTS5
//!
//! This crate ingests uploaded files of heterogeneous formats (PDF, OOXML
//! word-processing documents, plain text), extracts plain text and metadata,
//! stores documents in SQLite with an attached FTS5 shadow index, and answers
//! ranked search and autocomplete-suggestion queries with highlighted
//! snippets. HTTP routing, authentication and presentation are left to the
//! embedding application.

pub mod config;
pub mod error;
pub mod extraction;
pub mod ingestion;
pub mod processing;
pub mod search;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use extraction::{ExtractedDocument, ExtractorRegistry};
pub use ingestion::DocumentService;
pub use processing::{spawn_workers, IngestJob, IngestQueue};
pub use search::SearchEngine;
pub use storage::SearchDb;
pub use types::{
    document::{Document, FileInfo, Keyword, Suggestion},
    response::{SearchResult, SearchResults, SearchSuggestion, SearchSuggestions},
};

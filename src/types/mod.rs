//! Core data types

pub mod document;
pub mod response;

pub use document::{Document, FileInfo, Keyword, Suggestion};
pub use response::{SearchResult, SearchResults, SearchSuggestion, SearchSuggestions};

//! Response envelopes for search and suggest queries

use serde::{Deserialize, Serialize};

/// Paginated result envelope for a document search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// The raw query as supplied by the caller
    pub query: String,
    /// Pagination offset
    pub from: u32,
    /// Page size
    pub size: u32,
    /// Full ranked-hit count, independent of the requested page
    pub total: u64,
    /// Wall-clock time for retrieval and hydration
    pub took_in_milliseconds: u64,
    /// The requested page of hits, best rank first
    pub results: Vec<SearchResult>,
}

/// A single ranked document hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: i64,
    pub title: String,
    pub filename: String,
    /// Names of the keywords linked to the document
    pub keywords: Vec<String>,
    /// Highlighted snippets with sentinel markers around matched terms
    pub matches: Vec<String>,
    /// Resource link for downloading the raw document
    pub url: String,
}

/// Result envelope for an autocomplete-suggestion query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSuggestions {
    pub query: String,
    pub took_in_milliseconds: u64,
    pub results: Vec<SearchSuggestion>,
}

/// A single suggestion hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSuggestion {
    pub suggestion_id: i64,
    pub name: String,
    /// Suggestion name with sentinel markers around matched terms
    pub highlight: String,
}

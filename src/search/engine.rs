//! Query execution against the full-text indexes
//!
//! Builds escaped FTS5 match expressions, runs ranked retrieval with
//! snippet/highlight extraction, hydrates keywords per hit and assembles the
//! paginated result envelopes.

use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::storage::SearchDb;
use crate::types::response::{SearchResult, SearchResults, SearchSuggestion, SearchSuggestions};

use super::HIGHLIGHT_START_TAG;

/// Ranked search over the document and suggestion indexes
pub struct SearchEngine {
    db: Arc<SearchDb>,
    base_url: String,
}

impl SearchEngine {
    pub fn new(db: Arc<SearchDb>, config: &AppConfig) -> Self {
        Self {
            db,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Ranked document search with SQL-level pagination.
    ///
    /// `total` is the full ranked-hit count independent of the requested
    /// page; `took_in_milliseconds` covers retrieval and hydration. An
    /// empty or whitespace-only query is rejected before any store
    /// round-trip.
    pub fn search(&self, query: &str, from: u32, size: u32) -> Result<SearchResults> {
        if query.trim().is_empty() {
            return Err(Error::invalid_query("Query must not be empty"));
        }

        let match_expression = document_match_expression(query);

        let started = Instant::now();

        let total = self.db.count_document_matches(&match_expression)?;
        let matches = self.db.search_documents(&match_expression, size, from)?;

        let document_ids: Vec<i64> = matches.iter().map(|m| m.document_id).collect();
        let mut keywords_by_document = self.db.keywords_for_documents(&document_ids)?;

        let took_in_milliseconds = started.elapsed().as_millis() as u64;

        let results = matches
            .into_iter()
            .map(|m| {
                let keywords = keywords_by_document
                    .remove(&m.document_id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|keyword| keyword.name)
                    .collect();

                // The content snippet is always reported; the title snippet
                // only when the title actually matched.
                let mut snippets = Vec::with_capacity(2);
                if m.match_title.contains(HIGHLIGHT_START_TAG) {
                    snippets.push(m.match_title);
                }
                snippets.push(m.match_content);

                SearchResult {
                    url: format!("{}/raw/{}", self.base_url, m.document_id),
                    document_id: m.document_id,
                    title: m.title,
                    filename: m.filename,
                    keywords,
                    matches: snippets,
                }
            })
            .collect();

        tracing::debug!(query, total, took_in_milliseconds, "Search executed");

        Ok(SearchResults {
            query: query.to_string(),
            from,
            size,
            total,
            took_in_milliseconds,
            results,
        })
    }

    /// Ranked autocomplete over the suggestion-name index only
    pub fn suggest(&self, query: &str) -> Result<SearchSuggestions> {
        if query.trim().is_empty() {
            return Err(Error::invalid_query("Query must not be empty"));
        }

        let match_expression = suggestion_match_expression(query);

        let started = Instant::now();

        let matches = self.db.search_suggestions(&match_expression)?;

        let took_in_milliseconds = started.elapsed().as_millis() as u64;

        let results = matches
            .into_iter()
            .map(|m| SearchSuggestion {
                suggestion_id: m.suggestion_id,
                name: m.name,
                highlight: m.highlight,
            })
            .collect();

        tracing::debug!(query, took_in_milliseconds, "Suggest executed");

        Ok(SearchSuggestions {
            query: query.to_string(),
            took_in_milliseconds,
            results,
        })
    }
}

/// Quote the whole input as a single FTS5 phrase, doubling embedded quotes,
/// so no user-controlled metacharacter reaches the match expression. The
/// trailing `*` turns the final token into a prefix match.
fn escape_phrase(query: &str) -> String {
    query.replace('"', "\"\"")
}

/// Match expression for the document index, scoped to title and content
fn document_match_expression(query: &str) -> String {
    format!("{{title content}} : \"{}\"*", escape_phrase(query))
}

/// Match expression for the single-column suggestion index
fn suggestion_match_expression(query: &str) -> String {
    format!("\"{}\"*", escape_phrase(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExtractorRegistry;
    use crate::storage::NewDocument;

    fn test_engine() -> (SearchEngine, Arc<SearchDb>, ExtractorRegistry) {
        let db = Arc::new(SearchDb::in_memory().unwrap());
        let config = AppConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..AppConfig::default()
        };
        let engine = SearchEngine::new(Arc::clone(&db), &config);
        (engine, db, ExtractorRegistry::with_default_extractors())
    }

    fn ingest_text(
        db: &SearchDb,
        extractors: &ExtractorRegistry,
        title: &str,
        filename: &str,
        content: &[u8],
        keywords: Option<&[String]>,
        suggestions: Option<&[String]>,
    ) -> i64 {
        db.create_document(
            NewDocument {
                title,
                filename,
                data: content,
                suggestions,
                keywords,
                last_edited_by: 1,
            },
            extractors,
        )
        .unwrap()
        .id
    }

    #[test]
    fn test_search_returns_highlighted_hit() {
        let (engine, db, extractors) = test_engine();
        let keywords = vec!["greeting".to_string()];

        let id = ingest_text(
            &db,
            &extractors,
            "Hello Document",
            "hello.txt",
            b"hello world",
            Some(&keywords),
            None,
        );

        let results = engine.search("hello", 0, 10).unwrap();

        assert_eq!(results.total, 1);
        assert_eq!(results.results.len(), 1);

        let hit = &results.results[0];
        assert_eq!(hit.document_id, id);
        assert_eq!(hit.filename, "hello.txt");
        assert_eq!(hit.keywords, ["greeting"]);
        assert_eq!(hit.url, format!("http://localhost:8080/raw/{id}"));
        assert!(hit
            .matches
            .iter()
            .any(|m| m.contains("match→hello←match")));
    }

    #[test]
    fn test_prefix_matching() {
        let (engine, db, extractors) = test_engine();

        ingest_text(
            &db,
            &extractors,
            "Hello Document",
            "hello.txt",
            b"hello world",
            None,
            None,
        );

        let results = engine.search("hel", 0, 10).unwrap();

        assert_eq!(results.total, 1);
    }

    #[test]
    fn test_empty_query_is_a_validation_error() {
        let (engine, _db, _extractors) = test_engine();

        assert!(matches!(
            engine.search("", 0, 10),
            Err(Error::InvalidQuery(_))
        ));
        assert!(matches!(
            engine.search("   \t", 0, 10),
            Err(Error::InvalidQuery(_))
        ));
        assert!(matches!(engine.suggest(""), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_zero_hits_still_reports_envelope() {
        let (engine, _db, _extractors) = test_engine();

        let results = engine.search("nothing", 2, 5).unwrap();

        assert_eq!(results.total, 0);
        assert!(results.results.is_empty());
        assert_eq!(results.from, 2);
        assert_eq!(results.size, 5);
    }

    #[test]
    fn test_pagination_pages_cover_all_hits() {
        let (engine, db, extractors) = test_engine();

        for i in 0..5 {
            ingest_text(
                &db,
                &extractors,
                &format!("Doc {i}"),
                &format!("doc{i}.txt"),
                b"shared token inside",
                None,
                None,
            );
        }

        let page = engine.search("shared", 2, 2).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.results.len(), 2);

        // Consecutive pages are disjoint and cover the full ranked set.
        let mut seen = std::collections::HashSet::new();
        for from in [0, 2, 4] {
            for hit in engine.search("shared", from, 2).unwrap().results {
                assert!(seen.insert(hit.document_id));
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_offset_past_result_count_is_empty() {
        let (engine, db, extractors) = test_engine();

        ingest_text(
            &db,
            &extractors,
            "Solo",
            "solo.txt",
            b"only hit",
            None,
            None,
        );

        let results = engine.search("only", 10, 10).unwrap();

        assert_eq!(results.total, 1);
        assert!(results.results.is_empty());
    }

    #[test]
    fn test_search_after_delete_all_is_empty() {
        let (engine, db, extractors) = test_engine();

        ingest_text(
            &db,
            &extractors,
            "Gone",
            "gone.txt",
            b"ephemeral content",
            None,
            None,
        );
        assert_eq!(engine.search("ephemeral", 0, 10).unwrap().total, 1);

        db.delete_all_documents().unwrap();

        assert_eq!(engine.search("ephemeral", 0, 10).unwrap().total, 0);
    }

    #[test]
    fn test_suggest_ignores_keyword_vocabulary() {
        let (engine, db, extractors) = test_engine();
        let keywords = vec!["rustlang".to_string()];

        ingest_text(
            &db,
            &extractors,
            "Keyworded",
            "kw.txt",
            b"content",
            Some(&keywords),
            None,
        );

        let suggestions = engine.suggest("rustlang").unwrap();

        assert!(suggestions.results.is_empty());
    }

    #[test]
    fn test_suggest_returns_highlighted_names() {
        let (engine, db, extractors) = test_engine();
        let suggestions = vec!["OpenCV".to_string()];

        ingest_text(
            &db,
            &extractors,
            "Vision",
            "vision.txt",
            b"computer vision",
            None,
            Some(&suggestions),
        );

        let response = engine.suggest("open").unwrap();

        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].name, "OpenCV");
        assert!(response.results[0].highlight.contains("match→"));
    }

    #[test]
    fn test_title_match_adds_title_snippet() {
        let (engine, db, extractors) = test_engine();

        ingest_text(
            &db,
            &extractors,
            "Unique Heading",
            "body.txt",
            b"ordinary body text",
            None,
            None,
        );

        let results = engine.search("heading", 0, 10).unwrap();

        let hit = &results.results[0];
        assert_eq!(hit.matches.len(), 2);
        assert!(hit.matches[0].contains("match→Heading←match"));
    }

    #[test]
    fn test_match_expression_quote_count_is_even() {
        for input in [
            "plain",
            "with \"quotes\"",
            "\"",
            "\"\"\"",
            "{title content} : injection",
            "end with star *",
        ] {
            for expression in [
                document_match_expression(input),
                suggestion_match_expression(input),
            ] {
                let quotes = expression.matches('"').count();
                assert_eq!(quotes % 2, 0, "odd quote count in {expression:?}");
            }
        }
    }

    #[test]
    fn test_quoted_query_cannot_escape_the_phrase() {
        let (engine, db, extractors) = test_engine();

        ingest_text(
            &db,
            &extractors,
            "Target",
            "target.txt",
            b"sensitive content",
            None,
            None,
        );

        // Metacharacters are neutralized; the query runs as one literal
        // phrase and simply finds nothing.
        let results = engine
            .search("content\" OR {title content} : \"sensitive", 0, 10)
            .unwrap();

        assert_eq!(results.total, 0);
    }
}

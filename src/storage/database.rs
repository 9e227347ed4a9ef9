//! SQLite database for documents, vocabularies and the FTS5 shadow index
//!
//! Every mutation runs inside one transaction on a single writer connection;
//! a document and its shadow index row are created and deleted together.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::extraction::ExtractorRegistry;
use crate::search::{HIGHLIGHT_END_TAG, HIGHLIGHT_START_TAG, SNIPPET_MAX_TOKENS};
use crate::types::document::{Document, Keyword};

/// A new document to ingest
#[derive(Debug, Clone, Copy)]
pub struct NewDocument<'a> {
    pub title: &'a str,
    pub filename: &'a str,
    pub data: &'a [u8],
    pub suggestions: Option<&'a [String]>,
    pub keywords: Option<&'a [String]>,
    pub last_edited_by: i64,
}

/// A ranked row from the document index with its highlighted snippets
#[derive(Debug, Clone)]
pub struct DocumentMatch {
    pub document_id: i64,
    pub title: String,
    pub filename: String,
    pub match_title: String,
    pub match_content: String,
}

/// A ranked row from the suggestion index
#[derive(Debug, Clone)]
pub struct SuggestionMatch {
    pub suggestion_id: i64,
    pub name: String,
    pub highlight: String,
}

/// SQLite-backed document search database
pub struct SearchDb {
    conn: Arc<Mutex<Connection>>,
}

impl SearchDb {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // WAL keeps readers unblocked while an ingestion transaction runs
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
        "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS document (
                document_id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                filename TEXT NOT NULL,
                data BLOB NOT NULL,
                uploaded_at TEXT NOT NULL,
                indexed_at TEXT,
                last_edited_by INTEGER NOT NULL,
                row_version INTEGER NOT NULL DEFAULT 1,
                valid_from TEXT NOT NULL,
                valid_to TEXT
            );

            -- Vocabulary names are uniqued by find-or-create inside the
            -- ingestion transaction, not by a UNIQUE constraint.
            CREATE TABLE IF NOT EXISTS keyword (
                keyword_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                last_edited_by INTEGER NOT NULL,
                row_version INTEGER NOT NULL DEFAULT 1,
                valid_from TEXT NOT NULL,
                valid_to TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_keyword_name ON keyword(name);

            CREATE TABLE IF NOT EXISTS suggestion (
                suggestion_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                last_edited_by INTEGER NOT NULL,
                row_version INTEGER NOT NULL DEFAULT 1,
                valid_from TEXT NOT NULL,
                valid_to TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_suggestion_name ON suggestion(name);

            CREATE TABLE IF NOT EXISTS document_keyword (
                document_keyword_id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL REFERENCES document(document_id),
                keyword_id INTEGER NOT NULL REFERENCES keyword(keyword_id),
                last_edited_by INTEGER NOT NULL,
                row_version INTEGER NOT NULL DEFAULT 1,
                valid_from TEXT NOT NULL,
                valid_to TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_document_keyword_document_id
                ON document_keyword(document_id);

            CREATE TABLE IF NOT EXISTS document_suggestion (
                document_suggestion_id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL REFERENCES document(document_id),
                suggestion_id INTEGER NOT NULL REFERENCES suggestion(suggestion_id),
                last_edited_by INTEGER NOT NULL,
                row_version INTEGER NOT NULL DEFAULT 1,
                valid_from TEXT NOT NULL,
                valid_to TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_document_suggestion_document_id
                ON document_suggestion(document_id);

            -- Full-text shadow tables. Row ids are pinned to the owning
            -- entity's primary key.
            CREATE VIRTUAL TABLE IF NOT EXISTS fts_document USING fts5(title, content);

            CREATE VIRTUAL TABLE IF NOT EXISTS fts_suggestion USING fts5(name);
        "#,
        )?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    // ==================== Ingestion Operations ====================

    /// Insert a document, its vocabulary links and its full-text shadow row
    /// as one atomic transaction.
    ///
    /// Extraction runs inside the transaction: a failure rolls everything
    /// back, so a document row never exists without its shadow index row.
    pub fn create_document(
        &self,
        new: NewDocument<'_>,
        extractors: &ExtractorRegistry,
    ) -> Result<Document> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let now = Utc::now();
        let now_str = now.to_rfc3339();

        tx.execute(
            r#"
            INSERT INTO document (title, filename, data, uploaded_at, last_edited_by, row_version, valid_from)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            "#,
            params![
                new.title,
                new.filename,
                new.data,
                &now_str,
                new.last_edited_by,
                &now_str
            ],
        )?;
        let document_id = tx.last_insert_rowid();

        if let Some(suggestions) = new.suggestions {
            for name in unique_names(suggestions) {
                let suggestion_id = match find_suggestion_id(&tx, name)? {
                    Some(id) => id,
                    None => {
                        tx.execute(
                            r#"
                            INSERT INTO suggestion (name, last_edited_by, row_version, valid_from)
                            VALUES (?1, ?2, 1, ?3)
                            "#,
                            params![name, new.last_edited_by, &now_str],
                        )?;
                        let id = tx.last_insert_rowid();

                        tx.execute(
                            "INSERT INTO fts_suggestion (rowid, name) VALUES (?1, ?2)",
                            params![id, name],
                        )?;

                        id
                    }
                };

                link_suggestion(&tx, document_id, suggestion_id, new.last_edited_by, &now_str)?;
            }
        }

        if let Some(keywords) = new.keywords {
            for name in unique_names(keywords) {
                let keyword_id = match find_keyword_id(&tx, name)? {
                    Some(id) => id,
                    None => {
                        tx.execute(
                            r#"
                            INSERT INTO keyword (name, last_edited_by, row_version, valid_from)
                            VALUES (?1, ?2, 1, ?3)
                            "#,
                            params![name, new.last_edited_by, &now_str],
                        )?;
                        tx.last_insert_rowid()
                    }
                };

                link_keyword(&tx, document_id, keyword_id, new.last_edited_by, &now_str)?;
            }
        }

        // Extraction failure aborts the whole transaction.
        let extracted = extractors.extract(new.title, new.filename, new.data)?;

        tx.execute(
            "INSERT INTO fts_document (rowid, title, content) VALUES (?1, ?2, ?3)",
            params![document_id, new.title, extracted.content],
        )?;

        tx.execute(
            "UPDATE document SET indexed_at = ?1 WHERE document_id = ?2",
            params![&now_str, document_id],
        )?;

        tx.commit()?;

        tracing::info!(
            document_id,
            filename = new.filename,
            content_chars = extracted.content.len(),
            "Document ingested"
        );

        Ok(Document {
            id: document_id,
            title: new.title.to_string(),
            filename: new.filename.to_string(),
            data: new.data.to_vec(),
            uploaded_at: now,
            indexed_at: Some(now),
            last_edited_by: new.last_edited_by,
            row_version: 1,
            valid_from: now,
            valid_to: None,
        })
    }

    /// Wipe all documents, vocabularies, links and shadow index rows in one
    /// transaction.
    pub fn delete_all_documents(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute_batch(
            r#"
            DELETE FROM document_keyword;
            DELETE FROM document_suggestion;
            DELETE FROM document;
            DELETE FROM keyword;
            DELETE FROM suggestion;
            DELETE FROM fts_document;
            DELETE FROM fts_suggestion;
        "#,
        )?;

        tx.commit()?;

        tracing::info!("All documents deleted");
        Ok(())
    }

    /// Fetch a document's filename and raw bytes, or a not-found error
    pub fn get_file(&self, document_id: i64) -> Result<(String, Vec<u8>)> {
        let conn = self.conn.lock();

        conn.query_row(
            "SELECT filename, data FROM document WHERE document_id = ?1",
            params![document_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)),
        )
        .optional()?
        .ok_or_else(|| Error::document_not_found(document_id))
    }

    // ==================== Query Operations ====================

    /// Count all rows matching the expression, independent of pagination
    pub fn count_document_matches(&self, match_expression: &str) -> Result<u64> {
        let conn = self.conn.lock();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM fts_document WHERE fts_document MATCH ?1",
            params![match_expression],
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }

    /// Ranked retrieval over the document index, best rank first, with two
    /// highlighted snippet windows per row. Pagination is pushed into SQL.
    pub fn search_documents(
        &self,
        match_expression: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DocumentMatch>> {
        let conn = self.conn.lock();

        let sql = format!(
            r#"
            SELECT d.document_id, d.title, d.filename,
                snippet(fts_document, 0, '{start}', '{end}', '', {tokens}) AS match_title,
                snippet(fts_document, 1, '{start}', '{end}', '', {tokens}) AS match_content
            FROM fts_document
                INNER JOIN document d ON d.document_id = fts_document.rowid
            WHERE fts_document MATCH ?1
            ORDER BY rank
            LIMIT ?2 OFFSET ?3
            "#,
            start = HIGHLIGHT_START_TAG,
            end = HIGHLIGHT_END_TAG,
            tokens = SNIPPET_MAX_TOKENS,
        );

        let mut stmt = conn.prepare(&sql)?;

        let matches = stmt
            .query_map(params![match_expression, limit, offset], |row| {
                Ok(DocumentMatch {
                    document_id: row.get(0)?,
                    title: row.get(1)?,
                    filename: row.get(2)?,
                    match_title: row.get(3)?,
                    match_content: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(matches)
    }

    /// Batched keyword hydration for a page of hits, keyed by document id
    pub fn keywords_for_documents(
        &self,
        document_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Keyword>>> {
        let mut keywords_by_document: HashMap<i64, Vec<Keyword>> = HashMap::new();

        if document_ids.is_empty() {
            return Ok(keywords_by_document);
        }

        let conn = self.conn.lock();

        let placeholders = vec!["?"; document_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT dk.document_id, k.keyword_id, k.name, k.last_edited_by,
                   k.row_version, k.valid_from, k.valid_to
            FROM document_keyword dk
                INNER JOIN keyword k ON k.keyword_id = dk.keyword_id
            WHERE dk.document_id IN ({placeholders})
            ORDER BY k.name
            "#,
        );

        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(params_from_iter(document_ids.iter()), |row| {
            let document_id: i64 = row.get(0)?;
            let valid_from: String = row.get(5)?;
            let valid_to: Option<String> = row.get(6)?;

            Ok((
                document_id,
                Keyword {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    last_edited_by: row.get(3)?,
                    row_version: row.get(4)?,
                    valid_from: parse_timestamp(&valid_from),
                    valid_to: valid_to.as_deref().map(parse_timestamp),
                },
            ))
        })?;

        for row in rows {
            let (document_id, keyword) = row?;
            keywords_by_document
                .entry(document_id)
                .or_default()
                .push(keyword);
        }

        Ok(keywords_by_document)
    }

    /// Ranked retrieval over the suggestion index with one highlighted field
    /// per hit
    pub fn search_suggestions(&self, match_expression: &str) -> Result<Vec<SuggestionMatch>> {
        let conn = self.conn.lock();

        let sql = format!(
            r#"
            SELECT s.suggestion_id, s.name,
                highlight(fts_suggestion, 0, '{start}', '{end}') AS highlight
            FROM fts_suggestion
                INNER JOIN suggestion s ON s.suggestion_id = fts_suggestion.rowid
            WHERE fts_suggestion MATCH ?1
            ORDER BY rank
            "#,
            start = HIGHLIGHT_START_TAG,
            end = HIGHLIGHT_END_TAG,
        );

        let mut stmt = conn.prepare(&sql)?;

        let matches = stmt
            .query_map(params![match_expression], |row| {
                Ok(SuggestionMatch {
                    suggestion_id: row.get(0)?,
                    name: row.get(1)?,
                    highlight: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(matches)
    }

    #[cfg(test)]
    pub fn count_rows(&self, table: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }
}

// Helper functions

/// Dedupe supplied vocabulary names, preserving order, so a repeated name in
/// one upload cannot produce duplicate join rows.
fn unique_names(names: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(String::as_str)
        .filter(|name| seen.insert(*name))
        .collect()
}

fn find_suggestion_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT suggestion_id FROM suggestion WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn find_keyword_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT keyword_id FROM keyword WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn link_suggestion(
    conn: &Connection,
    document_id: i64,
    suggestion_id: i64,
    last_edited_by: i64,
    now: &str,
) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row(
            r#"
            SELECT document_suggestion_id FROM document_suggestion
            WHERE document_id = ?1 AND suggestion_id = ?2
            "#,
            params![document_id, suggestion_id],
            |row| row.get(0),
        )
        .optional()?;

    if existing.is_none() {
        conn.execute(
            r#"
            INSERT INTO document_suggestion (document_id, suggestion_id, last_edited_by, row_version, valid_from)
            VALUES (?1, ?2, ?3, 1, ?4)
            "#,
            params![document_id, suggestion_id, last_edited_by, now],
        )?;
    }

    Ok(())
}

fn link_keyword(
    conn: &Connection,
    document_id: i64,
    keyword_id: i64,
    last_edited_by: i64,
    now: &str,
) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row(
            r#"
            SELECT document_keyword_id FROM document_keyword
            WHERE document_id = ?1 AND keyword_id = ?2
            "#,
            params![document_id, keyword_id],
            |row| row.get(0),
        )
        .optional()?;

    if existing.is_none() {
        conn.execute(
            r#"
            INSERT INTO document_keyword (document_id, keyword_id, last_edited_by, row_version, valid_from)
            VALUES (?1, ?2, ?3, 1, ?4)
            "#,
            params![document_id, keyword_id, last_edited_by, now],
        )?;
    }

    Ok(())
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

//! SQLite persistence with the FTS5 shadow index

mod database;

pub use database::{DocumentMatch, NewDocument, SearchDb, SuggestionMatch};

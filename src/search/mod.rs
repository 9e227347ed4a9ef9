//! Ranked full-text query and suggestion engines

mod engine;

pub use engine::SearchEngine;

/// Sentinel inserted before a matched term in snippets and highlights.
/// Distinguishable from ordinary document text.
pub const HIGHLIGHT_START_TAG: &str = "match→";

/// Sentinel inserted after a matched term
pub const HIGHLIGHT_END_TAG: &str = "←match";

/// Upper bound, in tokens, for each snippet window
pub const SNIPPET_MAX_TOKENS: u32 = 32;

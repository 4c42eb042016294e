//! Text preprocessing shared by the strategies.
//!
//! Dense input preparation:
//! 1. Collapse whitespace runs to a single space and trim
//! 2. Skip if empty
//! 3. Split into consecutive windows of `chunk_words` words
//! 4. Keep at most `max_chunks` windows

use serde::{Deserialize, Serialize};

/// Default window size in words. Stays under 256 model tokens for typical
/// English prose.
pub const DEFAULT_CHUNK_WORDS: usize = 128;

/// Default cap on windows per text; words past the cap are dropped.
pub const DEFAULT_MAX_CHUNKS: usize = 32;

/// How dense strategies cut long texts before embedding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingOptions {
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,

    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_words: DEFAULT_CHUNK_WORDS,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

fn default_chunk_words() -> usize {
    DEFAULT_CHUNK_WORDS
}

fn default_max_chunks() -> usize {
    DEFAULT_MAX_CHUNKS
}

/// Collapse every whitespace run (including newlines from PDF extraction)
/// to a single space and trim both ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split `text` into word windows according to `options`.
///
/// Returns an empty vec when the text has no words.
pub fn chunk_words(text: &str, options: &ChunkingOptions) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return vec![];
    }

    let window = options.chunk_words.max(1);
    let max_chunks = options.max_chunks.max(1);

    let chunks: Vec<String> = words
        .chunks(window)
        .take(max_chunks)
        .map(|chunk| chunk.join(" "))
        .collect();

    if words.len() > window * max_chunks {
        log::debug!(
            "text truncated to {} of {} words ({} windows)",
            window * max_chunks,
            words.len(),
            max_chunks
        );
    }

    chunks
}

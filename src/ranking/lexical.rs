//! Lexical (TF-IDF) vectorization.
//!
//! The vectorizer is fitted on the query plus the whole document batch of a
//! single ranking call, so the vocabulary and IDF weights depend on that
//! batch only. A fresh vectorizer is built on every call; nothing is shared
//! between calls.
//!
//! Weighting:
//! - tf: raw term count, or `1 + ln(count)` with `sublinear_tf`
//! - idf: `ln((1 + n) / (1 + df)) + 1` (smoothed, never zero)
//! - every vector is L2-normalized

use std::collections::{BTreeMap, BTreeSet, HashMap};

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ranking::vector::SparseVector;

/// Runs of word characters
static TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+").expect("Failed to compile token regex"));

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being",
    "in", "on", "at", "to", "for", "of", "with", "by", "from", "as",
    "and", "or", "but", "not", "no", "so", "if", "then", "it", "its",
    "this", "that", "these", "those", "we", "you", "our", "your", "will",
    "has", "have", "had", "can", "should", "would", "also", "such",
];

/// Tokenizer and weighting switches for the lexical strategy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalOptions {
    /// Lowercase text before tokenizing
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,

    /// Tokens shorter than this many characters are dropped
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,

    /// Drop common English stop words
    #[serde(default)]
    pub stop_words: bool,

    /// Use `1 + ln(tf)` instead of raw counts
    #[serde(default)]
    pub sublinear_tf: bool,
}

impl Default for LexicalOptions {
    fn default() -> Self {
        Self {
            lowercase: default_lowercase(),
            min_token_len: default_min_token_len(),
            stop_words: false,
            sublinear_tf: false,
        }
    }
}

fn default_lowercase() -> bool {
    true
}

fn default_min_token_len() -> usize {
    2
}

/// Split text into terms according to `options`.
pub fn tokenize(text: &str, options: &LexicalOptions) -> Vec<String> {
    TOKEN_REGEX
        .find_iter(text)
        .map(|m| {
            if options.lowercase {
                m.as_str().to_lowercase()
            } else {
                m.as_str().to_string()
            }
        })
        .filter(|s| s.chars().count() >= options.min_token_len)
        .filter(|s| !options.stop_words || !STOP_WORDS.contains(&s.to_lowercase().as_str()))
        .collect()
}

/// TF-IDF model fitted on one corpus.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    options: LexicalOptions,
    /// Term -> column, columns assigned in lexicographic term order
    vocabulary: HashMap<String, u32>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Fit vocabulary and IDF weights on `corpus`.
    pub fn fit(options: &LexicalOptions, corpus: &[&str]) -> Self {
        let tokenized: Vec<Vec<String>> = corpus
            .par_iter()
            .map(|text| tokenize(text, options))
            .collect();
        Self::fit_tokens(options, &tokenized)
    }

    fn fit_tokens(options: &LexicalOptions, tokenized: &[Vec<String>]) -> Self {
        let mut document_frequency: BTreeMap<&str, u32> = BTreeMap::new();
        for tokens in tokenized {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let n = tokenized.len() as f32;
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());

        for (column, (term, df)) in document_frequency.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), column as u32);
            idf.push(((1.0 + n) / (1.0 + df as f32)).ln() + 1.0);
        }

        Self {
            options: options.clone(),
            vocabulary,
            idf,
        }
    }

    /// Fit on `[query] + documents` and vectorize all of them.
    pub fn fit_transform(
        options: &LexicalOptions,
        query: &str,
        documents: &[&str],
    ) -> (SparseVector, Vec<SparseVector>) {
        let mut tokenized: Vec<Vec<String>> = Vec::with_capacity(documents.len() + 1);
        tokenized.push(tokenize(query, options));
        tokenized.extend(
            documents
                .par_iter()
                .map(|text| tokenize(text, options))
                .collect::<Vec<_>>(),
        );

        let vectorizer = Self::fit_tokens(options, &tokenized);

        log::debug!(
            "tfidf fitted: {} texts, {} terms",
            tokenized.len(),
            vectorizer.vocabulary_len()
        );

        let query_vector = vectorizer.vectorize_tokens(&tokenized[0]);
        let document_vectors = tokenized[1..]
            .par_iter()
            .map(|tokens| vectorizer.vectorize_tokens(tokens))
            .collect();

        (query_vector, document_vectors)
    }

    /// Vectorize a text with the fitted vocabulary. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.vectorize_tokens(&tokenize(text, &self.options))
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }

    /// Column of a term, if it is in the vocabulary.
    pub fn column(&self, term: &str) -> Option<u32> {
        self.vocabulary.get(term).copied()
    }

    /// IDF weight of a term, if it is in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f32> {
        self.column(term).map(|col| self.idf[col as usize])
    }

    fn vectorize_tokens(&self, tokens: &[String]) -> SparseVector {
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for token in tokens {
            if let Some(&column) = self.vocabulary.get(token) {
                *counts.entry(column).or_insert(0) += 1;
            }
        }

        let entries = counts
            .into_iter()
            .map(|(column, count)| {
                let tf = if self.options.sublinear_tf {
                    1.0 + (count as f32).ln()
                } else {
                    count as f32
                };
                (column, tf * self.idf[column as usize])
            })
            .collect();

        let mut vector = SparseVector::new(self.idf.len(), entries);
        vector.normalize();
        vector
    }
}

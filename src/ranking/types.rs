use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ranking::errors::StrategyError;

/// A candidate document as produced by the loader.
///
/// Its position in the input slice is its identity for one ranking call;
/// `name` is only carried through for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Build an ordered document list from `(name, text)` pairs.
    pub fn from_pairs<N, T>(pairs: impl IntoIterator<Item = (N, T)>) -> Vec<Self>
    where
        N: Into<String>,
        T: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(name, text)| Self::new(name, text))
            .collect()
    }
}

/// Which vectorizer and metric a ranking call uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Corpus-dependent TF-IDF vectors.
    #[serde(rename = "tfidf", alias = "lexical")]
    Lexical,
    /// BERT-base sentence embeddings.
    #[serde(rename = "bert", alias = "dense-a")]
    DenseA,
    /// MiniLM sentence embeddings.
    #[serde(rename = "minilm", alias = "dense-b")]
    DenseB,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [Self::Lexical, Self::DenseA, Self::DenseB];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "tfidf",
            Self::DenseA => "bert",
            Self::DenseB => "minilm",
        }
    }

    pub fn is_dense(&self) -> bool {
        !matches!(self, Self::Lexical)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tfidf" | "tf-idf" | "lexical" => Ok(Self::Lexical),
            "bert" | "dense-a" => Ok(Self::DenseA),
            "minilm" | "dense-b" => Ok(Self::DenseB),
            _ => Err(StrategyError::Unsupported(s.to_string())),
        }
    }
}

/// Score of one input document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// Index of the document in the input slice
    pub position: usize,
    pub name: String,
    /// Raw cosine similarity, in [-1, 1]
    pub similarity: f32,
    /// 1-based rank assigned by the engine
    pub rank: usize,
    /// 1-based rank assigned by a reviewer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_rank: Option<usize>,
}

/// Output of one ranking call, ordered by engine rank.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedOutput {
    pub strategy: StrategyKind,
    /// Embedding model name for dense strategies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Dimensionality of the vectors that were compared
    pub dimensions: usize,
    pub results: Vec<ScoredResult>,
}

impl RankedOutput {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Names in engine order.
    pub fn names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.name.as_str()).collect()
    }

    /// First result carrying `name`.
    pub fn get(&self, name: &str) -> Option<&ScoredResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Result for the document at input `position`.
    pub fn by_position(&self, position: usize) -> Option<&ScoredResult> {
        self.results.iter().find(|r| r.position == position)
    }

    pub(crate) fn by_position_mut(&mut self, position: usize) -> Option<&mut ScoredResult> {
        self.results.iter_mut().find(|r| r.position == position)
    }
}

use crate::ranking::embeddings::EmbeddingError;
use crate::ranking::types::StrategyKind;

/// Errors surfaced by `Ranker::rank`.
#[derive(Debug, thiserror::Error)]
pub enum RankError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("scoring error: {0}")]
    Scoring(#[from] ScoringError),
}

impl RankError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Failures while turning text into vectors.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("unsupported strategy: {0}. Supported: tfidf, bert, minilm")]
    Unsupported(String),

    #[error("no embedding model loaded for strategy '{0}'")]
    ModelUnavailable(StrategyKind),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),
}

/// Failures while comparing vectors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoringError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot compare a sparse vector with a dense vector")]
    KindMismatch,

    #[error("similarity for document #{position} is not a finite number")]
    NonFinite { position: usize },
}

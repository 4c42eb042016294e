//! Document relevance ranking.
//!
//! Scores candidate documents against a query under one of three
//! interchangeable embedding strategies and orders them by cosine similarity.
//!
//! # Architecture
//!
//! - `lexical`: per-call TF-IDF vectorizer
//! - `embeddings`: `TextEncoder` seam and the fastembed-backed model
//! - `dense`: window, embed and mean-pool long texts
//! - `models`: dense encoders loaded once at startup
//! - `similarity`: cosine scorer for sparse and dense vectors
//! - `strategy`: dispatch over the active strategy
//! - `pipeline`: `Ranker::rank`, the entry point

pub mod dense;
pub mod embeddings;
mod errors;
pub mod lexical;
pub mod models;
pub mod preprocess;
mod pipeline;
pub mod similarity;
mod strategy;
mod types;
pub mod vector;

pub use embeddings::{EmbeddingError, EmbeddingModel, TextEncoder};
pub use errors::{RankError, ScoringError, StrategyError};
pub use lexical::LexicalOptions;
pub use models::{DenseOptions, ModelRegistry, ModelSpec};
pub use pipeline::{Ranker, RankerOptions};
pub use preprocess::ChunkingOptions;
pub use strategy::{Strategy, Vectorized};
pub use types::{Document, RankedOutput, ScoredResult, StrategyKind};
pub use vector::{SparseVector, Vector};

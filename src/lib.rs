//! Rank resumes (or any documents) against a job description.
//!
//! `loader` turns files into documents, `ranking::Ranker` orders them by
//! cosine similarity under a lexical or a dense embedding strategy, and
//! `feedback` records a reviewer's own ordering next to the engine's.

pub mod config;
pub mod feedback;
pub mod loader;
pub mod ranking;


pub use config::{Config, ConfigError};
pub use feedback::{FeedbackError, FeedbackRecord, FeedbackSink, JsonlSink};
pub use loader::{LoaderError, Upload};
pub use ranking::{
    Document, RankError, RankedOutput, Ranker, ScoredResult, ScoringError, StrategyError,
    StrategyKind,
};

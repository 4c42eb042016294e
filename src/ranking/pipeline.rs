//! The ranking entry point.
//!
//! `Ranker::rank` validates input, vectorizes the query and documents under
//! one strategy, scores every document, and returns the documents ordered by
//! similarity. The sort is stable, so equal scores keep their input order.
//! Nothing is cached between calls.

use std::cmp::Ordering;

use crate::ranking::dense::DenseVectorizer;
use crate::ranking::errors::{RankError, StrategyError};
use crate::ranking::lexical::LexicalOptions;
use crate::ranking::models::ModelRegistry;
use crate::ranking::preprocess::ChunkingOptions;
use crate::ranking::similarity::score_all;
use crate::ranking::strategy::Strategy;
use crate::ranking::types::{Document, RankedOutput, ScoredResult, StrategyKind};

/// Per-strategy settings applied on every call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankerOptions {
    pub lexical: LexicalOptions,
    pub chunking: ChunkingOptions,
}

/// Ranks documents against a query.
///
/// Holds only read-only state (options and pre-loaded models), so one
/// instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct Ranker {
    models: ModelRegistry,
    options: RankerOptions,
}

impl Ranker {
    pub fn new(models: ModelRegistry, options: RankerOptions) -> Self {
        Self { models, options }
    }

    /// Ranker with default options and no dense models.
    pub fn lexical_only() -> Self {
        Self::new(ModelRegistry::empty(), RankerOptions::default())
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn options(&self) -> &RankerOptions {
        &self.options
    }

    /// Whether `kind` can be used with this ranker.
    pub fn supports(&self, kind: StrategyKind) -> bool {
        !kind.is_dense() || self.models.is_loaded(kind)
    }

    /// Rank `documents` by cosine similarity to `query` under `kind`.
    ///
    /// Returns exactly one result per document. Documents with empty text
    /// score 0 under every strategy.
    ///
    /// # Errors
    /// * `InvalidInput` - empty query or no documents
    /// * `Strategy` - model not loaded or model failure
    /// * `Scoring` - vectors that cannot be compared
    pub fn rank(
        &self,
        query: &str,
        documents: &[Document],
        kind: StrategyKind,
    ) -> Result<RankedOutput, RankError> {
        if query.trim().is_empty() {
            return Err(RankError::invalid_input("query is empty"));
        }
        if documents.is_empty() {
            return Err(RankError::invalid_input("no documents to rank"));
        }

        let span = tracing::debug_span!("rank", strategy = %kind, documents = documents.len());
        let _enter = span.enter();

        let strategy = self.strategy(kind)?;
        let texts: Vec<&str> = documents.iter().map(|doc| doc.text.as_str()).collect();
        let vectorized = strategy.vectorize(query, &texts)?;

        if vectorized.documents.len() != documents.len() {
            return Err(StrategyError::MalformedOutput(format!(
                "{} vectors for {} documents",
                vectorized.documents.len(),
                documents.len()
            ))
            .into());
        }

        let scores = score_all(&vectorized.query, &vectorized.documents)?;

        let mut results: Vec<ScoredResult> = documents
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(position, (doc, similarity))| ScoredResult {
                position,
                name: doc.name.clone(),
                similarity,
                rank: 0,
                human_rank: None,
            })
            .collect();

        // Stable: ties keep input order
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        for (idx, result) in results.iter_mut().enumerate() {
            result.rank = idx + 1;
        }

        log::debug!(
            "ranked {} documents with {} ({} dims), top={:?}",
            results.len(),
            kind,
            vectorized.dimensions,
            results.first().map(|r| (&r.name, r.similarity))
        );

        Ok(RankedOutput {
            strategy: kind,
            model: strategy.model_name().map(str::to_string),
            dimensions: vectorized.dimensions,
            results,
        })
    }

    fn strategy(&self, kind: StrategyKind) -> Result<Strategy<'_>, StrategyError> {
        match kind {
            StrategyKind::Lexical => Ok(Strategy::Lexical(self.options.lexical.clone())),
            StrategyKind::DenseA | StrategyKind::DenseB => {
                let encoder = self.models.get(kind)?;
                Ok(Strategy::Dense {
                    kind,
                    vectorizer: DenseVectorizer::new(encoder, self.options.chunking),
                })
            }
        }
    }
}

use crate::ranking::dense::DenseVectorizer;
use crate::ranking::errors::StrategyError;
use crate::ranking::lexical::{LexicalOptions, TfidfVectorizer};
use crate::ranking::types::StrategyKind;
use crate::ranking::vector::Vector;

/// Query and document vectors from one strategy, in one vector space.
#[derive(Debug, Clone)]
pub struct Vectorized {
    pub query: Vector,
    pub documents: Vec<Vector>,
    pub dimensions: usize,
}

/// The embedding strategy active for one ranking call.
pub enum Strategy<'a> {
    Lexical(LexicalOptions),
    Dense {
        kind: StrategyKind,
        vectorizer: DenseVectorizer<'a>,
    },
}

impl Strategy<'_> {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Lexical(_) => StrategyKind::Lexical,
            Self::Dense { kind, .. } => *kind,
        }
    }

    /// Model name for dense strategies.
    pub fn model_name(&self) -> Option<&str> {
        match self {
            Self::Lexical(_) => None,
            Self::Dense { vectorizer, .. } => Some(vectorizer.model_name()),
        }
    }

    /// Vectorize the query and every document under this strategy.
    pub fn vectorize(&self, query: &str, documents: &[&str]) -> Result<Vectorized, StrategyError> {
        match self {
            Self::Lexical(options) => {
                let (query, documents) = TfidfVectorizer::fit_transform(options, query, documents);
                let dimensions = query.dimensions();
                Ok(Vectorized {
                    query: Vector::Sparse(query),
                    documents: documents.into_iter().map(Vector::Sparse).collect(),
                    dimensions,
                })
            }
            Self::Dense { vectorizer, .. } => {
                let (query, documents) = vectorizer.vectorize(query, documents)?;
                Ok(Vectorized {
                    query: Vector::Dense(query),
                    documents: documents.into_iter().map(Vector::Dense).collect(),
                    dimensions: vectorizer.dimensions(),
                })
            }
        }
    }
}

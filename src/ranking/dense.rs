//! Dense sentence-embedding vectorization.
//!
//! Each text is embedded independently of the rest of the batch:
//! whitespace is normalized, the text is cut into word windows
//! (see `preprocess::chunk_words`), every window is embedded, and the window
//! vectors are averaged in window order and L2-normalized. All windows of one
//! text go to the encoder as a single batch, so identical texts always yield
//! identical vectors.
//!
//! Texts with no words are never sent to the model and map to the zero
//! vector.

use crate::ranking::embeddings::TextEncoder;
use crate::ranking::errors::StrategyError;
use crate::ranking::preprocess::{chunk_words, normalize_text, ChunkingOptions};
use crate::ranking::vector::dense_l2_norm;

/// Dense vectorizer over a borrowed, pre-loaded encoder.
pub struct DenseVectorizer<'a> {
    encoder: &'a dyn TextEncoder,
    chunking: ChunkingOptions,
}

impl<'a> DenseVectorizer<'a> {
    pub fn new(encoder: &'a dyn TextEncoder, chunking: ChunkingOptions) -> Self {
        Self { encoder, chunking }
    }

    pub fn model_name(&self) -> &str {
        self.encoder.name()
    }

    pub fn dimensions(&self) -> usize {
        self.encoder.dimensions()
    }

    /// Embed the query and every document.
    pub fn vectorize(
        &self,
        query: &str,
        documents: &[&str],
    ) -> Result<(Vec<f32>, Vec<Vec<f32>>), StrategyError> {
        let query_vector = self.embed_text(query)?;
        let document_vectors = documents
            .iter()
            .map(|text| self.embed_text(text))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((query_vector, document_vectors))
    }

    /// Embed one text as the normalized mean of its window embeddings.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, StrategyError> {
        let dimensions = self.encoder.dimensions();
        let chunks = chunk_words(&normalize_text(text), &self.chunking);
        if chunks.is_empty() {
            return Ok(vec![0.0; dimensions]);
        }

        let embeddings = self.encoder.embed_batch(&chunks)?;
        if embeddings.len() != chunks.len() {
            return Err(StrategyError::MalformedOutput(format!(
                "model '{}' returned {} embeddings for {} inputs",
                self.encoder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut pooled = vec![0.0f32; dimensions];
        for embedding in &embeddings {
            if embedding.len() != dimensions {
                return Err(StrategyError::MalformedOutput(format!(
                    "model '{}' returned a {}-dimensional embedding, expected {}",
                    self.encoder.name(),
                    embedding.len(),
                    dimensions
                )));
            }
            for (acc, x) in pooled.iter_mut().zip(embedding) {
                *acc += x;
            }
        }

        let count = embeddings.len() as f32;
        for acc in &mut pooled {
            *acc /= count;
        }

        let norm = dense_l2_norm(&pooled);
        if norm > 0.0 {
            for acc in &mut pooled {
                *acc /= norm;
            }
        }

        Ok(pooled)
    }
}

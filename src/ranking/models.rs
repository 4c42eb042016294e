//! Process-wide registry of pre-loaded dense encoders.
//!
//! Models are loaded once, up front, and then only read. The registry is
//! handed to a `Ranker`, which borrows encoders for each call.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ranking::embeddings::{EmbeddingError, EmbeddingModel, TextEncoder};
use crate::ranking::errors::StrategyError;
use crate::ranking::preprocess::ChunkingOptions;
use crate::ranking::types::StrategyKind;

/// Default model for the `bert` strategy (BERT-base architecture, 768 dims)
pub const DEFAULT_BERT_MODEL: &str = "bge-base-en-v1.5";
/// Default model for the `minilm` strategy (384 dims)
pub const DEFAULT_MINILM_MODEL: &str = "all-MiniLM-L6-v2";

const DEFAULT_BERT_MAX_LENGTH: usize = 512;
const DEFAULT_MINILM_MAX_LENGTH: usize = 256;

/// Which model backs a dense strategy, and its token limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model: String,
    pub max_length: usize,
}

/// Settings shared by both dense strategies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseOptions {
    #[serde(default = "default_bert")]
    pub bert: ModelSpec,

    #[serde(default = "default_minilm")]
    pub minilm: ModelSpec,

    #[serde(flatten)]
    pub chunking: ChunkingOptions,
}

impl Default for DenseOptions {
    fn default() -> Self {
        Self {
            bert: default_bert(),
            minilm: default_minilm(),
            chunking: ChunkingOptions::default(),
        }
    }
}

impl DenseOptions {
    /// Model spec for a dense kind; `None` for the lexical strategy.
    pub fn spec(&self, kind: StrategyKind) -> Option<&ModelSpec> {
        match kind {
            StrategyKind::Lexical => None,
            StrategyKind::DenseA => Some(&self.bert),
            StrategyKind::DenseB => Some(&self.minilm),
        }
    }
}

fn default_bert() -> ModelSpec {
    ModelSpec {
        model: DEFAULT_BERT_MODEL.to_string(),
        max_length: DEFAULT_BERT_MAX_LENGTH,
    }
}

fn default_minilm() -> ModelSpec {
    ModelSpec {
        model: DEFAULT_MINILM_MODEL.to_string(),
        max_length: DEFAULT_MINILM_MAX_LENGTH,
    }
}

/// Loaded encoders keyed by dense strategy.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    encoders: HashMap<StrategyKind, Arc<dyn TextEncoder>>,
}

impl ModelRegistry {
    /// Registry with no dense models; only the lexical strategy is usable.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the models for `kinds` from `cache_dir`.
    ///
    /// The lexical kind is skipped. Fails on the first model that cannot be
    /// loaded.
    pub fn load(
        options: &DenseOptions,
        cache_dir: &Path,
        kinds: &[StrategyKind],
    ) -> Result<Self, EmbeddingError> {
        let mut registry = Self::empty();

        for &kind in kinds {
            let Some(spec) = options.spec(kind) else {
                continue;
            };
            if registry.is_loaded(kind) {
                continue;
            }

            let model = EmbeddingModel::new(&spec.model, cache_dir.to_path_buf(), spec.max_length)?;
            registry.insert(kind, Arc::new(model));
        }

        Ok(registry)
    }

    /// Register an encoder for a dense kind. Encoders for the lexical kind are
    /// ignored.
    pub fn insert(&mut self, kind: StrategyKind, encoder: Arc<dyn TextEncoder>) {
        if !kind.is_dense() {
            log::warn!("ignoring encoder '{}' registered for lexical strategy", encoder.name());
            return;
        }
        self.encoders.insert(kind, encoder);
    }

    pub fn with_encoder(mut self, kind: StrategyKind, encoder: Arc<dyn TextEncoder>) -> Self {
        self.insert(kind, encoder);
        self
    }

    pub fn is_loaded(&self, kind: StrategyKind) -> bool {
        self.encoders.contains_key(&kind)
    }

    /// Encoder for a dense kind.
    pub fn get(&self, kind: StrategyKind) -> Result<&dyn TextEncoder, StrategyError> {
        self.encoders
            .get(&kind)
            .map(|encoder| encoder.as_ref())
            .ok_or(StrategyError::ModelUnavailable(kind))
    }

    /// Dense kinds with a loaded encoder, in declaration order.
    pub fn loaded_kinds(&self) -> Vec<StrategyKind> {
        StrategyKind::ALL
            .into_iter()
            .filter(|kind| self.is_loaded(*kind))
            .collect()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for kind in self.loaded_kinds() {
            if let Some(encoder) = self.encoders.get(&kind) {
                map.entry(&kind, &encoder.name());
            }
        }
        map.finish()
    }
}

//! Dense text encoders.
//!
//! `TextEncoder` is what the dense strategies talk to. `EmbeddingModel` is
//! the production implementation: a fastembed ONNX model loaded from (or
//! downloaded into) `<cache_dir>/models`.

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{InitOptions, TextEmbedding};

/// Anything that maps texts to fixed-length dense vectors.
///
/// Implementations must be deterministic: the same input batch always
/// yields the same output.
pub trait TextEncoder: Send + Sync {
    /// Model identifier, reported in ranking metadata
    fn name(&self) -> &str;

    /// Length of every produced vector
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("failed to load model: {0}")]
    InitFailed(String),

    #[error("inference failed: {0}")]
    EmbeddingFailed(String),

    #[error("unsupported model '{0}', expected one of: {names}", names = supported_names())]
    InvalidModel(String),
}

/// Config names accepted for dense models. A `-q` suffix selects the
/// quantized variant.
const SUPPORTED_MODELS: &[(&str, fastembed::EmbeddingModel)] = &[
    ("all-minilm-l6-v2", fastembed::EmbeddingModel::AllMiniLML6V2),
    ("all-minilm-l6-v2-q", fastembed::EmbeddingModel::AllMiniLML6V2Q),
    ("all-minilm-l12-v2", fastembed::EmbeddingModel::AllMiniLML12V2),
    ("bge-small-en-v1.5", fastembed::EmbeddingModel::BGESmallENV15),
    ("bge-small-en-v1.5-q", fastembed::EmbeddingModel::BGESmallENV15Q),
    ("bge-base-en-v1.5", fastembed::EmbeddingModel::BGEBaseENV15),
    ("bge-base-en-v1.5-q", fastembed::EmbeddingModel::BGEBaseENV15Q),
    ("bge-large-en-v1.5", fastembed::EmbeddingModel::BGELargeENV15),
    ("bge-large-en-v1.5-q", fastembed::EmbeddingModel::BGELargeENV15Q),
];

fn supported_names() -> String {
    SUPPORTED_MODELS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
    let wanted = name.trim().to_lowercase();
    SUPPORTED_MODELS
        .iter()
        .find(|(known, _)| *known == wanted)
        .map(|(_, model)| model.clone())
        .ok_or_else(|| EmbeddingError::InvalidModel(name.to_string()))
}

/// Whether `name` can be used in the `dense` config section.
pub fn is_supported_model(name: &str) -> bool {
    resolve_model(name).is_ok()
}

/// A fastembed model behind a lock; inference needs `&mut`.
pub struct EmbeddingModel {
    model: Mutex<TextEmbedding>,
    name: String,
    dimensions: usize,
}

impl EmbeddingModel {
    /// Load `model_name`, downloading it into `cache_dir/models` on first
    /// use. Inputs longer than `max_length` tokens are truncated by the
    /// tokenizer.
    pub fn new(
        model_name: &str,
        cache_dir: PathBuf,
        max_length: usize,
    ) -> Result<Self, EmbeddingError> {
        let model_kind = resolve_model(model_name)?;

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("cannot create {}: {}", models_dir.display(), e))
        })?;

        log::info!("loading {} (max {} tokens)", model_name, max_length);

        let options = InitOptions::new(model_kind)
            .with_cache_dir(models_dir)
            .with_max_length(max_length)
            .with_show_download_progress(true);
        let mut model =
            TextEmbedding::try_new(options).map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        let dimensions = output_width(&mut model)?;
        log::info!("{} loaded, {} dimensions", model_name, dimensions);

        Ok(Self {
            model: Mutex::new(model),
            name: model_name.to_string(),
            dimensions,
        })
    }

    /// Embed a single text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("model returned nothing".to_string()))
    }
}

/// Width of the model's output, found by embedding a probe string.
fn output_width(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
    let probe = model
        .embed(vec!["probe"], None)
        .map_err(|e| EmbeddingError::InitFailed(format!("probe failed: {}", e)))?;

    match probe.first() {
        Some(vector) if !vector.is_empty() => Ok(vector.len()),
        _ => Err(EmbeddingError::InitFailed("model produced an empty probe vector".to_string())),
    }
}

impl TextEncoder for EmbeddingModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::EmbeddingFailed(format!("model lock poisoned: {}", e)))?;

        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
    }
}

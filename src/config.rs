use std::path::{Path, PathBuf};

use homedir::my_home;
use serde::{Deserialize, Serialize};

use crate::ranking::embeddings::is_supported_model;
use crate::ranking::{DenseOptions, LexicalOptions, RankerOptions, StrategyKind};

const CONFIG_FILE: &str = "config.yaml";
/// Overrides the data directory
pub const BASE_PATH_ENV: &str = "CVRANK_BASE_PATH";

const DEFAULT_FEEDBACK_LOG: &str = "feedback.jsonl";
/// Smallest accepted token limit for a dense model
const MIN_MAX_LENGTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not find home directory; set {BASE_PATH_ENV}")]
    HomeNotFound,

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is malformed: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Configuration for the feedback log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Log file, relative to the data directory unless absolute
    #[serde(default = "default_feedback_log")]
    pub log_file: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            log_file: default_feedback_log(),
        }
    }
}

fn default_feedback_log() -> String {
    DEFAULT_FEEDBACK_LOG.to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Strategy used when none is given on the command line
    #[serde(default = "default_strategy")]
    pub default_strategy: StrategyKind,

    #[serde(default)]
    pub lexical: LexicalOptions,

    #[serde(default)]
    pub dense: DenseOptions,

    #[serde(default)]
    pub feedback: FeedbackConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_strategy: default_strategy(),
            lexical: LexicalOptions::default(),
            dense: DenseOptions::default(),
            feedback: FeedbackConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

fn default_strategy() -> StrategyKind {
    StrategyKind::Lexical
}

impl Config {
    /// Data directory: `$CVRANK_BASE_PATH`, else `~/.local/share/cvrank`.
    pub fn default_base_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(BASE_PATH_ENV) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let home = my_home()
            .ok()
            .flatten()
            .ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".local").join("share").join("cvrank"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&Self::default_base_path()?)
    }

    /// Load `config.yaml` from `base_path`, creating it with defaults when
    /// missing.
    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(base_path).map_err(|e| ConfigError::io(base_path, e))?;

        let path = base_path.join(CONFIG_FILE);
        if !path.exists() {
            log::info!("Creating default config at {}", path.display());
            let mut config = Self::default();
            config.base_path = base_path.to_path_buf();
            config.save()?;
        }

        let config_str = std::fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
        let mut config: Self = serde_yml::from_str(&config_str)?;
        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case new fields were added
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = self.path();
        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(&path, config_str).map_err(|e| ConfigError::io(&path, e))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lexical.min_token_len == 0 {
            return Err(ConfigError::invalid("lexical.min_token_len", "must be at least 1"));
        }

        let chunking = &self.dense.chunking;
        if chunking.chunk_words == 0 {
            return Err(ConfigError::invalid("dense.chunk_words", "must be at least 1"));
        }
        if chunking.max_chunks == 0 {
            return Err(ConfigError::invalid("dense.max_chunks", "must be at least 1"));
        }

        let models = [
            ("dense.bert", &self.dense.bert),
            ("dense.minilm", &self.dense.minilm),
        ];
        for (field, spec) in models {
            if !is_supported_model(&spec.model) {
                return Err(ConfigError::invalid(
                    format!("{field}.model"),
                    format!("unknown model '{}'", spec.model),
                ));
            }
            if spec.max_length < MIN_MAX_LENGTH {
                return Err(ConfigError::invalid(
                    format!("{field}.max_length"),
                    format!("must be at least {MIN_MAX_LENGTH}, got {}", spec.max_length),
                ));
            }
        }

        if self.feedback.log_file.trim().is_empty() {
            return Err(ConfigError::invalid("feedback.log_file", "must not be empty"));
        }

        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of `config.yaml`.
    pub fn path(&self) -> PathBuf {
        self.base_path.join(CONFIG_FILE)
    }

    pub fn feedback_log_path(&self) -> PathBuf {
        let log_file = Path::new(&self.feedback.log_file);
        if log_file.is_absolute() {
            log_file.to_path_buf()
        } else {
            self.base_path.join(log_file)
        }
    }

    pub fn ranker_options(&self) -> RankerOptions {
        RankerOptions {
            lexical: self.lexical.clone(),
            chunking: self.dense.chunking,
        }
    }
}

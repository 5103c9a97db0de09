use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::path::PathBuf;

/// Engine configuration loaded from environment variables.
///
/// All settings can be configured via environment variables with the `TIKUN_`
/// prefix. For example: `TIKUN_BACKEND=onnx`, `TIKUN_MODEL__REPO_ID=...`
///
/// The configuration is read once at process start; the engine treats it as
/// immutable for the process lifetime.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Embedding backend to activate
    #[serde(default)]
    pub backend: BackendKind,

    /// Learned-model backend configuration
    #[serde(default)]
    pub model: ModelConfig,
}

/// Which embedding backend the process runs.
///
/// Fixed at startup: embeddings from different backends have incompatible
/// dimensionalities, so the backend is never switched per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Deterministic hash-seeded embeddings, no model dependency
    #[default]
    Mock,
    /// Pretrained acoustic model via ONNX Runtime
    Onnx,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Onnx => write!(f, "onnx"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Hugging Face repository holding the acoustic model
    #[serde(default = "default_repo_id")]
    pub repo_id: String,

    /// ONNX model file within the repository
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Sample rate the model expects; waveforms are resampled to this
    #[serde(default = "default_target_sample_rate")]
    pub target_sample_rate: u32,

    /// Embedding dimension the model emits per frame
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Override for the hf-hub cache directory
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            repo_id: default_repo_id(),
            filename: default_filename(),
            target_sample_rate: default_target_sample_rate(),
            embedding_dim: default_embedding_dim(),
            cache_dir: None,
        }
    }
}

fn default_repo_id() -> String {
    "onnx-community/yamnet".to_string()
}

fn default_filename() -> String {
    "onnx/model.onnx".to_string()
}

fn default_target_sample_rate() -> u32 {
    16_000
}

fn default_embedding_dim() -> usize {
    1024
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables should be prefixed with `TIKUN_` and use double
    /// underscores for nested values:
    /// - `TIKUN_BACKEND` -> backend
    /// - `TIKUN_MODEL__REPO_ID` -> model.repo_id
    /// - `TIKUN_MODEL__TARGET_SAMPLE_RATE` -> model.target_sample_rate
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TIKUN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

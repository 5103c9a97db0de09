//! Embedding backends.
//!
//! An [`Embedder`] maps a decoded waveform to a fixed-length acoustic
//! embedding. Two backends exist: a deterministic hash-seeded mock for
//! testing and offline use, and a pretrained ONNX model. The active backend
//! is chosen once at startup and shared across all requests; embeddings from
//! different backends are never comparable.

mod mock;

#[cfg(feature = "onnx")]
mod download;
#[cfg(feature = "onnx")]
mod model;

pub use mock::{MockEmbedder, MOCK_EMBEDDING_DIM};

#[cfg(feature = "onnx")]
pub use download::fetch_model;
#[cfg(feature = "onnx")]
pub use model::OnnxEmbedder;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::Waveform;
use crate::config::{BackendKind, EngineConfig};

/// Embedding backend errors
#[derive(Debug, thiserror::Error)]
pub enum EmbedderError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Model download failed: {0}")]
    Download(String),

    #[error("ONNX runtime error: {0}")]
    Onnx(String),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Invalid embedding dimension: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fixed-length acoustic embedding.
///
/// The dimension is backend-defined and constant for the process lifetime.
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    data: Vec<f32>,
}

impl Embedding {
    /// Create an embedding from raw data
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Embedding dimension
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the embedding has zero length
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the raw embedding data
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Compute cosine similarity with another embedding.
    ///
    /// Returns 0.0 if the embeddings differ in length or either has zero
    /// magnitude.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.data.len() != other.data.len() || self.data.is_empty() {
            return 0.0;
        }

        let dot: f32 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum();

        let norm_a: f32 = self.data.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = other.data.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }
}

/// A backend that maps waveforms to embeddings.
///
/// Implementations hold no per-request mutable state and are safe for
/// concurrent use from many requests at once.
pub trait Embedder: Send + Sync {
    /// Extract a fixed-length embedding from a waveform
    fn extract(&self, waveform: &Waveform) -> Result<Embedding, EmbedderError>;

    /// Dimension of the embeddings this backend produces
    fn dimension(&self) -> usize;

    /// Human-readable backend name for logging
    fn name(&self) -> &str;
}

/// Construct the configured embedding backend.
///
/// Called once at startup; the returned embedder is shared for the process
/// lifetime.
pub fn from_config(config: &EngineConfig) -> crate::Result<Arc<dyn Embedder>> {
    debug!(backend = %config.backend, "Constructing embedding backend");

    match config.backend {
        BackendKind::Mock => Ok(Arc::new(MockEmbedder::new())),
        #[cfg(feature = "onnx")]
        BackendKind::Onnx => {
            let model_path = download::fetch_model(&config.model)?;
            let embedder = OnnxEmbedder::load(&model_path, &config.model)?;
            Ok(Arc::new(embedder))
        }
        #[cfg(not(feature = "onnx"))]
        BackendKind::Onnx => Err(config::ConfigError::Message(
            "backend 'onnx' requested but the crate was built without the 'onnx' feature"
                .to_string(),
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = Embedding::new(vec![1.0, 0.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert!((a.cosine_similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0]);
        assert!(a.cosine_similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_length_mismatch() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0]);
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[test]
    fn test_from_config_mock() {
        let config = EngineConfig::default();
        let embedder = from_config(&config).unwrap();
        assert_eq!(embedder.dimension(), MOCK_EMBEDDING_DIM);
        assert_eq!(embedder.name(), "mock");
    }
}

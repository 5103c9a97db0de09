//! Learned embedding backend via ONNX Runtime.
//!
//! Runs a pretrained acoustic model over the (resampled) waveform and
//! mean-pools the per-frame embedding rows into a single fixed-length
//! vector. The session is loaded once per process; inference calls are
//! serialized behind a mutex because `Session::run` needs exclusive access.

use std::path::Path;
use std::sync::Mutex;

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tracing::{debug, info};

use crate::audio::{resample::resample, Waveform};
use crate::config::ModelConfig;

use super::{Embedder, EmbedderError, Embedding};

/// Pretrained acoustic model backend
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    target_sample_rate: u32,
    dimension: usize,
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("target_sample_rate", &self.target_sample_rate)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl OnnxEmbedder {
    /// Load the model from a local ONNX file.
    ///
    /// Expensive; call once per process and share the result.
    pub fn load(model_path: &Path, config: &ModelConfig) -> Result<Self, EmbedderError> {
        info!(?model_path, "Loading acoustic model");

        let model_bytes = std::fs::read(model_path)
            .map_err(|e| EmbedderError::ModelLoad(format!("Failed to read model file: {e}")))?;

        let mut builder = Session::builder().map_err(|e| EmbedderError::Onnx(e.to_string()))?;

        builder = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EmbedderError::Onnx(e.to_string()))?;

        builder = builder
            .with_intra_threads(4)
            .map_err(|e| EmbedderError::Onnx(e.to_string()))?;

        #[cfg(feature = "cuda")]
        {
            use ort::execution_providers::CUDAExecutionProvider;
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| EmbedderError::Onnx(e.to_string()))?;
        }

        let session = builder
            .commit_from_memory(&model_bytes)
            .map_err(|e| EmbedderError::ModelLoad(format!("Failed to load model: {e}")))?;

        debug!(
            inputs = ?session.inputs.iter().map(|i| &i.name).collect::<Vec<_>>(),
            outputs = ?session.outputs.iter().map(|o| &o.name).collect::<Vec<_>>(),
            "Acoustic model loaded"
        );

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| EmbedderError::ModelLoad("Model has no inputs".to_string()))?;

        // YamNet-family models emit (scores, embeddings, spectrogram);
        // single-output models emit the embedding sequence directly.
        let output_index = if session.outputs.len() > 1 { 1 } else { 0 };
        let output_name = session
            .outputs
            .get(output_index)
            .map(|o| o.name.clone())
            .ok_or_else(|| EmbedderError::ModelLoad("Model has no outputs".to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            target_sample_rate: config.target_sample_rate,
            dimension: config.embedding_dim,
        })
    }

    fn run_inference(&self, samples: Vec<f32>) -> Result<Vec<f32>, EmbedderError> {
        let input = Tensor::from_array(([samples.len()], samples.into_boxed_slice()))
            .map_err(|e| EmbedderError::Onnx(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| EmbedderError::Onnx(e.to_string()))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            EmbedderError::Onnx(format!("Output '{}' not found", self.output_name))
        })?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::Onnx(e.to_string()))?;

        debug!(?shape, data_len = data.len(), "Model output");

        Ok(data.to_vec())
    }
}

impl Embedder for OnnxEmbedder {
    fn extract(&self, waveform: &Waveform) -> Result<Embedding, EmbedderError> {
        let samples = if waveform.sample_rate != self.target_sample_rate {
            resample(
                &waveform.samples,
                waveform.sample_rate,
                self.target_sample_rate,
            )?
        } else {
            waveform.samples.clone()
        };

        let data = self.run_inference(samples)?;

        // The model emits one embedding row per frame
        if data.is_empty() || data.len() % self.dimension != 0 {
            return Err(EmbedderError::DimensionMismatch {
                expected: self.dimension,
                got: data.len(),
            });
        }

        let frames = data.len() / self.dimension;

        // Mean across time frames
        let mut pooled = vec![0.0f32; self.dimension];
        for frame in data.chunks_exact(self.dimension) {
            for (acc, &v) in pooled.iter_mut().zip(frame) {
                *acc += v;
            }
        }
        for v in &mut pooled {
            *v /= frames as f32;
        }

        Ok(Embedding::new(pooled))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

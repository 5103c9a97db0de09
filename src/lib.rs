//! Tikun recognition engine
//!
//! A per-user audio recognition engine. Raw audio bytes are decoded to a
//! mono waveform, embedded into a fixed-length acoustic vector by a
//! process-wide backend, and classified against that user's catalog of
//! labeled examples with a nearest-neighbor index.
//!
//! The engine has no network or storage surface of its own; a surrounding
//! service decodes requests, calls in here, and persists the results.

pub mod audio;
pub mod config;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod index;
pub mod registry;

pub use config::{BackendKind, EngineConfig};
pub use embedder::{Embedder, Embedding, MockEmbedder, MOCK_EMBEDDING_DIM};
pub use engine::RecognitionEngine;
pub use error::{EngineError, Result};
pub use index::{IndexEntry, LabeledExample, Prediction, RebuildSummary, UserIndex};
pub use registry::ClassifierRegistry;

#[cfg(feature = "onnx")]
pub use embedder::OnnxEmbedder;

use thiserror::Error;

use crate::audio::DecodeError;
use crate::embedder::EmbedderError;
use crate::index::IndexError;

/// Engine-level errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Audio decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Embedding backend error: {0}")]
    Embedder(#[from] EmbedderError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

impl EngineError {
    /// Whether this error was caused by the caller's input.
    ///
    /// Decode failures are client errors (the caller can resubmit valid
    /// audio); everything else is a server-side fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Returns a machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Embedder(_) => "EMBEDDING_BACKEND_ERROR",
            Self::Index(_) => "INDEX_ERROR",
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

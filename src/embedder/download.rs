//! Model fetching from Hugging Face Hub.
//!
//! Resolves the configured repository and file to a local path, downloading
//! into the hf-hub cache on first use.

use std::path::PathBuf;

use hf_hub::api::sync::ApiBuilder;
use tracing::info;

use crate::config::ModelConfig;

use super::EmbedderError;

/// Fetch the configured model file, returning its local path.
///
/// Cached files are returned without a network round trip.
pub fn fetch_model(config: &ModelConfig) -> Result<PathBuf, EmbedderError> {
    let mut builder = ApiBuilder::new();
    if let Some(cache_dir) = &config.cache_dir {
        builder = builder.with_cache_dir(cache_dir.clone());
    }

    let api = builder
        .build()
        .map_err(|e| EmbedderError::Download(e.to_string()))?;

    let repo = api.model(config.repo_id.clone());

    info!(
        repo_id = %config.repo_id,
        filename = %config.filename,
        "Resolving acoustic model"
    );

    let path = repo
        .get(&config.filename)
        .map_err(|e| EmbedderError::Download(e.to_string()))?;

    info!(?path, "Model resolved");

    Ok(path)
}

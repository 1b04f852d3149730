//! docvault-embed
//!
//! Embedding provider variants and the factory that picks one from
//! configuration. The hashing provider is always available; the candle model
//! provider needs the `model` cargo feature.

use std::sync::Arc;

use tracing::info;

use docvault_core::config::{expand_path, EmbeddingSettings, ProviderKind};
use docvault_core::{Embedder, Error, Result};

pub mod hashing;
#[cfg(feature = "model")]
pub mod model;

pub use hashing::HashingEmbedder;
#[cfg(feature = "model")]
pub use model::ModelEmbedder;

/// Build the provider selected by `settings.provider`.
pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match settings.provider {
        ProviderKind::Hashing => Arc::new(HashingEmbedder::new(settings.dimension, settings.seed)?),
        ProviderKind::Model => build_model(settings)?,
    };
    info!(provider = embedder.id(), dim = embedder.dim(), "embedding provider ready");
    Ok(embedder)
}

#[cfg(feature = "model")]
fn build_model(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let dir = settings
        .model_dir
        .as_deref()
        .ok_or_else(|| Error::InvalidConfig("embedding.model_dir is not set".to_string()))?;
    Ok(Arc::new(ModelEmbedder::load(&expand_path(dir), settings.max_len)?))
}

#[cfg(not(feature = "model"))]
fn build_model(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let dir = settings.model_dir.as_deref().map(expand_path);
    Err(Error::embedding(
        "model",
        format!("built without the `model` feature; cannot load {:?}", dir),
    ))
}

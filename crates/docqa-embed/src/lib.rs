//! docqa-embed
//!
//! Embedding gateway implementations. The hashing embedder is always
//! available; the sentence-transformer backend needs the `model` feature.

pub mod hash;
#[cfg(feature = "model")]
pub mod model;
#[cfg(feature = "model")]
mod pool;

use std::path::Path;

use docqa_core::config::{EmbeddingBackend, EmbeddingConfig};
use docqa_core::error::{Error, Result};
use docqa_core::traits::Embedder;
use tracing::info;

pub use hash::HashEmbedder;
#[cfg(feature = "model")]
pub use model::SentenceEmbedder;
#[cfg(feature = "model")]
pub use pool::masked_mean_l2;

/// Build the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// hashing backend regardless of configuration.
pub fn default_embedder(config: &EmbeddingConfig, model_dir: Option<&Path>) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake || config.backend == EmbeddingBackend::Hash {
        info!(dim = config.dimension, "using hash embedder");
        return Ok(Box::new(HashEmbedder::new(config.dimension)?));
    }
    load_model(config, model_dir)
}

#[cfg(feature = "model")]
fn load_model(config: &EmbeddingConfig, model_dir: Option<&Path>) -> Result<Box<dyn Embedder>> {
    let dir = model::resolve_model_dir(model_dir)?;
    let embedder = SentenceEmbedder::load(&dir)?;
    if embedder.dim() != config.dimension {
        return Err(Error::DimensionMismatch { expected: config.dimension, actual: embedder.dim() });
    }
    Ok(Box::new(embedder))
}

#[cfg(not(feature = "model"))]
fn load_model(_config: &EmbeddingConfig, _model_dir: Option<&Path>) -> Result<Box<dyn Embedder>> {
    Err(Error::InvalidConfig(
        "embedding.backend = \"model\" requires docqa-embed to be built with the `model` feature".into(),
    ))
}

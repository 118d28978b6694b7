//! Text embedding providers

mod hashing;
mod onnx;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{Error, Result};

pub use hashing::HashingEmbedder;
pub use onnx::OnnxEmbedder;

/// Maps texts to fixed-dimensionality vectors.
///
/// Implementations must be deterministic and must accept empty strings.
/// Calls are blocking; async callers should go through `spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed texts, position-aligned with the input
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("Empty embedding result"))
    }

    /// Output dimensionality
    fn dimensions(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Build the configured embedding provider. Model download and load failures are fatal.
pub async fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.backend {
        EmbeddingBackend::Onnx => Ok(Arc::new(OnnxEmbedder::new(config).await?)),
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimensions))),
    }
}

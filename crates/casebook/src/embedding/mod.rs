//! Text embedding providers
//!
//! Embedding is an injectable capability: anything that turns text into a
//! fixed-length vector can back a collection. The index never retries a
//! failed embedding; retry policy belongs to the provider's own client.

pub mod hashing;
pub mod mock;
pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{EmbedderConfig, EmbedderProvider};
use crate::error::EmbeddingError;

pub use hashing::HashingEmbedder;
pub use mock::MockEmbedder;
pub use openai::OpenAiEmbedder;

/// Converts text into fixed-dimension vectors
#[async_trait]
pub trait Embedder: Send + Sync {
  /// Identifier of the model producing the vectors
  fn model(&self) -> &str;

  /// Length of every vector this embedder returns
  fn dimension(&self) -> usize;

  /// Embed a single text
  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

  /// Embed several texts, preserving order
  async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut embeddings = Vec::with_capacity(texts.len());
    for text in texts {
      embeddings.push(self.embed(text).await?);
    }
    Ok(embeddings)
  }
}

pub type SharedEmbedder = Arc<dyn Embedder>;

/// Build the embedder described by the configuration
pub fn from_config(config: &EmbedderConfig) -> Result<SharedEmbedder, EmbeddingError> {
  match config.provider {
    EmbedderProvider::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimension))),
    EmbedderProvider::Openai => Ok(Arc::new(OpenAiEmbedder::from_config(config)?)),
  }
}

/// Reject text that has nothing to embed
pub(crate) fn validate_input(text: &str) -> Result<(), EmbeddingError> {
  if text.trim().is_empty() {
    return Err(EmbeddingError::EmptyInput);
  }
  Ok(())
}

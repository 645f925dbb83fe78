//! Deterministic feature-hashing embedder
//!
//! Needs no model files or network, which makes it the default for offline
//! use and for tests. Each term lands in a SHA-256 selected bucket with a
//! hash-selected sign; term frequencies are summed and the result is scaled
//! to unit length.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{validate_input, Embedder};
use crate::error::EmbeddingError;
use crate::similarity;

const MODEL_NAME: &str = "feature-hashing-v1";

pub struct HashingEmbedder {
  dimension: usize,
}

impl HashingEmbedder {
  pub fn new(dimension: usize) -> Self {
    Self { dimension: dimension.max(1) }
  }

  /// Embed synchronously; the async trait method delegates here
  pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    validate_input(text)?;

    let mut vector = vec![0.0f32; self.dimension];
    for term in similarity::tokenize(text) {
      let (bucket, sign) = bucket_for(&term, self.dimension);
      vector[bucket] += sign;
    }

    Ok(similarity::normalize(vector))
  }
}

#[async_trait]
impl Embedder for HashingEmbedder {
  fn model(&self) -> &str {
    MODEL_NAME
  }

  fn dimension(&self) -> usize {
    self.dimension
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    self.embed_text(text)
  }
}

fn bucket_for(term: &str, dimension: usize) -> (usize, f32) {
  let digest = Sha256::digest(term.as_bytes());

  let mut index_bytes = [0u8; 8];
  index_bytes.copy_from_slice(&digest[..8]);
  let bucket = (u64::from_le_bytes(index_bytes) % dimension as u64) as usize;
  let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };

  (bucket, sign)
}

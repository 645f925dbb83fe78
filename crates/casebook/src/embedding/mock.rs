use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{validate_input, Embedder};
use crate::error::EmbeddingError;

/// Scripted embedder for tests: fixed vectors per text, optional failures
pub struct MockEmbedder {
  pub vectors: HashMap<String, Vec<f32>>,
  pub fallback: Vec<f32>,
  pub fail_on_texts: Vec<String>,
  pub fail_all: bool,
  calls: AtomicUsize,
}

impl MockEmbedder {
  pub fn new(dimension: usize) -> Self {
    let mut fallback = vec![0.0; dimension.max(1)];
    fallback[0] = 1.0;
    Self {
      vectors: HashMap::new(),
      fallback,
      fail_on_texts: vec![],
      fail_all: false,
      calls: AtomicUsize::new(0),
    }
  }

  /// An embedder whose backend is always unreachable
  pub fn failing(dimension: usize) -> Self {
    Self { fail_all: true, ..Self::new(dimension) }
  }

  pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
    self.vectors.insert(text.to_string(), vector);
    self
  }

  /// Number of `embed` calls made so far
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Embedder for MockEmbedder {
  fn model(&self) -> &str {
    "test-mock"
  }

  fn dimension(&self) -> usize {
    self.fallback.len()
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    validate_input(text)?;

    if self.fail_all || self.fail_on_texts.iter().any(|t| t == text) {
      return Err(EmbeddingError::backend(format!("Mock failure for text: {text}")));
    }

    Ok(self.vectors.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
  }
}

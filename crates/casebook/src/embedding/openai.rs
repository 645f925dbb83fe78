//! OpenAI-compatible embeddings client
//!
//! Works with any endpoint that implements `POST {base}/embeddings`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{validate_input, Embedder};
use crate::config::EmbedderConfig;
use crate::error::EmbeddingError;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
  embedding: Vec<f32>,
  #[serde(default)]
  index: usize,
}

pub struct OpenAiEmbedder {
  client: Client,
  base_url: String,
  api_key: String,
  model: String,
  dimension: usize,
}

impl OpenAiEmbedder {
  pub fn new(
    base_url: &str,
    api_key: &str,
    model: &str,
    dimension: usize,
    timeout: Duration,
  ) -> Result<Self, EmbeddingError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| EmbeddingError::backend(format!("Failed to create HTTP client: {e}")))?;

    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
      model: model.to_string(),
      dimension,
    })
  }

  /// Build from configuration, reading the API key from the configured env var
  pub fn from_config(config: &EmbedderConfig) -> Result<Self, EmbeddingError> {
    let api_key = std::env::var(&config.api_key_env)
      .ok()
      .filter(|key| !key.trim().is_empty())
      .ok_or_else(|| EmbeddingError::MissingApiKey { env_var: config.api_key_env.clone() })?;

    Self::new(
      &config.endpoint,
      &api_key,
      &config.model,
      config.dimension,
      Duration::from_secs(config.timeout_secs),
    )
  }

  async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let url = format!("{}/embeddings", self.base_url);
    let request = EmbeddingRequest { model: &self.model, input: texts };

    let response = self
      .client
      .post(&url)
      .header("Authorization", format!("Bearer {}", self.api_key))
      .json(&request)
      .send()
      .await
      .map_err(|e| EmbeddingError::backend(format!("Request to {url} failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(EmbeddingError::backend(format!("{url} returned {status}: {body}")));
    }

    let body = response
      .text()
      .await
      .map_err(|e| EmbeddingError::backend(format!("Failed to read response body: {e}")))?;

    parse_response(&body, texts.len(), self.dimension)
  }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
  fn model(&self) -> &str {
    &self.model
  }

  fn dimension(&self) -> usize {
    self.dimension
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    validate_input(text)?;
    let mut embeddings = self.request(&[text.to_string()]).await?;
    embeddings.pop().ok_or_else(|| EmbeddingError::invalid_response("no embedding returned"))
  }

  async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if texts.is_empty() {
      return Ok(vec![]);
    }
    for text in texts {
      validate_input(text)?;
    }
    self.request(texts).await
  }
}

/// Decode an embeddings response, restoring input order and checking shape
fn parse_response(
  body: &str,
  expected_count: usize,
  dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
  let mut response: EmbeddingResponse =
    serde_json::from_str(body).map_err(|e| EmbeddingError::invalid_response(e.to_string()))?;

  if response.data.len() != expected_count {
    return Err(EmbeddingError::invalid_response(format!(
      "expected {expected_count} embeddings, got {}",
      response.data.len()
    )));
  }

  response.data.sort_by_key(|item| item.index);

  response
    .data
    .into_iter()
    .map(|item| {
      if item.embedding.len() != dimension {
        return Err(EmbeddingError::DimensionMismatch {
          expected: dimension,
          actual: item.embedding.len(),
        });
      }
      Ok(item.embedding)
    })
    .collect()
}

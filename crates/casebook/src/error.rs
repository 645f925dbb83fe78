//! Typed failures that callers may want to match on.
//!
//! Everything else travels as `anyhow::Error`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
  #[error("Cannot embed empty text")]
  EmptyInput,

  #[error("Embedding backend failed: {message}")]
  Backend { message: String },

  #[error("Embedding backend returned an invalid response: {message}")]
  InvalidResponse { message: String },

  #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("API key not found in environment variable '{env_var}'")]
  MissingApiKey { env_var: String },
}

impl EmbeddingError {
  pub fn backend(message: impl Into<String>) -> Self {
    Self::Backend { message: message.into() }
  }

  pub fn invalid_response(message: impl Into<String>) -> Self {
    Self::InvalidResponse { message: message.into() }
  }
}

#[derive(Error, Debug)]
pub enum IndexError {
  #[error("Got {documents} documents but {metadatas} metadata maps")]
  LengthMismatch { documents: usize, metadatas: usize },

  #[error("Collection '{collection}' stores {expected}-dimensional embeddings, got {actual}")]
  DimensionMismatch { collection: String, expected: usize, actual: usize },

  #[error("Invalid collection name '{name}'")]
  InvalidCollectionName { name: String },

  #[error("Collection '{collection}' is locked by another writer ({path})")]
  Locked { collection: String, path: String },

  #[error("Index backend '{backend}' is not available in this build")]
  BackendUnavailable { backend: String },
}

impl IndexError {
  pub fn invalid_collection_name(name: impl Into<String>) -> Self {
    Self::InvalidCollectionName { name: name.into() }
  }
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Config file not found: {path}")]
  NotFound { path: String },

  #[error("Failed to parse config {path}: {message}")]
  Parse { path: String, message: String },

  #[error("Invalid config value for '{field}': {message}")]
  Invalid { field: String, message: String },

  #[error("Could not find home directory")]
  NoHomeDirectory,
}

impl ConfigError {
  pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Invalid { field: field.into(), message: message.into() }
  }
}

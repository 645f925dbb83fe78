//! Data models shared by the index backends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Metadata;

/// One persisted entry of a collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEntry {
  pub id: String,
  pub document: String,
  #[serde(default)]
  pub metadata: Metadata,
  pub content_key: String,
  pub embedding: Vec<f32>,
  pub created_at: DateTime<Utc>,
}

impl IndexedEntry {
  pub fn new(document: String, metadata: Metadata, content_key: String, embedding: Vec<f32>) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      document,
      metadata,
      content_key,
      embedding,
      created_at: Utc::now(),
    }
  }
}

/// A query hit with its similarity score in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
  pub text: String,
  pub metadata: Metadata,
  pub score: f32,
}

/// What an `add` call actually wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
  pub added: usize,
  pub skipped_duplicates: usize,
}

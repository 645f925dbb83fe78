//! Persistent similarity index
//!
//! A [`Collection`] is a named, isolated partition of embedded cases. The
//! collection owns the contract (embedding, duplicate handling, scoring),
//! while a [`VectorStore`] backend owns the bytes on disk.

pub mod flat;
#[cfg(feature = "lancedb")]
pub mod lancedb;
pub mod models;
pub mod registry;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

use crate::embedding::SharedEmbedder;
use crate::error::IndexError;

pub use models::{AddOutcome, IndexedEntry, ScoredDocument};
pub use registry::CollectionRegistry;

/// Free-form string metadata attached to every entry
pub type Metadata = BTreeMap<String, String>;

/// Metadata key carrying the originating shipment identifier
pub const SHIPMENT_ID_KEY: &str = "shipment_id";
/// Metadata key carrying the source collection kind
pub const SOURCE_KEY: &str = "source";

/// What to do when an entry with the same content key is added again
///
/// `Skip` re-reads stored keys at the start of every add, so rows written by
/// another process since open are seen. Two writers adding the same row at
/// the same moment can still both store it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
  #[default]
  Skip,
  Append,
}

/// Storage backend for one collection
#[async_trait]
pub trait VectorStore: Send + Sync {
  /// Persist entries; all share one embedding dimension
  async fn append(&self, entries: Vec<IndexedEntry>) -> Result<()>;

  /// Nearest neighbours of `query`, best first, at most `limit`
  async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredDocument>>;

  async fn count(&self) -> Result<usize>;

  /// Content keys of every stored entry
  async fn content_keys(&self) -> Result<HashSet<String>>;
}

pub struct Collection {
  name: String,
  store: Box<dyn VectorStore>,
  embedder: SharedEmbedder,
  policy: DuplicatePolicy,
}

impl std::fmt::Debug for Collection {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Collection")
      .field("name", &self.name)
      .field("model", &self.embedder.model())
      .field("policy", &self.policy)
      .finish()
  }
}

impl Collection {
  pub fn new(
    name: &str,
    store: Box<dyn VectorStore>,
    embedder: SharedEmbedder,
    policy: DuplicatePolicy,
  ) -> Result<Self> {
    validate_collection_name(name)?;
    Ok(Self { name: name.to_string(), store, embedder, policy })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Embed and persist documents with their metadata.
  ///
  /// Every embedding is computed before anything is written, so an embedding
  /// failure leaves the collection unchanged.
  pub async fn add(&self, documents: &[String], metadatas: &[Metadata]) -> Result<AddOutcome> {
    if documents.len() != metadatas.len() {
      return Err(
        IndexError::LengthMismatch { documents: documents.len(), metadatas: metadatas.len() }.into(),
      );
    }

    let mut outcome = AddOutcome::default();
    let mut seen = match self.policy {
      DuplicatePolicy::Skip => self.store.content_keys().await?,
      DuplicatePolicy::Append => HashSet::new(),
    };

    let mut pending: Vec<(String, Metadata, String)> = Vec::with_capacity(documents.len());
    for (document, metadata) in documents.iter().zip(metadatas) {
      let identifier = metadata.get(SHIPMENT_ID_KEY).map(String::as_str).unwrap_or_default();
      let key = content_key(identifier, document);

      if self.policy == DuplicatePolicy::Skip && !seen.insert(key.clone()) {
        outcome.skipped_duplicates += 1;
        continue;
      }
      pending.push((document.clone(), metadata.clone(), key));
    }

    if pending.is_empty() {
      return Ok(outcome);
    }

    let texts: Vec<String> = pending.iter().map(|(document, _, _)| document.clone()).collect();
    let embeddings = self.embedder.embed_batch(&texts).await?;

    let entries: Vec<IndexedEntry> = pending
      .into_iter()
      .zip(embeddings)
      .map(|((document, metadata, key), embedding)| {
        IndexedEntry::new(document, metadata, key, embedding)
      })
      .collect();

    outcome.added = entries.len();
    self.store.append(entries).await?;

    tracing::debug!(
      collection = %self.name,
      added = outcome.added,
      skipped = outcome.skipped_duplicates,
      "Added documents"
    );
    Ok(outcome)
  }

  /// Top `k` entries for `query_text`, best first
  pub async fn query_with_score(&self, query_text: &str, k: usize) -> Result<Vec<ScoredDocument>> {
    let stored = self.store.count().await?;
    if k == 0 || stored == 0 {
      return Ok(vec![]);
    }

    // Backends never see a limit larger than what they hold
    let limit = k.min(stored);
    let query = self.embedder.embed(query_text).await?;
    let mut hits = self.store.search(&query, limit).await?;
    hits.truncate(limit);

    tracing::debug!(collection = %self.name, k, hits = hits.len(), "Queried collection");
    Ok(hits)
  }

  pub async fn count(&self) -> Result<usize> {
    self.store.count().await
  }
}

/// Collection names double as directory and table names
pub fn validate_collection_name(name: &str) -> Result<(), IndexError> {
  let valid = !name.is_empty()
    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

  if valid {
    Ok(())
  } else {
    Err(IndexError::invalid_collection_name(name))
  }
}

/// SHA-256 over identifier and document, hex encoded
pub fn content_key(identifier: &str, document: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(identifier.as_bytes());
  hasher.update([0u8]);
  hasher.update(document.as_bytes());
  format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embedding::{HashingEmbedder, MockEmbedder};
  use super::flat::FlatStore;
  use std::sync::Arc;
  use tempfile::TempDir;

  fn metadata(shipment_id: &str) -> Metadata {
    Metadata::from([
      (SHIPMENT_ID_KEY.to_string(), shipment_id.to_string()),
      (SOURCE_KEY.to_string(), "conversations".to_string()),
    ])
  }

  fn collection(temp: &TempDir, policy: DuplicatePolicy) -> Collection {
    let store = FlatStore::open(temp.path(), "conversations").unwrap();
    Collection::new("conversations", Box::new(store), Arc::new(HashingEmbedder::new(64)), policy)
      .unwrap()
  }

  #[test]
  fn test_collection_name_validation() {
    assert!(validate_collection_name("conversations").is_ok());
    assert!(validate_collection_name("admin_corrections-2").is_ok());
    assert!(validate_collection_name("").is_err());
    assert!(validate_collection_name("../escape").is_err());
    assert!(validate_collection_name("has space").is_err());
  }

  #[test]
  fn test_content_key_depends_on_identifier_and_document() {
    let a = content_key("101", "Package delayed");
    assert_eq!(a, content_key("101", "Package delayed"));
    assert_ne!(a, content_key("102", "Package delayed"));
    assert_ne!(a, content_key("101", "Package lost"));
    assert_ne!(content_key("1", "01 text"), content_key("10", "1 text"));
    assert_eq!(a.len(), 64);
  }

  #[tokio::test]
  async fn test_add_rejects_length_mismatch() {
    let temp = TempDir::new().unwrap();
    let collection = collection(&temp, DuplicatePolicy::Skip);

    let err = collection.add(&["one".to_string()], &[]).await.unwrap_err();
    assert!(matches!(
      err.downcast_ref::<IndexError>(),
      Some(IndexError::LengthMismatch { documents: 1, metadatas: 0 })
    ));
    assert_eq!(collection.count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_query_empty_collection_skips_embedder() {
    let temp = TempDir::new().unwrap();
    let store = FlatStore::open(temp.path(), "empty").unwrap();
    let embedder = Arc::new(MockEmbedder::new(4));
    let collection =
      Collection::new("empty", Box::new(store), embedder.clone(), DuplicatePolicy::Skip).unwrap();

    let hits = collection.query_with_score("anything", 3).await.unwrap();
    assert!(hits.is_empty());
    assert_eq!(embedder.calls(), 0);
  }

  #[tokio::test]
  async fn test_exact_text_scores_one() {
    let temp = TempDir::new().unwrap();
    let collection = collection(&temp, DuplicatePolicy::Skip);
    let docs = vec!["User: Package delayed".to_string(), "User: Wrong address".to_string()];
    collection.add(&docs, &[metadata("1"), metadata("2")]).await.unwrap();

    let hits = collection.query_with_score("User: Wrong address", 2).await.unwrap();
    assert_eq!(hits[0].text, "User: Wrong address");
    assert!((hits[0].score - 1.0).abs() < 1e-5);
    assert_eq!(hits[0].metadata.get(SHIPMENT_ID_KEY).unwrap(), "2");
    assert!(hits[0].score >= hits[1].score);
  }

  #[tokio::test]
  async fn test_query_k_zero_is_empty() {
    let temp = TempDir::new().unwrap();
    let collection = collection(&temp, DuplicatePolicy::Skip);
    collection.add(&["User: hello".to_string()], &[metadata("1")]).await.unwrap();

    assert!(collection.query_with_score("hello", 0).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_skip_policy_drops_repeats_within_and_across_batches() {
    let temp = TempDir::new().unwrap();
    let collection = collection(&temp, DuplicatePolicy::Skip);
    let docs = vec!["User: same".to_string(), "User: same".to_string()];

    let first = collection.add(&docs, &[metadata("1"), metadata("1")]).await.unwrap();
    assert_eq!(first, AddOutcome { added: 1, skipped_duplicates: 1 });

    let second = collection.add(&docs[..1], &[metadata("1")]).await.unwrap();
    assert_eq!(second, AddOutcome { added: 0, skipped_duplicates: 1 });
    assert_eq!(collection.count().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_skip_policy_sees_rows_from_other_handles() {
    let temp = TempDir::new().unwrap();
    let writer = collection(&temp, DuplicatePolicy::Skip);
    let long_lived = collection(&temp, DuplicatePolicy::Skip);
    assert_eq!(long_lived.count().await.unwrap(), 0);

    writer.add(&["User: same".to_string()], &[metadata("1")]).await.unwrap();

    let outcome = long_lived.add(&["User: same".to_string()], &[metadata("1")]).await.unwrap();
    assert_eq!(outcome, AddOutcome { added: 0, skipped_duplicates: 1 });
    assert_eq!(long_lived.count().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_append_policy_keeps_repeats() {
    let temp = TempDir::new().unwrap();
    let collection = collection(&temp, DuplicatePolicy::Append);
    let docs = vec!["User: same".to_string()];

    collection.add(&docs, &[metadata("1")]).await.unwrap();
    collection.add(&docs, &[metadata("1")]).await.unwrap();
    assert_eq!(collection.count().await.unwrap(), 2);
  }

  #[tokio::test]
  async fn test_embedding_failure_leaves_collection_unchanged() {
    let temp = TempDir::new().unwrap();
    let store = FlatStore::open(temp.path(), "conversations").unwrap();
    let mut embedder = MockEmbedder::new(4);
    embedder.fail_on_texts = vec!["bad".to_string()];
    let collection =
      Collection::new("conversations", Box::new(store), Arc::new(embedder), DuplicatePolicy::Skip)
        .unwrap();

    let docs = vec!["good".to_string(), "bad".to_string()];
    let result = collection.add(&docs, &[metadata("1"), metadata("2")]).await;

    assert!(result.is_err());
    assert_eq!(collection.count().await.unwrap(), 0);
  }
}

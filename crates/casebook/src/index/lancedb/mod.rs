//! LanceDB vector store
//!
//! One LanceDB database per collection under `<index_root>/<collection>/`,
//! holding a single table named after the collection. Search uses cosine
//! distance, converted to a similarity like every other backend.

pub mod connection;
pub mod records;
pub mod search;
pub mod table_manager;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::Mutex;

use super::models::{IndexedEntry, ScoredDocument};
use super::{validate_collection_name, VectorStore};
use crate::error::IndexError;
use connection::create_connection;
use table_manager::TableManager;

pub struct LanceStore {
  collection: String,
  table_manager: TableManager,
  write_guard: Mutex<()>,
}

impl LanceStore {
  pub async fn open(index_root: &Path, collection: &str) -> Result<Self> {
    validate_collection_name(collection)?;

    let connection = create_connection(&index_root.join(collection)).await?;
    let table_manager = TableManager::new(connection, collection.to_string());

    Ok(Self { collection: collection.to_string(), table_manager, write_guard: Mutex::new(()) })
  }
}

#[async_trait]
impl VectorStore for LanceStore {
  async fn append(&self, entries: Vec<IndexedEntry>) -> Result<()> {
    let Some(first) = entries.first() else {
      return Ok(());
    };

    let _guard = self.write_guard.lock().await;
    let expected = self.table_manager.stored_dimension().await?.unwrap_or(first.embedding.len());

    if let Some(entry) = entries.iter().find(|e| e.embedding.len() != expected) {
      return Err(
        IndexError::DimensionMismatch {
          collection: self.collection.clone(),
          expected,
          actual: entry.embedding.len(),
        }
        .into(),
      );
    }

    self.table_manager.add_entries(&entries, expected).await?;
    tracing::debug!(table = self.table_manager.table_name(), added = entries.len(), "Stored entries");
    Ok(())
  }

  async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredDocument>> {
    if limit == 0 || !self.table_manager.table_exists().await? {
      return Ok(vec![]);
    }
    let table = self.table_manager.get_table().await?;
    search::search_similar(&table, query, limit).await
  }

  async fn count(&self) -> Result<usize> {
    self.table_manager.count().await
  }

  async fn content_keys(&self) -> Result<HashSet<String>> {
    self.table_manager.content_keys().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::Metadata;
  use tempfile::TempDir;

  fn entry(document: &str, embedding: Vec<f32>) -> IndexedEntry {
    IndexedEntry::new(
      document.to_string(),
      Metadata::from([("shipment_id".to_string(), "1".to_string())]),
      crate::index::content_key("1", document),
      embedding,
    )
  }

  #[tokio::test]
  async fn test_append_search_and_reopen() {
    let temp = TempDir::new().unwrap();
    let store = LanceStore::open(temp.path(), "conversations").await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);

    store.append(vec![entry("same", vec![1.0, 0.0]), entry("other", vec![0.0, 1.0])]).await.unwrap();

    let hits = store.search(&[1.0, 0.0], 2).await.unwrap();
    assert_eq!(hits[0].text, "same");
    assert!((hits[0].score - 1.0).abs() < 1e-4);
    assert_eq!(hits[0].metadata.get("shipment_id").unwrap(), "1");

    let reopened = LanceStore::open(temp.path(), "conversations").await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 2);
    assert_eq!(reopened.content_keys().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_dimension_mismatch_rejected() {
    let temp = TempDir::new().unwrap();
    let store = LanceStore::open(temp.path(), "c").await.unwrap();
    store.append(vec![entry("a", vec![1.0, 0.0])]).await.unwrap();

    let err = store.append(vec![entry("b", vec![1.0, 0.0, 0.0])]).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<IndexError>(), Some(IndexError::DimensionMismatch { .. })));
  }
}

//! Process-wide collection handles
//!
//! Collections are opened lazily on first use and kept for the life of the
//! registry, so every caller shares one handle (and one in-memory view) per
//! collection name.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::flat::FlatStore;
use super::{validate_collection_name, Collection, DuplicatePolicy, VectorStore};
use crate::config::{Config, IndexBackend};
use crate::embedding::{self, SharedEmbedder};

pub struct CollectionRegistry {
  index_root: PathBuf,
  backend: IndexBackend,
  embedder: SharedEmbedder,
  policy: DuplicatePolicy,
  collections: Mutex<HashMap<String, Arc<Collection>>>,
}

impl CollectionRegistry {
  pub fn new(
    index_root: impl Into<PathBuf>,
    backend: IndexBackend,
    embedder: SharedEmbedder,
    policy: DuplicatePolicy,
  ) -> Self {
    Self {
      index_root: index_root.into(),
      backend,
      embedder,
      policy,
      collections: Mutex::new(HashMap::new()),
    }
  }

  /// Build the registry and its embedder from configuration
  pub fn from_config(config: &Config) -> Result<Self> {
    let embedder =
      embedding::from_config(&config.embedder).context("Failed to initialize embedder")?;

    tracing::debug!(
      model = embedder.model(),
      dimension = embedder.dimension(),
      index = %config.index_dir().display(),
      "Initialized collection registry"
    );

    Ok(Self::new(config.index_dir(), config.index.backend, embedder, config.index.duplicates))
  }

  /// Get the handle for `name`, opening it on first use
  pub async fn collection(&self, name: &str) -> Result<Arc<Collection>> {
    validate_collection_name(name)?;

    let mut collections = self.collections.lock().await;
    if let Some(collection) = collections.get(name) {
      return Ok(Arc::clone(collection));
    }

    let store = self.open_store(name).await?;
    let collection = Arc::new(Collection::new(name, store, self.embedder.clone(), self.policy)?);
    collections.insert(name.to_string(), Arc::clone(&collection));

    tracing::debug!(collection = name, backend = ?self.backend, "Opened collection");
    Ok(collection)
  }

  async fn open_store(&self, name: &str) -> Result<Box<dyn VectorStore>> {
    match self.backend {
      IndexBackend::Flat => Ok(Box::new(FlatStore::open(&self.index_root, name)?)),
      IndexBackend::Lancedb => open_lancedb_store(&self.index_root, name).await,
    }
  }
}

#[cfg(feature = "lancedb")]
async fn open_lancedb_store(index_root: &Path, name: &str) -> Result<Box<dyn VectorStore>> {
  let store = super::lancedb::LanceStore::open(index_root, name).await?;
  Ok(Box::new(store))
}

#[cfg(not(feature = "lancedb"))]
async fn open_lancedb_store(_index_root: &Path, _name: &str) -> Result<Box<dyn VectorStore>> {
  Err(crate::error::IndexError::BackendUnavailable { backend: "lancedb".to_string() }.into())
}

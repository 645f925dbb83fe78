//! Table management operations for LanceDB

use anyhow::{anyhow, Result};
use arrow::record_batch::RecordBatchIterator;
use futures::stream::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, Table};
use std::collections::HashSet;

use super::records::{entries_to_batch, schema_dimension};
use super::search::string_column;
use crate::index::models::IndexedEntry;

/// Owns the single table backing one collection
pub struct TableManager {
  connection: Connection,
  table_name: String,
}

impl TableManager {
  pub fn new(connection: Connection, table_name: String) -> Self {
    Self { connection, table_name }
  }

  pub fn table_name(&self) -> &str {
    &self.table_name
  }

  /// Check if the target table exists
  pub async fn table_exists(&self) -> Result<bool> {
    let tables = self
      .connection
      .table_names()
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to list tables: {}", e))?;
    Ok(tables.contains(&self.table_name))
  }

  pub async fn get_table(&self) -> Result<Table> {
    self
      .connection
      .open_table(&self.table_name)
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to open table '{}': {}", self.table_name, e))
  }

  /// Embedding dimension of the existing table, `None` before the first write
  pub async fn stored_dimension(&self) -> Result<Option<usize>> {
    if !self.table_exists().await? {
      return Ok(None);
    }
    let schema = self.get_table().await?.schema().await?;
    Ok(schema_dimension(&schema))
  }

  /// Append entries, creating the table on first write
  pub async fn add_entries(&self, entries: &[IndexedEntry], dimension: usize) -> Result<()> {
    let batch = entries_to_batch(entries, dimension)?;
    let schema = batch.schema();
    let batch_iter = RecordBatchIterator::new(vec![Ok(batch)], schema);

    if self.table_exists().await? {
      self
        .get_table()
        .await?
        .add(batch_iter)
        .execute()
        .await
        .map_err(|e| anyhow!("Failed to store entries: {}", e))?;
    } else {
      self
        .connection
        .create_table(&self.table_name, batch_iter)
        .execute()
        .await
        .map_err(|e| anyhow!("Failed to create table '{}': {}", self.table_name, e))?;
      tracing::info!(table = %self.table_name, dimension, "Created LanceDB table");
    }

    Ok(())
  }

  pub async fn count(&self) -> Result<usize> {
    if !self.table_exists().await? {
      return Ok(0);
    }
    Ok(self.get_table().await?.count_rows(None).await?)
  }

  pub async fn content_keys(&self) -> Result<HashSet<String>> {
    let mut keys = HashSet::new();
    if !self.table_exists().await? {
      return Ok(keys);
    }

    let mut stream = self
      .get_table()
      .await?
      .query()
      .select(Select::columns(&["content_key"]))
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to read content keys: {}", e))?;

    while let Some(batch_result) = stream.next().await {
      let batch = batch_result.map_err(|e| anyhow!("Error reading batch: {}", e))?;
      let column = string_column(&batch, "content_key")?;
      keys.extend(column.iter().flatten().map(str::to_string));
    }

    Ok(keys)
  }
}

//! Database connection management for LanceDB

use anyhow::{anyhow, Result};
use lancedb::{connect, Connection};
use std::path::Path;

/// Create a LanceDB connection, creating the database directory if needed
pub async fn create_connection(db_dir: &Path) -> Result<Connection> {
  std::fs::create_dir_all(db_dir)
    .map_err(|e| anyhow!("Failed to create database directory {}: {}", db_dir.display(), e))?;

  connect(&db_dir.to_string_lossy())
    .execute()
    .await
    .map_err(|e| anyhow!("Failed to connect to LanceDB at {}: {}", db_dir.display(), e))
}

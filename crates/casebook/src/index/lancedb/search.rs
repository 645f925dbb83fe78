//! Vector search and result decoding for LanceDB

use anyhow::{anyhow, Result};
use arrow::array::{Array, Float32Array, StringArray};
use arrow::record_batch::RecordBatch;
use futures::stream::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};

use super::records::EMBEDDING_COLUMN;
use crate::index::{Metadata, ScoredDocument};
use crate::similarity::distance_to_similarity;

/// Cosine nearest-neighbour search, best first
pub async fn search_similar(
  table: &Table,
  query: &[f32],
  limit: usize,
) -> Result<Vec<ScoredDocument>> {
  let mut stream = table
    .vector_search(query)?
    .column(EMBEDDING_COLUMN)
    .distance_type(DistanceType::Cosine)
    .limit(limit)
    .execute()
    .await
    .map_err(|e| anyhow!("Vector search failed: {}", e))?;

  let mut hits = Vec::new();
  while let Some(batch_result) = stream.next().await {
    let batch = batch_result.map_err(|e| anyhow!("Error reading batch: {}", e))?;
    hits.extend(decode_batch(&batch)?);
  }

  hits.sort_by(|a, b| b.score.total_cmp(&a.score));
  Ok(hits)
}

fn decode_batch(batch: &RecordBatch) -> Result<Vec<ScoredDocument>> {
  let documents = string_column(batch, "document")?;
  let metadata = string_column(batch, "metadata")?;
  let distances = batch
    .column_by_name("_distance")
    .and_then(|col| col.as_any().downcast_ref::<Float32Array>())
    .ok_or_else(|| anyhow!("Missing '_distance' column"))?;

  let mut hits = Vec::with_capacity(batch.num_rows());
  for row in 0..batch.num_rows() {
    let distance = if distances.is_null(row) { f32::NAN } else { distances.value(row) };

    let metadata: Metadata = serde_json::from_str(metadata.value(row)).unwrap_or_else(|e| {
      tracing::warn!("Ignoring unreadable metadata in search result: {e}");
      Metadata::new()
    });

    hits.push(ScoredDocument {
      text: documents.value(row).to_string(),
      metadata,
      score: distance_to_similarity(distance),
    });
  }

  Ok(hits)
}

/// Extract a string column from the batch
pub fn string_column<'a>(batch: &'a RecordBatch, column_name: &str) -> Result<&'a StringArray> {
  batch
    .column_by_name(column_name)
    .ok_or_else(|| anyhow!("Missing '{}' column", column_name))?
    .as_any()
    .downcast_ref::<StringArray>()
    .ok_or_else(|| anyhow!("Failed to cast '{}' column to StringArray", column_name))
}

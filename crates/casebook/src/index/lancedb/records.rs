//! Arrow RecordBatch conversion for indexed entries

use anyhow::{anyhow, Result};
use arrow::array::{Array, FixedSizeListBuilder, Float32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::index::models::IndexedEntry;

pub const EMBEDDING_COLUMN: &str = "embedding";

/// Arrow schema for a collection whose vectors have `dimension` components
pub fn entry_schema(dimension: usize) -> Arc<Schema> {
  Arc::new(Schema::new(vec![
    Field::new("id", DataType::Utf8, false),
    Field::new("document", DataType::Utf8, false),
    Field::new("metadata", DataType::Utf8, false),
    Field::new("content_key", DataType::Utf8, false),
    Field::new("created_at", DataType::Utf8, false),
    Field::new(
      EMBEDDING_COLUMN,
      DataType::FixedSizeList(
        Arc::new(Field::new("item", DataType::Float32, true)),
        dimension as i32,
      ),
      false,
    ),
  ]))
}

/// Embedding dimension declared by a table schema, if it has the column
pub fn schema_dimension(schema: &Schema) -> Option<usize> {
  match schema.field_with_name(EMBEDDING_COLUMN).ok()?.data_type() {
    DataType::FixedSizeList(_, size) => Some(*size as usize),
    _ => None,
  }
}

/// Convert entries of one dimension into a RecordBatch
pub fn entries_to_batch(entries: &[IndexedEntry], dimension: usize) -> Result<RecordBatch> {
  if entries.is_empty() {
    return Err(anyhow!("Cannot create RecordBatch from empty entries"));
  }

  let metadata: Vec<String> =
    entries.iter().map(|e| serde_json::to_string(&e.metadata)).collect::<Result<_, _>>()?;
  let created_at: Vec<String> = entries.iter().map(|e| e.created_at.to_rfc3339()).collect();

  let columns: Vec<Arc<dyn Array>> = vec![
    Arc::new(string_column(entries, |e| &e.id)),
    Arc::new(string_column(entries, |e| &e.document)),
    Arc::new(StringArray::from_iter_values(metadata)),
    Arc::new(string_column(entries, |e| &e.content_key)),
    Arc::new(StringArray::from_iter_values(created_at)),
    Arc::new(embedding_column(entries, dimension)),
  ];

  RecordBatch::try_new(entry_schema(dimension), columns)
    .map_err(|e| anyhow!("Failed to create RecordBatch: {}", e))
}

fn string_column<F>(entries: &[IndexedEntry], field_fn: F) -> StringArray
where
  F: Fn(&IndexedEntry) -> &str,
{
  StringArray::from_iter_values(entries.iter().map(field_fn))
}

fn embedding_column(
  entries: &[IndexedEntry],
  dimension: usize,
) -> arrow::array::FixedSizeListArray {
  let mut builder = FixedSizeListBuilder::new(
    Float32Array::builder(dimension * entries.len()),
    dimension as i32,
  );

  for entry in entries {
    builder.values().append_slice(&entry.embedding);
    builder.append(true);
  }

  builder.finish()
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::IngestReport;
use crate::index::{CollectionRegistry, Metadata, SHIPMENT_ID_KEY, SOURCE_KEY};

pub const COLLECTION: &str = "corrections";

/// One admin correction, mapped from the CSV header
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorrectionRow {
  pub issue_description: String,
  pub shipment_id: String,
  pub prompt: String,
  pub response: String,
  pub feedback: String,
  pub corrected: String,
}

impl CorrectionRow {
  /// Flatten into the text blob that gets embedded
  pub fn to_document(&self) -> String {
    format!(
      "Issue: {}\nShipment ID: {}\nPrompt: {}\nResponse: {}\nFeedback: {}\nCorrection: {}",
      self.issue_description,
      self.shipment_id,
      self.prompt,
      self.response,
      self.feedback,
      self.corrected
    )
  }

  fn missing_field(&self) -> Option<&'static str> {
    [
      ("shipment_id", &self.shipment_id),
      ("issue_description", &self.issue_description),
      ("corrected", &self.corrected),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
  }
}

/// Populate the "corrections" collection from a CSV source.
///
/// A missing source file is not an error: there may simply be no corrections yet.
pub async fn ingest_corrections(registry: &CollectionRegistry, path: &Path) -> Result<IngestReport> {
  let mut report = IngestReport::empty(COLLECTION);

  if !path.exists() {
    tracing::debug!(path = %path.display(), "No corrections file, nothing to ingest");
    return Ok(report);
  }

  let mut reader = csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .from_path(path)
    .with_context(|| format!("Failed to open corrections {}", path.display()))?;

  let mut documents = Vec::new();
  let mut metadatas = Vec::new();

  for (index, result) in reader.deserialize::<CorrectionRow>().enumerate() {
    report.read += 1;

    let row = match result {
      Ok(row) => row,
      Err(e) => {
        tracing::warn!(row = index + 1, "Skipping unreadable correction row: {e}");
        report.skipped_records += 1;
        continue;
      }
    };

    if let Some(field) = row.missing_field() {
      tracing::warn!(row = index + 1, "Skipping correction row with blank {field}");
      report.skipped_records += 1;
      continue;
    }

    metadatas.push(Metadata::from([
      (SHIPMENT_ID_KEY.to_string(), row.shipment_id.clone()),
      (SOURCE_KEY.to_string(), COLLECTION.to_string()),
    ]));
    documents.push(row.to_document());
  }

  if !documents.is_empty() {
    let collection = registry.collection(COLLECTION).await?;
    let outcome = collection.add(&documents, &metadatas).await?;
    report.added = outcome.added;
    report.skipped_duplicates = outcome.skipped_duplicates;
  }

  tracing::info!(
    collection = COLLECTION,
    read = report.read,
    added = report.added,
    skipped = report.skipped_records,
    duplicates = report.skipped_duplicates,
    "Ingested corrections"
  );
  Ok(report)
}

//! Shipment exception lookup and rule-based next actions

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ingest::{load_conversations, ConversationTurn};

/// An exception recorded against a shipment in the shipment log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentException {
  pub shipment_id: u64,
  pub exception_type: String,
  pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipmentLookup {
  Found(ShipmentException),
  NotFound,
  /// The identifier is not a shipment number
  InvalidId,
}

#[derive(Deserialize)]
struct RawLogRow {
  shipment_id: String,
  #[serde(default)]
  exception_type: String,
  #[serde(default)]
  details: String,
}

#[derive(Debug, Clone, Default)]
pub struct ShipmentLog {
  exceptions: Vec<ShipmentException>,
}

impl ShipmentLog {
  /// Read the shipment log CSV; rows without a numeric id are skipped
  pub fn load(path: &Path) -> Result<Self> {
    let mut reader = csv::ReaderBuilder::new()
      .trim(csv::Trim::All)
      .from_path(path)
      .with_context(|| format!("Failed to open shipment log {}", path.display()))?;

    let mut exceptions = Vec::new();
    for (index, result) in reader.deserialize::<RawLogRow>().enumerate() {
      let parsed = result.map_err(|e| e.to_string()).and_then(|row| {
        let shipment_id = row
          .shipment_id
          .parse::<u64>()
          .map_err(|_| format!("non-numeric shipment_id '{}'", row.shipment_id))?;
        Ok(ShipmentException {
          shipment_id,
          exception_type: row.exception_type,
          details: row.details,
        })
      });

      match parsed {
        Ok(exception) => exceptions.push(exception),
        Err(reason) => tracing::warn!(row = index + 1, "Skipping shipment log row: {reason}"),
      }
    }

    Ok(Self { exceptions })
  }

  pub fn len(&self) -> usize {
    self.exceptions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.exceptions.is_empty()
  }

  /// First exception logged for `shipment_id`
  pub fn lookup(&self, shipment_id: &str) -> ShipmentLookup {
    let Ok(id) = shipment_id.trim().parse::<u64>() else {
      return ShipmentLookup::InvalidId;
    };

    match self.exceptions.iter().find(|exception| exception.shipment_id == id) {
      Some(exception) => ShipmentLookup::Found(exception.clone()),
      None => ShipmentLookup::NotFound,
    }
  }
}

/// Turns of the first conversation recorded for `shipment_id`
pub fn conversation_history(path: &Path, shipment_id: &str) -> Result<Vec<ConversationTurn>> {
  if !path.exists() {
    tracing::debug!(path = %path.display(), "No conversation source, history is empty");
    return Ok(vec![]);
  }

  let shipment_id = shipment_id.trim();
  let loaded = load_conversations(path)?;
  Ok(
    loaded
      .cases
      .into_iter()
      .find(|case| case.shipment_id == shipment_id)
      .map(|case| case.turns)
      .unwrap_or_default(),
  )
}

/// Next step for an exception type
pub fn recommend_action(exception_type: &str) -> &'static str {
  match exception_type.trim() {
    "address_issue" => "Request updated address from customer.",
    "delivery_failed" => "Schedule a re-delivery attempt.",
    _ => "Escalate to human agent.",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn write_log(temp: &TempDir) -> std::path::PathBuf {
    let path = temp.path().join("shipment_logs.csv");
    std::fs::write(
      &path,
      "shipment_id,exception_type,details\n\
       101,delivery_failed,Nobody home at 5pm\n\
       abc,address_issue,bad row\n\
       102,address_issue,Street number missing\n\
       101,address_issue,Later duplicate\n",
    )
    .unwrap();
    path
  }

  #[test]
  fn test_lookup_variants() {
    let temp = TempDir::new().unwrap();
    let log = ShipmentLog::load(&write_log(&temp)).unwrap();
    assert_eq!(log.len(), 3);

    match log.lookup(" 101 ") {
      ShipmentLookup::Found(exception) => {
        assert_eq!(exception.exception_type, "delivery_failed");
        assert_eq!(exception.details, "Nobody home at 5pm");
      }
      other => panic!("expected Found, got {other:?}"),
    }
    assert_eq!(log.lookup("999"), ShipmentLookup::NotFound);
    assert_eq!(log.lookup("abc"), ShipmentLookup::InvalidId);
    assert_eq!(log.lookup(""), ShipmentLookup::InvalidId);
  }

  #[test]
  fn test_header_only_log_is_empty() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("shipment_logs.csv");
    std::fs::write(&path, "shipment_id,exception_type,details\n").unwrap();

    let log = ShipmentLog::load(&path).unwrap();
    assert!(log.is_empty());
    assert_eq!(log.lookup("101"), ShipmentLookup::NotFound);
  }

  #[test]
  fn test_missing_log_is_error() {
    let temp = TempDir::new().unwrap();
    assert!(ShipmentLog::load(&temp.path().join("none.csv")).is_err());
  }

  #[test]
  fn test_recommend_action() {
    assert_eq!(recommend_action("address_issue"), "Request updated address from customer.");
    assert_eq!(recommend_action("delivery_failed"), "Schedule a re-delivery attempt.");
    assert_eq!(recommend_action("customs_hold"), "Escalate to human agent.");
  }

  #[test]
  fn test_conversation_history() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("conversations.json");
    std::fs::write(
      &path,
      r#"[{"shipment_id": 7, "conversation": [{"role": "user", "content": "Where is it?"}]}]"#,
    )
    .unwrap();

    let history = conversation_history(&path, "7").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "Where is it?");
    assert!(conversation_history(&path, "8").unwrap().is_empty());
    assert!(conversation_history(&temp.path().join("none.json"), "7").unwrap().is_empty());
  }
}

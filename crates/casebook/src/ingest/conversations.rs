use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::IngestReport;
use crate::index::{CollectionRegistry, Metadata, SHIPMENT_ID_KEY, SOURCE_KEY};

pub const COLLECTION: &str = "conversations";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
  pub role: String,
  pub content: String,
}

/// A past support conversation keyed by shipment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationCase {
  pub shipment_id: String,
  pub turns: Vec<ConversationTurn>,
}

/// Well-formed cases from a conversation source plus what was dropped
#[derive(Debug, Default)]
pub struct LoadedConversations {
  pub cases: Vec<ConversationCase>,
  pub read: usize,
  pub skipped: usize,
}

/// Read a JSON array of conversation records.
///
/// A missing file or a document that is not an array is an error; individual
/// malformed records are skipped with a warning.
pub fn load_conversations(path: &Path) -> Result<LoadedConversations> {
  let content = fs::read_to_string(path)
    .with_context(|| format!("Failed to read conversations from {}", path.display()))?;

  let document: Value = serde_json::from_str(&content)
    .with_context(|| format!("Failed to parse conversations in {}", path.display()))?;

  let records = document
    .as_array()
    .ok_or_else(|| anyhow!("Expected a JSON array of conversations in {}", path.display()))?;

  let mut loaded = LoadedConversations { read: records.len(), ..Default::default() };

  for (index, record) in records.iter().enumerate() {
    match parse_case(record) {
      Ok(case) => loaded.cases.push(case),
      Err(reason) => {
        tracing::warn!(record = index, "Skipping conversation record: {reason}");
        loaded.skipped += 1;
      }
    }
  }

  Ok(loaded)
}

fn parse_case(record: &Value) -> Result<ConversationCase, String> {
  let shipment_id = match record.get("shipment_id") {
    Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
    Some(Value::Number(id)) if id.is_i64() || id.is_u64() => id.to_string(),
    Some(_) => return Err("shipment_id must be a string or integer".to_string()),
    None => return Err("missing shipment_id".to_string()),
  };

  let turns = record
    .get("conversation")
    .and_then(Value::as_array)
    .ok_or_else(|| format!("shipment {shipment_id}: missing conversation array"))?;

  if turns.is_empty() {
    return Err(format!("shipment {shipment_id}: conversation has no turns"));
  }

  let turns = turns
    .iter()
    .map(|turn| {
      let role = turn.get("role").and_then(Value::as_str);
      let content = turn.get("content").and_then(Value::as_str);
      match (role, content) {
        (Some(role), Some(content)) => {
          Ok(ConversationTurn { role: role.to_string(), content: content.to_string() })
        }
        _ => Err(format!("shipment {shipment_id}: turn missing role or content")),
      }
    })
    .collect::<Result<Vec<_>, _>>()?;

  Ok(ConversationCase { shipment_id, turns })
}

/// Flatten turns into `"<Role>: <content>"` lines
pub fn flatten_conversation(turns: &[ConversationTurn]) -> String {
  turns
    .iter()
    .map(|turn| format!("{}: {}", capitalize(&turn.role), turn.content))
    .collect::<Vec<_>>()
    .join("\n")
}

/// First character upper-cased, the rest lower-cased
fn capitalize(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}

/// Populate the "conversations" collection from a JSON case source
pub async fn ingest_conversations(
  registry: &CollectionRegistry,
  path: &Path,
) -> Result<IngestReport> {
  let loaded = load_conversations(path)?;
  let mut report = IngestReport {
    read: loaded.read,
    skipped_records: loaded.skipped,
    ..IngestReport::empty(COLLECTION)
  };

  let (documents, metadatas): (Vec<String>, Vec<Metadata>) = loaded
    .cases
    .iter()
    .map(|case| {
      let metadata = Metadata::from([
        (SHIPMENT_ID_KEY.to_string(), case.shipment_id.clone()),
        (SOURCE_KEY.to_string(), COLLECTION.to_string()),
      ]);
      (flatten_conversation(&case.turns), metadata)
    })
    .unzip();

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
    "Ingested conversations"
  );
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;
  use tempfile::NamedTempFile;

  fn write_source(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
  }

  #[test]
  fn test_flatten_capitalizes_roles() {
    let turns = vec![
      ConversationTurn { role: "user".into(), content: "Package delayed".into() },
      ConversationTurn { role: "ASSISTANT".into(), content: "We are checking".into() },
    ];
    assert_eq!(flatten_conversation(&turns), "User: Package delayed\nAssistant: We are checking");
  }

  #[test]
  fn test_capitalize_edge_cases() {
    assert_eq!(capitalize(""), "");
    assert_eq!(capitalize("a"), "A");
    assert_eq!(capitalize("sUPPORT agent"), "Support agent");
  }

  #[test]
  fn test_load_accepts_string_and_integer_ids() {
    let file = write_source(
      r#"[
        {"shipment_id": "101", "conversation": [{"role": "user", "content": "hi"}]},
        {"shipment_id": 102, "conversation": [{"role": "user", "content": "hello"}]}
      ]"#,
    );
    let loaded = load_conversations(file.path()).unwrap();

    assert_eq!(loaded.read, 2);
    assert_eq!(loaded.skipped, 0);
    assert_eq!(loaded.cases[0].shipment_id, "101");
    assert_eq!(loaded.cases[1].shipment_id, "102");
  }

  #[test]
  fn test_load_skips_malformed_records() {
    let file = write_source(
      r#"[
        {"conversation": [{"role": "user", "content": "no id"}]},
        {"shipment_id": "1"},
        {"shipment_id": "2", "conversation": []},
        {"shipment_id": "3", "conversation": [{"role": "user"}]},
        {"shipment_id": 4.5, "conversation": [{"role": "user", "content": "x"}]},
        {"shipment_id": "5", "conversation": [{"role": "user", "content": "fine"}]}
      ]"#,
    );
    let loaded = load_conversations(file.path()).unwrap();

    assert_eq!(loaded.read, 6);
    assert_eq!(loaded.skipped, 5);
    assert_eq!(loaded.cases.len(), 1);
    assert_eq!(loaded.cases[0].shipment_id, "5");
  }

  #[test]
  fn test_load_rejects_non_array() {
    let file = write_source(r#"{"shipment_id": "1"}"#);
    assert!(load_conversations(file.path()).is_err());
  }

  #[test]
  fn test_load_rejects_missing_file() {
    assert!(load_conversations(Path::new("/definitely/not/here.json")).is_err());
  }
}

//! Case store adapters
//!
//! Read flat-file case sources, normalize every record into a
//! (document, metadata) pair and add them to their collection. Malformed
//! records are skipped and counted rather than failing the whole pass.

pub mod conversations;
pub mod corrections;

use serde::Serialize;
use std::fmt;

pub use conversations::{
  flatten_conversation, ingest_conversations, load_conversations, ConversationCase,
  ConversationTurn,
};
pub use corrections::{ingest_corrections, CorrectionRow};

/// Summary of one ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
  pub collection: String,
  /// Records found in the source
  pub read: usize,
  pub added: usize,
  pub skipped_records: usize,
  pub skipped_duplicates: usize,
}

impl IngestReport {
  pub fn empty(collection: &str) -> Self {
    Self { collection: collection.to_string(), ..Self::default() }
  }
}

impl fmt::Display for IngestReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}: read {}, added {}, skipped {} malformed, {} duplicate",
      self.collection, self.read, self.added, self.skipped_records, self.skipped_duplicates
    )
  }
}

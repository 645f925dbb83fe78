//! Grounding context for the response model
//!
//! Gathers everything known about a shipment (logged exception, earlier
//! conversation, similar past cases, admin corrections) into one text block.

use std::fmt::Write;

use crate::config::{RetrievalConfig, SourcesConfig};
use crate::ingest::{flatten_conversation, ConversationTurn};
use crate::retrieval::CaseRetriever;
use crate::shipments::{self, ShipmentLog, ShipmentLookup};

#[derive(Debug, Clone)]
pub struct GroundingContext {
  pub issue_description: String,
  pub shipment_id: String,
  pub lookup: ShipmentLookup,
  pub recommended_action: &'static str,
  pub history: Vec<ConversationTurn>,
  pub similar_conversations: Vec<String>,
  pub corrections: Vec<String>,
}

impl GroundingContext {
  /// Look up the shipment and retrieve similar cases for `issue_description`.
  ///
  /// Unreadable sources degrade to empty sections.
  pub async fn assemble(
    retriever: &CaseRetriever,
    sources: &SourcesConfig,
    retrieval: &RetrievalConfig,
    shipment_id: &str,
    issue_description: &str,
  ) -> Self {
    let lookup = match ShipmentLog::load(&sources.shipment_logs) {
      Ok(log) => log.lookup(shipment_id),
      Err(e) => {
        tracing::warn!("Shipment log unavailable: {e:#}");
        match shipment_id.trim().parse::<u64>() {
          Ok(_) => ShipmentLookup::NotFound,
          Err(_) => ShipmentLookup::InvalidId,
        }
      }
    };

    let recommended_action = match &lookup {
      ShipmentLookup::Found(exception) => shipments::recommend_action(&exception.exception_type),
      _ => shipments::recommend_action(""),
    };

    let history = shipments::conversation_history(&sources.conversations, shipment_id)
      .unwrap_or_else(|e| {
        tracing::warn!("Conversation history unavailable: {e:#}");
        vec![]
      });

    let similar_conversations = retriever
      .find_similar_conversations(
        issue_description,
        retrieval.conversations.k,
        retrieval.conversations.min_score,
      )
      .await;
    let corrections = retriever
      .find_similar_corrections(
        issue_description,
        retrieval.corrections.k,
        retrieval.corrections.min_score,
      )
      .await;

    Self {
      issue_description: issue_description.to_string(),
      shipment_id: shipment_id.trim().to_string(),
      lookup,
      recommended_action,
      history,
      similar_conversations,
      corrections,
    }
  }

  /// Render the context block handed to the response model
  pub fn render(&self) -> String {
    let mut out = String::new();

    match &self.lookup {
      ShipmentLookup::Found(exception) => {
        let _ = writeln!(out, "Exception type: {}", exception.exception_type);
        let _ = writeln!(out, "Exception details: {}", exception.details);
      }
      ShipmentLookup::NotFound => {
        let _ = writeln!(out, "Shipment {} was not found in the shipment log.", self.shipment_id);
      }
      ShipmentLookup::InvalidId => {
        let _ = writeln!(out, "'{}' is not a numeric shipment ID.", self.shipment_id);
      }
    }

    let _ = writeln!(out, "Recommended action: {}", self.recommended_action);

    if !self.history.is_empty() {
      let _ = writeln!(out, "Conversation history:\n{}", flatten_conversation(&self.history));
    }

    let _ = writeln!(out, "User issue description: {}", self.issue_description);

    render_section(&mut out, "Similar past cases:", &self.similar_conversations);
    render_section(&mut out, "Admin corrections:", &self.corrections);

    out
  }
}

fn render_section(out: &mut String, title: &str, items: &[String]) {
  if items.is_empty() {
    return;
  }
  let _ = writeln!(out, "{title}");
  for (i, item) in items.iter().enumerate() {
    let _ = writeln!(out, "{}. {}", i + 1, item);
  }
}

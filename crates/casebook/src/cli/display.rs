//! Display formatting utilities for CLI output

use colored::*;

use crate::index::{ScoredDocument, SHIPMENT_ID_KEY};
use crate::ingest::IngestReport;

const WRAP_WIDTH: usize = 80;

/// Wrap text to fit within a specified width, keeping line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    if paragraph.trim().is_empty() {
      lines.push(String::new());
      continue;
    }

    let mut current_line = String::new();
    for word in paragraph.split_whitespace() {
      if current_line.is_empty() {
        current_line = word.to_string();
      } else if current_line.len() + 1 + word.len() <= width {
        current_line.push(' ');
        current_line.push_str(word);
      } else {
        lines.push(current_line);
        current_line = word.to_string();
      }
    }

    if !current_line.is_empty() {
      lines.push(current_line);
    }
  }

  lines
}

/// Print one retrieval hit, optionally with its score
pub fn display_hit(rank: usize, hit: &ScoredDocument, show_score: bool) {
  let shipment = hit.metadata.get(SHIPMENT_ID_KEY).map(String::as_str).unwrap_or("?");
  let mut header = format!("=== #{} shipment {} ===", rank, shipment.yellow().bold());
  if show_score {
    header.push_str(&format!(" {}", format!("score {:.3}", hit.score).cyan()));
  }
  println!("{header}");

  for line in wrap_text(&hit.text, WRAP_WIDTH) {
    println!("{line}");
  }
  println!();
}

pub fn display_hits(collection: &str, query: &str, hits: &[ScoredDocument], show_scores: bool) {
  if hits.is_empty() {
    println!("No similar {} found for: {}", collection, query.yellow());
    return;
  }

  for (i, hit) in hits.iter().enumerate() {
    display_hit(i + 1, hit, show_scores);
  }
}

pub fn display_report(report: &IngestReport) {
  println!("{} {}", "✓".green(), report);
}

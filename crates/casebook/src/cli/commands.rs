use anyhow::Result;
use colored::*;
use std::path::Path;
use std::sync::Arc;

use super::display::{display_hits, display_report};
use super::CollectionKind;
use crate::config::Config;
use crate::grounding::GroundingContext;
use crate::index::CollectionRegistry;
use crate::ingest::{ingest_conversations, ingest_corrections};
use crate::retrieval::CaseRetriever;

fn retriever(config: &Config) -> Result<CaseRetriever> {
  Ok(CaseRetriever::new(Arc::new(CollectionRegistry::from_config(config)?)))
}

/// Ingest one source file into its collection
pub async fn ingest(config: &Config, kind: CollectionKind, path: &Path) -> Result<()> {
  let registry = CollectionRegistry::from_config(config)?;

  let report = match kind {
    CollectionKind::Conversations => ingest_conversations(&registry, path).await?,
    CollectionKind::Corrections => ingest_corrections(&registry, path).await?,
  };

  display_report(&report);
  Ok(())
}

/// Ingest every configured source
pub async fn ingest_all(config: &Config) -> Result<()> {
  let registry = CollectionRegistry::from_config(config)?;

  display_report(&ingest_conversations(&registry, &config.sources.conversations).await?);
  display_report(&ingest_corrections(&registry, &config.sources.corrections).await?);
  Ok(())
}

pub async fn search(
  config: &Config,
  kind: CollectionKind,
  terms: &[String],
  k: Option<usize>,
  min_score: Option<f32>,
  show_scores: bool,
) -> Result<()> {
  let defaults = match kind {
    CollectionKind::Conversations => config.retrieval.conversations,
    CollectionKind::Corrections => config.retrieval.corrections,
  };
  let query = terms.join(" ");

  let hits = retriever(config)?
    .find_similar_scored(
      kind.name(),
      &query,
      k.unwrap_or(defaults.k),
      min_score.unwrap_or(defaults.min_score),
    )
    .await?;

  display_hits(kind.name(), &query, &hits, show_scores);
  Ok(())
}

/// Show the number of entries in each collection
pub async fn count(config: &Config) -> Result<()> {
  let registry = CollectionRegistry::from_config(config)?;

  let mut total = 0;
  for kind in CollectionKind::ALL {
    let count = registry.collection(kind.name()).await?.count().await?;
    total += count;
    println!("{}: {}", kind.name().blue().bold(), count);
  }
  println!("{}: {}", "total".bold(), total);
  Ok(())
}

/// Print the grounding context for a shipment and issue
pub async fn context(config: &Config, shipment_id: &str, issue: &str) -> Result<()> {
  let retriever = retriever(config)?;
  let context =
    GroundingContext::assemble(&retriever, &config.sources, &config.retrieval, shipment_id, issue)
      .await;

  print!("{}", context.render());
  Ok(())
}

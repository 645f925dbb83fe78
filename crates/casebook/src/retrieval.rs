//! Similar-case retrieval
//!
//! Both collections share one algorithm: overfetch `2 * k` neighbours, drop
//! anything under `min_score`, keep the best `k`. Queries never fail the
//! caller; a broken index or embedder degrades to "no similar cases".

use anyhow::Result;
use std::sync::Arc;

use crate::index::{CollectionRegistry, ScoredDocument};
use crate::ingest::{conversations, corrections};

pub const DEFAULT_CONVERSATION_K: usize = 3;
pub const DEFAULT_CORRECTION_K: usize = 2;
pub const DEFAULT_MIN_SCORE: f32 = 0.75;

/// Neighbours fetched per requested result
const OVERFETCH_FACTOR: usize = 2;

#[derive(Clone)]
pub struct CaseRetriever {
  registry: Arc<CollectionRegistry>,
}

impl CaseRetriever {
  pub fn new(registry: Arc<CollectionRegistry>) -> Self {
    Self { registry }
  }

  pub fn registry(&self) -> &Arc<CollectionRegistry> {
    &self.registry
  }

  /// Past conversations similar to `query`, most similar first
  pub async fn find_similar_conversations(
    &self,
    query: &str,
    k: usize,
    min_score: f32,
  ) -> Vec<String> {
    self.find_similar(conversations::COLLECTION, query, k, min_score).await
  }

  /// Admin corrections similar to `query`, most similar first
  pub async fn find_similar_corrections(&self, query: &str, k: usize, min_score: f32) -> Vec<String> {
    self.find_similar(corrections::COLLECTION, query, k, min_score).await
  }

  /// Document texts only; failures are logged and yield an empty list
  pub async fn find_similar(
    &self,
    collection: &str,
    query: &str,
    k: usize,
    min_score: f32,
  ) -> Vec<String> {
    match self.find_similar_scored(collection, query, k, min_score).await {
      Ok(hits) => hits.into_iter().map(|hit| hit.text).collect(),
      Err(e) => {
        tracing::warn!(collection, "Similarity search failed, continuing without cases: {e:#}");
        vec![]
      }
    }
  }

  /// Scored hits, surfacing index and embedding errors to the caller
  pub async fn find_similar_scored(
    &self,
    collection: &str,
    query: &str,
    k: usize,
    min_score: f32,
  ) -> Result<Vec<ScoredDocument>> {
    if k == 0 || query.trim().is_empty() {
      return Ok(vec![]);
    }

    let collection = self.registry.collection(collection).await?;
    let overfetch = k.saturating_mul(OVERFETCH_FACTOR);
    let candidates = collection.query_with_score(query, overfetch).await?;
    let candidate_count = candidates.len();
    let hits = select_top(candidates, k, min_score);

    tracing::debug!(
      collection = collection.name(),
      candidates = candidate_count,
      returned = hits.len(),
      min_score,
      "Retrieved similar cases"
    );
    Ok(hits)
  }
}

/// Filter by `min_score`, order best first, keep at most `k`
pub fn select_top(candidates: Vec<ScoredDocument>, k: usize, min_score: f32) -> Vec<ScoredDocument> {
  let mut hits: Vec<ScoredDocument> =
    candidates.into_iter().filter(|hit| hit.score >= min_score).collect();
  hits.sort_by(|a, b| b.score.total_cmp(&a.score));
  hits.truncate(k);
  hits
}

use casebook::config::IndexBackend;
use casebook::embedding::{HashingEmbedder, MockEmbedder};
use casebook::{
  ingest_conversations, ingest_corrections, CaseRetriever, CollectionRegistry, DuplicatePolicy,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const CONVERSATIONS: &str = r#"[
  {"shipment_id": "101", "conversation": [
    {"role": "user", "content": "Package delayed"},
    {"role": "assistant", "content": "We are checking"}
  ]}
]"#;

const CORRECTIONS: &str = "issue_description,shipment_id,prompt,response,feedback,corrected\n\
Package arrived damaged,202,Customer reports package arrived damaged,Sorry the package arrived damaged,negative,Ship a replacement for the damaged package\n";

const CORRECTION_BLOB: &str = "Issue: Package arrived damaged\n\
Shipment ID: 202\n\
Prompt: Customer reports package arrived damaged\n\
Response: Sorry the package arrived damaged\n\
Feedback: negative\n\
Correction: Ship a replacement for the damaged package";

fn registry(index_root: &Path, policy: DuplicatePolicy) -> Arc<CollectionRegistry> {
  Arc::new(CollectionRegistry::new(
    index_root,
    IndexBackend::Flat,
    Arc::new(HashingEmbedder::new(384)),
    policy,
  ))
}

fn write(temp: &TempDir, name: &str, content: &str) -> PathBuf {
  let path = temp.path().join(name);
  std::fs::write(&path, content).unwrap();
  path
}

#[tokio::test]
async fn test_conversation_scenario() {
  let temp = TempDir::new().unwrap();
  let source = write(&temp, "conversations.json", CONVERSATIONS);
  let registry = registry(&temp.path().join("index"), DuplicatePolicy::Skip);

  let report = ingest_conversations(&registry, &source).await.unwrap();
  assert_eq!(report.added, 1);

  let retriever = CaseRetriever::new(registry);
  let hits = retriever.find_similar_conversations("Package delayed", 3, 0.75).await;
  assert_eq!(hits, vec!["User: Package delayed\nAssistant: We are checking".to_string()]);
}

#[tokio::test]
async fn test_unrelated_query_returns_nothing() {
  let temp = TempDir::new().unwrap();
  let source = write(&temp, "conversations.json", CONVERSATIONS);
  let registry = registry(&temp.path().join("index"), DuplicatePolicy::Skip);
  ingest_conversations(&registry, &source).await.unwrap();

  let retriever = CaseRetriever::new(registry);
  let hits = retriever.find_similar_conversations("totally unrelated nonsense xyz", 3, 0.75).await;
  assert!(hits.is_empty());
}

#[tokio::test]
async fn test_corrections_scenario() {
  let temp = TempDir::new().unwrap();
  let source = write(&temp, "corrections.csv", CORRECTIONS);
  let registry = registry(&temp.path().join("index"), DuplicatePolicy::Skip);

  let report = ingest_corrections(&registry, &source).await.unwrap();
  assert_eq!((report.read, report.added), (1, 1));

  let retriever = CaseRetriever::new(registry);
  let hits = retriever.find_similar_corrections("Package arrived damaged", 2, 0.75).await;
  assert_eq!(hits.first().map(String::as_str), Some(CORRECTION_BLOB));
}

#[tokio::test]
async fn test_collections_are_isolated() {
  let temp = TempDir::new().unwrap();
  let registry = registry(&temp.path().join("index"), DuplicatePolicy::Skip);
  ingest_corrections(&registry, &write(&temp, "corrections.csv", CORRECTIONS)).await.unwrap();

  let retriever = CaseRetriever::new(registry);
  assert!(retriever.find_similar_conversations(CORRECTION_BLOB, 3, 0.0).await.is_empty());
}

#[tokio::test]
async fn test_exact_flattened_text_is_top_ranked() {
  let temp = TempDir::new().unwrap();
  let source = write(
    &temp,
    "conversations.json",
    r#"[
      {"shipment_id": "1", "conversation": [{"role": "user", "content": "Package delayed"}]},
      {"shipment_id": "2", "conversation": [{"role": "user", "content": "Wrong delivery address"},
                                            {"role": "assistant", "content": "Please send the new address"}]},
      {"shipment_id": 3, "conversation": [{"role": "user", "content": "Parcel damaged in transit"}]}
    ]"#,
  );
  let registry = registry(&temp.path().join("index"), DuplicatePolicy::Skip);
  ingest_conversations(&registry, &source).await.unwrap();

  let retriever = CaseRetriever::new(registry);
  let query = "User: Wrong delivery address\nAssistant: Please send the new address";
  let hits = retriever.find_similar_scored("conversations", query, 3, 0.0).await.unwrap();

  assert_eq!(hits[0].text, query);
  assert!((hits[0].score - 1.0).abs() < 1e-5);
  assert_eq!(hits[0].metadata.get("shipment_id").map(String::as_str), Some("2"));
  assert_eq!(hits[0].metadata.get("source").map(String::as_str), Some("conversations"));
}

#[tokio::test]
async fn test_results_bounded_sorted_and_above_threshold() {
  let temp = TempDir::new().unwrap();
  let source = write(
    &temp,
    "conversations.json",
    r#"[
      {"shipment_id": "1", "conversation": [{"role": "user", "content": "Package delayed at hub"}]},
      {"shipment_id": "2", "conversation": [{"role": "user", "content": "Package delayed again"}]},
      {"shipment_id": "3", "conversation": [{"role": "user", "content": "Address wrong on label"}]},
      {"shipment_id": "4", "conversation": [{"role": "user", "content": "Delivery failed twice"}]},
      {"shipment_id": "5", "conversation": [{"role": "user", "content": "Refund requested for package"}]}
    ]"#,
  );
  let registry = registry(&temp.path().join("index"), DuplicatePolicy::Skip);
  ingest_conversations(&registry, &source).await.unwrap();
  let retriever = CaseRetriever::new(registry);

  for k in 1..=6 {
    for min_score in [0.0, 0.5, 0.75, 0.9, 1.0] {
      let hits =
        retriever.find_similar_scored("conversations", "package delayed", k, min_score).await.unwrap();

      assert!(hits.len() <= k);
      assert!(hits.iter().all(|hit| hit.score >= min_score));
      assert!(hits.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }
  }
}

#[tokio::test]
async fn test_empty_collection_returns_empty() {
  let temp = TempDir::new().unwrap();
  let retriever = CaseRetriever::new(registry(&temp.path().join("index"), DuplicatePolicy::Skip));

  assert!(retriever.find_similar_conversations("Package delayed", 3, 0.0).await.is_empty());
  assert!(retriever.find_similar_scored("corrections", "Package", 2, 0.0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_corrections_file_is_noop() {
  let temp = TempDir::new().unwrap();
  let registry = registry(&temp.path().join("index"), DuplicatePolicy::Skip);

  let report = ingest_corrections(&registry, &temp.path().join("missing.csv")).await.unwrap();
  assert_eq!((report.read, report.added, report.skipped_records), (0, 0, 0));
}

#[tokio::test]
async fn test_missing_conversations_file_is_error() {
  let temp = TempDir::new().unwrap();
  let registry = registry(&temp.path().join("index"), DuplicatePolicy::Skip);
  assert!(ingest_conversations(&registry, &temp.path().join("missing.json")).await.is_err());
}

#[tokio::test]
async fn test_entries_persist_across_registries() {
  let temp = TempDir::new().unwrap();
  let index_root = temp.path().join("index");
  let source = write(&temp, "conversations.json", CONVERSATIONS);

  {
    let first = registry(&index_root, DuplicatePolicy::Skip);
    ingest_conversations(&first, &source).await.unwrap();
  }

  let second = CaseRetriever::new(registry(&index_root, DuplicatePolicy::Skip));
  let hits = second.find_similar_conversations("Package delayed", 3, 0.75).await;
  assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_duplicate_policy_skip_and_append() {
  let temp = TempDir::new().unwrap();
  let source = write(&temp, "conversations.json", CONVERSATIONS);

  let skip_root = temp.path().join("skip");
  let skipping = registry(&skip_root, DuplicatePolicy::Skip);
  ingest_conversations(&skipping, &source).await.unwrap();
  let again = ingest_conversations(&skipping, &source).await.unwrap();
  assert_eq!((again.added, again.skipped_duplicates), (0, 1));
  assert_eq!(skipping.collection("conversations").await.unwrap().count().await.unwrap(), 1);

  let append_root = temp.path().join("append");
  let appending = registry(&append_root, DuplicatePolicy::Append);
  ingest_conversations(&appending, &source).await.unwrap();
  ingest_conversations(&appending, &source).await.unwrap();
  assert_eq!(appending.collection("conversations").await.unwrap().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_ingest_fails_loudly_when_embedder_is_down() {
  let temp = TempDir::new().unwrap();
  let index_root = temp.path().join("index");
  let failing = Arc::new(CollectionRegistry::new(
    &index_root,
    IndexBackend::Flat,
    Arc::new(MockEmbedder::failing(384)),
    DuplicatePolicy::Skip,
  ));

  let conversations = write(&temp, "conversations.json", CONVERSATIONS);
  assert!(ingest_conversations(&failing, &conversations).await.is_err());

  let corrections = write(&temp, "corrections.csv", CORRECTIONS);
  assert!(ingest_corrections(&failing, &corrections).await.is_err());

  let reader = registry(&index_root, DuplicatePolicy::Skip);
  for name in ["conversations", "corrections"] {
    assert_eq!(reader.collection(name).await.unwrap().count().await.unwrap(), 0);
  }
}

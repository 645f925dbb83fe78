//! Flat JSONL vector store
//!
//! Each collection is a directory holding `entries.jsonl`, one entry per
//! line. Entries are loaded into memory on open and searched by brute-force
//! cosine distance. Writers are serialized in-process by the inner mutex and
//! across processes by an exclusively created `.write.lock` file.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::models::{IndexedEntry, ScoredDocument};
use super::VectorStore;
use crate::error::IndexError;
use crate::similarity::{cosine_distance, distance_to_similarity};

pub const ENTRIES_FILE_NAME: &str = "entries.jsonl";
pub const LOCK_FILE_NAME: &str = ".write.lock";

const STALE_LOCK_AGE: Duration = Duration::from_secs(30);
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);
const LOCK_ATTEMPTS: usize = 20;

struct FlatStoreInner {
  collection: String,
  entries_path: PathBuf,
  lock_path: PathBuf,
  entries: Vec<IndexedEntry>,
}

/// Thread-safe JSONL-backed store for one collection
#[derive(Clone)]
pub struct FlatStore {
  inner: Arc<tokio::sync::Mutex<FlatStoreInner>>,
}

impl FlatStore {
  /// Open (creating if needed) the store for `collection` under `index_root`
  pub fn open(index_root: &Path, collection: &str) -> Result<Self> {
    super::validate_collection_name(collection)?;

    let dir = index_root.join(collection);
    fs::create_dir_all(&dir)
      .with_context(|| format!("Failed to create index directory {}", dir.display()))?;

    let entries_path = dir.join(ENTRIES_FILE_NAME);
    let entries = load_entries(&entries_path)?;

    tracing::debug!(collection, entries = entries.len(), "Opened flat store");

    Ok(Self {
      inner: Arc::new(tokio::sync::Mutex::new(FlatStoreInner {
        collection: collection.to_string(),
        entries_path,
        lock_path: dir.join(LOCK_FILE_NAME),
        entries,
      })),
    })
  }
}

#[async_trait]
impl VectorStore for FlatStore {
  async fn append(&self, entries: Vec<IndexedEntry>) -> Result<()> {
    if entries.is_empty() {
      return Ok(());
    }

    let mut inner = self.inner.lock().await;
    let _lock = WriteLock::acquire(&inner.lock_path, &inner.collection).await?;

    // Other writers may have appended since we last looked
    let on_disk = load_entries(&inner.entries_path)?;
    inner.entries = on_disk;
    inner.check_dimension(&entries)?;

    let mut file = OpenOptions::new()
      .create(true)
      .read(true)
      .append(true)
      .open(&inner.entries_path)
      .with_context(|| format!("Failed to open {}", inner.entries_path.display()))?;

    let mut buffer = String::new();
    if !ends_with_newline(&mut file)? {
      tracing::warn!(path = %inner.entries_path.display(), "Index ends in a partial line, starting a new one");
      buffer.push('\n');
    }
    for entry in &entries {
      buffer.push_str(&serde_json::to_string(entry)?);
      buffer.push('\n');
    }
    file.write_all(buffer.as_bytes())?;
    file.flush()?;

    inner.entries.extend(entries);
    Ok(())
  }

  async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredDocument>> {
    let inner = self.inner.lock().await;

    let mut hits: Vec<ScoredDocument> = inner
      .entries
      .iter()
      .map(|entry| ScoredDocument {
        text: entry.document.clone(),
        metadata: entry.metadata.clone(),
        score: distance_to_similarity(cosine_distance(query, &entry.embedding)),
      })
      .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    Ok(hits)
  }

  async fn count(&self) -> Result<usize> {
    Ok(self.inner.lock().await.entries.len())
  }

  async fn content_keys(&self) -> Result<HashSet<String>> {
    let mut inner = self.inner.lock().await;
    let on_disk = load_entries(&inner.entries_path)?;
    inner.entries = on_disk;
    Ok(inner.entries.iter().map(|entry| entry.content_key.clone()).collect())
  }
}

impl FlatStoreInner {
  /// All embeddings in a collection share the dimension of its first entry
  fn check_dimension(&self, entries: &[IndexedEntry]) -> Result<(), IndexError> {
    let expected = match self.entries.first() {
      Some(existing) => existing.embedding.len(),
      None => match entries.first() {
        Some(first) => first.embedding.len(),
        None => return Ok(()),
      },
    };

    match entries.iter().find(|entry| entry.embedding.len() != expected) {
      Some(entry) => Err(IndexError::DimensionMismatch {
        collection: self.collection.clone(),
        expected,
        actual: entry.embedding.len(),
      }),
      None => Ok(()),
    }
  }
}

/// Read every well-formed entry; malformed lines are skipped
fn load_entries(path: &Path) -> Result<Vec<IndexedEntry>> {
  if !path.exists() {
    return Ok(Vec::new());
  }

  let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
  let reader = BufReader::new(file);
  let mut entries = Vec::new();

  for (line_number, line_result) in reader.lines().enumerate() {
    let line = line_result?;
    if line.trim().is_empty() {
      continue;
    }

    match serde_json::from_str::<IndexedEntry>(&line) {
      Ok(entry) => entries.push(entry),
      Err(e) => {
        tracing::warn!(path = %path.display(), line = line_number + 1, "Skipping malformed index entry: {e}");
      }
    }
  }

  Ok(entries)
}

/// True for an empty file or one whose last byte is a newline
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
  let len = file.metadata()?.len();
  if len == 0 {
    return Ok(true);
  }

  file.seek(SeekFrom::Start(len - 1))?;
  let mut last = [0u8; 1];
  file.read_exact(&mut last)?;
  Ok(last[0] == b'\n')
}

/// Advisory cross-process write lock, released on drop
struct WriteLock {
  path: PathBuf,
}

impl WriteLock {
  async fn acquire(path: &Path, collection: &str) -> Result<Self> {
    for _ in 0..LOCK_ATTEMPTS {
      match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
          writeln!(file, "{}", std::process::id())?;
          return Ok(Self { path: path.to_path_buf() });
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
          if is_stale(path) {
            tracing::warn!(path = %path.display(), "Removing stale index lock");
            let _ = fs::remove_file(path);
            continue;
          }
          tokio::time::sleep(LOCK_RETRY_DELAY).await;
        }
        Err(e) => {
          return Err(e).with_context(|| format!("Failed to create lock {}", path.display()));
        }
      }
    }

    tracing::warn!(collection, path = %path.display(), "Index is locked by another writer");
    Err(
      IndexError::Locked { collection: collection.to_string(), path: path.display().to_string() }
        .into(),
    )
  }
}

impl Drop for WriteLock {
  fn drop(&mut self) {
    let _ = fs::remove_file(&self.path);
  }
}

fn is_stale(path: &Path) -> bool {
  fs::metadata(path)
    .and_then(|metadata| metadata.modified())
    .ok()
    .and_then(|modified| SystemTime::now().duration_since(modified).ok())
    .is_some_and(|age| age > STALE_LOCK_AGE)
}

//! Configuration management for Casebook
//!
//! Every field has a default, so a missing config file is not an error. The
//! data root honours `CASEBOOK_ROOT` so tests and callers can relocate it.

use anyhow::Result;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::index::DuplicatePolicy;

pub const ROOT_ENV_VAR: &str = "CASEBOOK_ROOT";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
  /// Root for persisted state; the index lives in `<data_dir>/index`
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,
  #[serde(default)]
  pub sources: SourcesConfig,
  #[serde(default)]
  pub embedder: EmbedderConfig,
  #[serde(default)]
  pub index: IndexConfig,
  #[serde(default)]
  pub retrieval: RetrievalConfig,
}

/// Flat-file case store locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
  #[serde(default = "default_conversations_path")]
  pub conversations: PathBuf,
  #[serde(default = "default_corrections_path")]
  pub corrections: PathBuf,
  #[serde(default = "default_shipment_logs_path")]
  pub shipment_logs: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderProvider {
  Hashing,
  Openai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
  #[serde(default = "default_provider")]
  pub provider: EmbedderProvider,
  #[serde(default = "default_model")]
  pub model: String,
  #[serde(default = "default_dimension")]
  pub dimension: usize,
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
  #[serde(default = "default_api_key_env")]
  pub api_key_env: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
  Flat,
  Lancedb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
  #[serde(default = "default_backend")]
  pub backend: IndexBackend,
  #[serde(default)]
  pub duplicates: DuplicatePolicy,
}

/// Per-collection retrieval defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchDefaults {
  pub k: usize,
  pub min_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
  #[serde(default = "default_conversation_search")]
  pub conversations: SearchDefaults,
  #[serde(default = "default_correction_search")]
  pub corrections: SearchDefaults,
}

// Default value functions
fn default_data_dir() -> PathBuf {
  get_casebook_root().unwrap_or_else(|_| PathBuf::from(".casebook"))
}
fn default_conversations_path() -> PathBuf {
  PathBuf::from("data").join("conversations.json")
}
fn default_corrections_path() -> PathBuf {
  PathBuf::from("data").join("corrections.csv")
}
fn default_shipment_logs_path() -> PathBuf {
  PathBuf::from("data").join("shipment_logs.csv")
}
fn default_provider() -> EmbedderProvider {
  EmbedderProvider::Hashing
}
fn default_model() -> String {
  "text-embedding-3-small".to_string()
}
fn default_dimension() -> usize {
  384
}
fn default_endpoint() -> String {
  "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
  "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
  30
}
fn default_backend() -> IndexBackend {
  IndexBackend::Flat
}
fn default_conversation_search() -> SearchDefaults {
  SearchDefaults {
    k: crate::retrieval::DEFAULT_CONVERSATION_K,
    min_score: crate::retrieval::DEFAULT_MIN_SCORE,
  }
}
fn default_correction_search() -> SearchDefaults {
  SearchDefaults {
    k: crate::retrieval::DEFAULT_CORRECTION_K,
    min_score: crate::retrieval::DEFAULT_MIN_SCORE,
  }
}

impl Default for SourcesConfig {
  fn default() -> Self {
    Self {
      conversations: default_conversations_path(),
      corrections: default_corrections_path(),
      shipment_logs: default_shipment_logs_path(),
    }
  }
}

impl Default for EmbedderConfig {
  fn default() -> Self {
    Self {
      provider: default_provider(),
      model: default_model(),
      dimension: default_dimension(),
      endpoint: default_endpoint(),
      api_key_env: default_api_key_env(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self { backend: default_backend(), duplicates: DuplicatePolicy::default() }
  }
}

impl Default for RetrievalConfig {
  fn default() -> Self {
    Self {
      conversations: default_conversation_search(),
      corrections: default_correction_search(),
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      sources: SourcesConfig::default(),
      embedder: EmbedderConfig::default(),
      index: IndexConfig::default(),
      retrieval: RetrievalConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from an explicit file, or from the data root if present
  pub fn load(path: Option<&Path>) -> Result<Self> {
    match path {
      Some(path) => {
        if !path.exists() {
          return Err(ConfigError::NotFound { path: path.display().to_string() }.into());
        }
        Self::from_file(path)
      }
      None => {
        let default_path = get_casebook_root()?.join(CONFIG_FILE_NAME);
        if default_path.exists() {
          Self::from_file(&default_path)
        } else {
          Ok(Self::default())
        }
      }
    }
  }

  fn from_file(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path)?;
    Self::from_yaml_str(&content, &path.display().to_string())
  }

  /// Parse and validate YAML configuration text
  pub fn from_yaml_str(content: &str, origin: &str) -> Result<Self> {
    let config: Config = if content.trim().is_empty() {
      Config::default()
    } else {
      serde_yaml::from_str(content)
        .map_err(|e| ConfigError::Parse { path: origin.to_string(), message: e.to_string() })?
    };

    config.validate()?;
    Ok(config)
  }

  /// Check value ranges that serde cannot express
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.embedder.dimension == 0 {
      return Err(ConfigError::invalid("embedder.dimension", "must be greater than zero"));
    }
    validate_search("retrieval.conversations", &self.retrieval.conversations)?;
    validate_search("retrieval.corrections", &self.retrieval.corrections)?;
    Ok(())
  }

  /// Directory holding one sub-directory per collection
  pub fn index_dir(&self) -> PathBuf {
    self.data_dir.join("index")
  }
}

fn validate_search(field: &str, search: &SearchDefaults) -> Result<(), ConfigError> {
  if search.k == 0 {
    return Err(ConfigError::invalid(format!("{field}.k"), "must be greater than zero"));
  }
  if !(0.0..=1.0).contains(&search.min_score) {
    return Err(ConfigError::invalid(format!("{field}.min_score"), "must be within [0, 1]"));
  }
  Ok(())
}

/// Get the casebook root directory (~/.casebook)
pub fn get_casebook_root() -> Result<PathBuf, ConfigError> {
  if let Ok(custom_root) = std::env::var(ROOT_ENV_VAR) {
    return Ok(PathBuf::from(custom_root));
  }

  let home = home_dir().ok_or(ConfigError::NoHomeDirectory)?;
  Ok(home.join(".casebook"))
}

//! Casebook - Similar-Case Retrieval for Support Resolution
//!
//! Embeds past support conversations and admin corrections into persistent,
//! named collections and retrieves the closest cases for a new issue so the
//! response pipeline can ground its answer in what worked before.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod grounding;
pub mod index;
pub mod ingest;
pub mod retrieval;
pub mod shipments;
pub mod similarity;

pub use config::Config;
pub use embedding::{Embedder, SharedEmbedder};
pub use error::{ConfigError, EmbeddingError, IndexError};
pub use index::{Collection, CollectionRegistry, DuplicatePolicy, Metadata, ScoredDocument};
pub use ingest::{ingest_conversations, ingest_corrections, IngestReport};
pub use retrieval::CaseRetriever;

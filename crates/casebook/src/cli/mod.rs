pub mod commands;
pub mod display;

use clap::ValueEnum;

use crate::ingest::{conversations, corrections};

/// The collections the CLI knows how to ingest and search
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollectionKind {
  Conversations,
  Corrections,
}

impl CollectionKind {
  pub const ALL: [CollectionKind; 2] = [CollectionKind::Conversations, CollectionKind::Corrections];

  pub fn name(self) -> &'static str {
    match self {
      CollectionKind::Conversations => conversations::COLLECTION,
      CollectionKind::Corrections => corrections::COLLECTION,
    }
  }
}

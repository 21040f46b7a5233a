use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the local cache.
///
/// Reads never surface these; they degrade to empty results instead.
#[derive(Error, Debug)]
pub enum CacheError {
  #[error("Failed to open cache database at {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: rusqlite::Error,
  },

  #[error("Failed to create cache directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Cache is not initialized")]
  NotInitialized,

  #[error("Unknown cache collection: {0}")]
  UnknownCollection(String),

  #[error("Invalid record: {0}")]
  InvalidRecord(String),

  #[error("Cache storage error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("Failed to serialize record: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("Lock poisoned: {0}")]
  LockPoisoned(String),
}

pub type StoreResult<T> = Result<T, CacheError>;

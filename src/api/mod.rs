//! Backend REST API used by the sync coordinator.

mod client;

pub use client::HttpApi;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::sync::SyncQueueEntry;

/// Consolidated server snapshot: collection name to rows (or a single row).
pub type InitialData = Map<String, Value>;

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("Network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("HTTP {status}: {body}")]
  Status { status: u16, body: String },

  #[error("Invalid URL: {0}")]
  Url(#[from] url::ParseError),
}

/// Server operations the sync coordinator depends on.
#[async_trait]
pub trait RemoteApi: Send + Sync {
  /// Submit one queue entry to `path`. Only a 2xx response counts as accepted.
  async fn push_entry(&self, path: &str, entry: &SyncQueueEntry) -> Result<(), ApiError>;

  /// Fetch the authenticated user's full data snapshot.
  async fn fetch_initial_data(&self) -> Result<InitialData, ApiError>;
}

//! Sync queue entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of mutation recorded in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncAction {
  /// Create or update the record
  Save,
  /// Remove the record
  Delete,
}

impl std::fmt::Display for SyncAction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Save => write!(f, "SAVE"),
      Self::Delete => write!(f, "DELETE"),
    }
  }
}

/// One pending mutation awaiting server acknowledgment.
///
/// The entry id is the id of the affected record, so a later mutation of the
/// same record replaces an earlier one still waiting in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueEntry {
  pub id: String,
  pub action: SyncAction,
  /// Collection the mutation targets
  pub store: String,
  pub payload: Value,
  /// Enqueue time in epoch milliseconds
  pub timestamp: i64,
}

impl SyncQueueEntry {
  /// Build an entry, taking the id from `payload.id` or generating one.
  pub fn new(action: SyncAction, store: impl Into<String>, payload: Value, timestamp: i64) -> Self {
    let id = payload_id(&payload).unwrap_or_else(|| Uuid::new_v4().to_string());
    Self {
      id,
      action,
      store: store.into(),
      payload,
      timestamp,
    }
  }
}

fn payload_id(payload: &Value) -> Option<String> {
  match payload.get("id")? {
    Value::String(id) if !id.is_empty() => Some(id.clone()),
    Value::Number(id) => Some(id.to_string()),
    _ => None,
  }
}

/// Order entries for draining: ascending timestamp, ties keep their order.
pub fn sort_for_drain(entries: &mut [SyncQueueEntry]) {
  entries.sort_by_key(|entry| entry.timestamp);
}

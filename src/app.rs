//! Command handlers behind the `ledgersync` binary.
//!
//! Each handler does what the application's UI layer does for the same
//! action: optimistic local write first, then the matching queue entry.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use uuid::Uuid;

use crate::api::RemoteApi;
use crate::cache::{CacheStore, SYNC_QUEUE};
use crate::ledger::Account;
use crate::sync::{
  Connectivity, DrainReport, PullReport, SyncAction, SyncCoordinator, SyncQueueEntry, SyncStatus,
};

/// Snapshot of local state for the `status` command.
#[derive(Debug, Clone)]
pub struct StatusSummary {
  pub status: SyncStatus,
  /// Pending entries in drain order
  pub pending: Vec<SyncQueueEntry>,
  /// Record count per entity collection
  pub counts: Vec<(String, usize)>,
}

/// Account balances for the `balances` command.
#[derive(Debug, Clone)]
pub struct Balances {
  pub accounts: Vec<Account>,
  pub total: f64,
}

pub struct App<S, A, C> {
  sync: SyncCoordinator<S, A, C>,
}

impl<S, A, C> App<S, A, C>
where
  S: CacheStore + 'static,
  A: RemoteApi + 'static,
  C: Connectivity + 'static,
{
  pub fn new(sync: SyncCoordinator<S, A, C>) -> Self {
    Self { sync }
  }

  pub fn coordinator(&self) -> &SyncCoordinator<S, A, C> {
    &self.sync
  }

  /// Save a record locally and queue it for the server.
  ///
  /// A record without an id gets a fresh one so the local copy and the queue
  /// entry address the same slot.
  pub async fn save(&self, collection: &str, json: &str) -> Result<(Value, DrainReport)> {
    let mut record: Value =
      serde_json::from_str(json).map_err(|e| eyre!("Invalid record JSON: {}", e))?;
    let object = record
      .as_object_mut()
      .ok_or_else(|| eyre!("Record must be a JSON object"))?;
    if !object.contains_key("id") {
      object.insert("id".to_string(), Value::from(Uuid::new_v4().to_string()));
    }

    self.sync.store().put(collection, &record)?;
    self.sync.enqueue(SyncAction::Save, collection, record.clone())?;
    let report = self.sync.trigger_sync().await;

    Ok((record, report))
  }

  /// Delete a record locally and queue the deletion for the server.
  pub async fn remove(&self, collection: &str, id: &str) -> Result<DrainReport> {
    self.sync.store().delete(collection, id)?;
    self
      .sync
      .enqueue(SyncAction::Delete, collection, serde_json::json!({ "id": id }))?;
    Ok(self.sync.trigger_sync().await)
  }

  pub async fn sync(&self) -> DrainReport {
    self.sync.trigger_sync().await
  }

  pub async fn pull(&self) -> Result<PullReport> {
    self.sync.pull_from_server().await
  }

  pub fn list(&self, collection: &str) -> Vec<Value> {
    let mut records = self.sync.store().get_all(collection);
    records.sort_by(|a, b| a["id"].to_string().cmp(&b["id"].to_string()));
    records
  }

  pub fn status(&self) -> StatusSummary {
    let store = self.sync.store();
    let counts = store
      .collections()
      .into_iter()
      .filter(|name| name != SYNC_QUEUE)
      .map(|name| {
        let count = store.count(&name);
        (name, count)
      })
      .collect();

    StatusSummary {
      status: self.sync.status(),
      pending: self.sync.pending_entries(),
      counts,
    }
  }

  pub fn balances(&self) -> Balances {
    let mut accounts: Vec<Account> = self.sync.store().get_all_as();
    accounts.sort_by(|a, b| a.name.cmp(&b.name));
    let total = accounts.iter().map(|a| a.balance).sum();
    Balances { accounts, total }
  }

  /// Wipe every collection, pending queue included.
  pub fn reset(&self) -> Result<()> {
    self.sync.store().clear_all_stores()?;
    Ok(())
  }
}

//! Sync coordinator: durable mutation queue, drain loop and full-state pull.

use color_eyre::{eyre::WrapErr, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::api::{InitialData, RemoteApi};
use crate::cache::{now_ms, CacheStore, SYNC_QUEUE};

use super::connectivity::Connectivity;
use super::endpoint::SyncEndpoint;
use super::queue::{sort_for_drain, SyncAction, SyncQueueEntry};
use super::status::{StatusHub, SyncStatus};

/// How a drain cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
  /// Not attempted, no connectivity
  Offline,
  /// Nothing was queued
  Empty,
  /// Every snapshotted entry was accepted
  Completed,
  /// Stopped at the first entry that could not be submitted
  Blocked { entry_id: String, reason: String },
}

/// Result of one drain cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
  /// Entries accepted by the server during this cycle
  pub submitted: usize,
  /// Entries left in the queue when the cycle ended
  pub remaining: usize,
  pub outcome: DrainOutcome,
}

/// Result of a full-state pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
  /// Local collections that were replaced
  pub collections: usize,
  /// Records written across those collections
  pub records: usize,
}

type InFlightDrain = Shared<BoxFuture<'static, DrainReport>>;

struct Inner<S, A, C> {
  store: S,
  api: A,
  connectivity: C,
  status: StatusHub,
  /// Single-flight guard: the drain currently running, if any
  in_flight: Mutex<Option<InFlightDrain>>,
  last_timestamp: AtomicI64,
}

/// Turns local optimistic writes into eventually consistent server state.
///
/// Cloning is cheap; clones share the queue, the status channel and the
/// single-flight guard.
pub struct SyncCoordinator<S, A, C> {
  inner: Arc<Inner<S, A, C>>,
  auto_flush: bool,
}

impl<S, A, C> Clone for SyncCoordinator<S, A, C> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      auto_flush: self.auto_flush,
    }
  }
}

impl<S, A, C> SyncCoordinator<S, A, C>
where
  S: CacheStore + 'static,
  A: RemoteApi + 'static,
  C: Connectivity + 'static,
{
  /// Create a coordinator over an initialized store.
  pub fn new(store: S, api: A, connectivity: C) -> Self {
    let initial = if connectivity.is_online() {
      SyncStatus::Online
    } else {
      SyncStatus::Offline
    };

    Self {
      inner: Arc::new(Inner {
        store,
        api,
        connectivity,
        status: StatusHub::new(initial),
        in_flight: Mutex::new(None),
        last_timestamp: AtomicI64::new(0),
      }),
      auto_flush: true,
    }
  }

  /// Enable or disable the background drain started by [`Self::enqueue`].
  pub fn with_auto_flush(mut self, auto_flush: bool) -> Self {
    self.auto_flush = auto_flush;
    self
  }

  /// The local cache this coordinator queues into.
  pub fn store(&self) -> &S {
    &self.inner.store
  }

  /// Receive every status published from now on.
  pub fn subscribe(&self) -> broadcast::Receiver<SyncStatus> {
    self.inner.status.subscribe()
  }

  /// Latest published status.
  pub fn status(&self) -> SyncStatus {
    self.inner.status.latest()
  }

  /// Number of entries waiting in the queue.
  pub fn pending_count(&self) -> usize {
    self.inner.store.count(SYNC_QUEUE)
  }

  /// Queue entries in drain order.
  pub fn pending_entries(&self) -> Vec<SyncQueueEntry> {
    self.inner.load_queue()
  }

  /// Record a mutation in the durable queue and start a drain in the background.
  ///
  /// Returns once the entry is stored; the network is never awaited here.
  /// A mutation of a record that already has a queued entry replaces it.
  pub fn enqueue(
    &self,
    action: SyncAction,
    collection: &str,
    payload: Value,
  ) -> Result<SyncQueueEntry> {
    let timestamp = self.inner.next_timestamp();
    let entry = SyncQueueEntry::new(action, collection, payload, timestamp);

    let record = serde_json::to_value(&entry)?;
    self
      .inner
      .store
      .put(SYNC_QUEUE, &record)
      .wrap_err_with(|| format!("Failed to queue {} of {}/{}", action, collection, entry.id))?;
    debug!(id = %entry.id, %action, collection, timestamp, "Queued mutation");

    if self.auto_flush {
      match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
          let this = self.clone();
          handle.spawn(async move {
            this.trigger_sync().await;
          });
        }
        Err(_) => debug!("No async runtime, queued mutation waits for the next trigger"),
      }
    }

    Ok(entry)
  }

  /// Drain the queue against the server.
  ///
  /// Entries go out one at a time in timestamp order; the first failure ends
  /// the cycle and leaves that entry and everything behind it queued. While a
  /// drain is running, further calls wait for it and share its report.
  pub async fn trigger_sync(&self) -> DrainReport {
    if !self.inner.connectivity.is_online() {
      debug!("Offline, deferring drain");
      self.inner.status.publish(SyncStatus::Offline);
      return DrainReport {
        submitted: 0,
        remaining: self.pending_count(),
        outcome: DrainOutcome::Offline,
      };
    }

    let drain = {
      let mut in_flight = self.inner.in_flight.lock().await;
      match in_flight.clone() {
        Some(drain) => {
          debug!("Drain already in progress, waiting for it");
          drain
        }
        None => {
          let inner = Arc::clone(&self.inner);
          let drain = async move {
            let report = inner.drain().await;
            inner.in_flight.lock().await.take();
            report
          }
          .boxed()
          .shared();
          *in_flight = Some(drain.clone());
          drain
        }
      }
    };

    drain.await
  }

  /// Replace every local entity collection with the server's snapshot.
  ///
  /// Nothing local changes unless the snapshot was received and written in
  /// full. The sync queue is left alone so pending offline writes survive.
  pub async fn pull_from_server(&self) -> Result<PullReport> {
    info!("Pulling full state from server");

    let snapshot = self
      .inner
      .api
      .fetch_initial_data()
      .await
      .wrap_err("Failed to fetch initial data")?;

    let replacement = self.inner.plan_replacement(snapshot);
    let report = PullReport {
      collections: replacement.len(),
      records: replacement.iter().map(|(_, rows)| rows.len()).sum(),
    };

    self
      .inner
      .store
      .replace_collections(&replacement)
      .wrap_err("Failed to write pulled data to the local cache")?;

    info!(
      collections = report.collections,
      records = report.records,
      "Local cache replaced with server state"
    );
    Ok(report)
  }
}

impl<S, A, C> Inner<S, A, C>
where
  S: CacheStore,
  A: RemoteApi,
  C: Connectivity,
{
  /// Enqueue timestamps strictly increase so same-millisecond writes keep
  /// their call order.
  fn next_timestamp(&self) -> i64 {
    let now = now_ms();
    let mut last = self.last_timestamp.load(Ordering::SeqCst);
    loop {
      let next = now.max(last + 1);
      match self
        .last_timestamp
        .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
      {
        Ok(_) => return next,
        Err(current) => last = current,
      }
    }
  }

  fn load_queue(&self) -> Vec<SyncQueueEntry> {
    let mut entries: Vec<SyncQueueEntry> = self
      .store
      .get_all(SYNC_QUEUE)
      .into_iter()
      .filter_map(|record| match serde_json::from_value(record) {
        Ok(entry) => Some(entry),
        Err(e) => {
          warn!(error = %e, "Skipping malformed sync queue record");
          None
        }
      })
      .collect();
    sort_for_drain(&mut entries);
    entries
  }

  async fn drain(&self) -> DrainReport {
    let entries = self.load_queue();

    if entries.is_empty() {
      self.status.publish(SyncStatus::Online);
      return DrainReport {
        submitted: 0,
        remaining: 0,
        outcome: DrainOutcome::Empty,
      };
    }

    self.status.publish(SyncStatus::Syncing);
    info!(count = entries.len(), "Draining sync queue");

    let mut submitted = 0;
    let mut outcome = DrainOutcome::Completed;

    for entry in &entries {
      let endpoint = SyncEndpoint::for_collection(&entry.store);

      if let Err(e) = self.api.push_entry(endpoint.path(), entry).await {
        warn!(
          id = %entry.id,
          store = %entry.store,
          endpoint = endpoint.path(),
          error = %e,
          "Sync request failed, stopping drain"
        );
        outcome = DrainOutcome::Blocked {
          entry_id: entry.id.clone(),
          reason: e.to_string(),
        };
        break;
      }
      submitted += 1;

      if let Err(e) = self.acknowledge(entry) {
        error!(id = %entry.id, error = %e, "Failed to remove accepted entry from queue");
        outcome = DrainOutcome::Blocked {
          entry_id: entry.id.clone(),
          reason: e.to_string(),
        };
        break;
      }
    }

    let status = match (&outcome, self.connectivity.is_online()) {
      (_, false) => SyncStatus::Offline,
      (DrainOutcome::Blocked { .. }, true) => SyncStatus::Stalled,
      _ => SyncStatus::Online,
    };
    self.status.publish(status);

    let report = DrainReport {
      submitted,
      remaining: self.store.count(SYNC_QUEUE),
      outcome,
    };
    info!(
      submitted = report.submitted,
      remaining = report.remaining,
      %status,
      "Drain finished"
    );
    report
  }

  /// Remove an accepted entry unless a newer mutation took its slot meanwhile.
  ///
  /// Enqueue timestamps never repeat, so id plus timestamp pins the exact
  /// entry that was sent without comparing payloads.
  fn acknowledge(&self, entry: &SyncQueueEntry) -> Result<()> {
    let sent = json!({ "id": entry.id, "timestamp": entry.timestamp });
    let removed = self.store.delete_if_matches(SYNC_QUEUE, &entry.id, &sent)?;
    if !removed {
      debug!(id = %entry.id, "Queue slot was overwritten during submission, keeping newer entry");
    }
    Ok(())
  }

  /// Map a snapshot onto the local entity collections.
  ///
  /// Every registered collection except the queue gets an entry, so
  /// collections the server no longer reports end up empty.
  fn plan_replacement(&self, mut snapshot: InitialData) -> Vec<(String, Vec<Value>)> {
    let mut replacement: Vec<(String, Vec<Value>)> = self
      .store
      .collections()
      .into_iter()
      .filter(|name| name != SYNC_QUEUE)
      .map(|name| {
        let rows = snapshot
          .remove(&name)
          .map(|value| snapshot_rows(&name, value))
          .unwrap_or_default();
        (name, rows)
      })
      .collect();
    replacement.sort_by(|a, b| a.0.cmp(&b.0));

    for key in snapshot.keys() {
      debug!(collection = %key, "Ignoring snapshot key with no local collection");
    }

    replacement
  }
}

/// Rows of one snapshot value: arrays are taken row by row, a single object
/// becomes one record (keyed by the collection name if it carries no id).
fn snapshot_rows(collection: &str, value: Value) -> Vec<Value> {
  match value {
    Value::Array(rows) => rows,
    Value::Object(mut row) => {
      if !row.contains_key("id") {
        row.insert("id".to_string(), Value::from(collection));
      }
      vec![Value::Object(row)]
    }
    Value::Null => Vec::new(),
    other => {
      warn!(collection, value = %other, "Unexpected snapshot value, treating as empty");
      Vec::new()
    }
  }
}

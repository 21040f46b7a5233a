#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ledgersync::api::{ApiError, InitialData, RemoteApi};
use ledgersync::cache::{CacheStore, SqliteStore};
use ledgersync::sync::{ConnectivityFlag, SyncCoordinator, SyncQueueEntry};
use serde_json::Value;
use tokio::sync::Semaphore;

pub type TestCoordinator = SyncCoordinator<SqliteStore, ScriptedApi, ConnectivityFlag>;

/// In-process stand-in for the backend.
///
/// Records every submission, rejects ids it was told to reject, and can hold
/// requests until the test releases them.
#[derive(Clone, Default)]
pub struct ScriptedApi {
  state: Arc<Mutex<ApiState>>,
  gate: Option<Arc<Semaphore>>,
  started: Arc<AtomicUsize>,
  in_flight: Arc<AtomicUsize>,
  max_in_flight: Arc<AtomicUsize>,
}

#[derive(Default)]
struct ApiState {
  submitted: Vec<(String, SyncQueueEntry)>,
  reject_ids: HashSet<String>,
  snapshot: Option<InitialData>,
  pulls: usize,
}

impl ScriptedApi {
  pub fn new() -> Self {
    Self::default()
  }

  /// Requests wait for [`ScriptedApi::release`] before completing.
  pub fn gated() -> Self {
    Self {
      gate: Some(Arc::new(Semaphore::new(0))),
      ..Self::default()
    }
  }

  pub fn release(&self, requests: usize) {
    if let Some(gate) = &self.gate {
      gate.add_permits(requests);
    }
  }

  pub fn reject(&self, id: &str) {
    self.state.lock().unwrap().reject_ids.insert(id.to_string());
  }

  pub fn accept(&self, id: &str) {
    self.state.lock().unwrap().reject_ids.remove(id);
  }

  pub fn serve_snapshot(&self, snapshot: Value) {
    let Value::Object(map) = snapshot else {
      panic!("snapshot must be an object");
    };
    self.state.lock().unwrap().snapshot = Some(map);
  }

  pub fn submitted(&self) -> Vec<(String, SyncQueueEntry)> {
    self.state.lock().unwrap().submitted.clone()
  }

  pub fn submitted_ids(&self) -> Vec<String> {
    self.submitted().into_iter().map(|(_, e)| e.id).collect()
  }

  /// Requests that reached the fake, accepted or not.
  pub fn started(&self) -> usize {
    self.started.load(Ordering::SeqCst)
  }

  pub fn max_in_flight(&self) -> usize {
    self.max_in_flight.load(Ordering::SeqCst)
  }

  pub fn pulls(&self) -> usize {
    self.state.lock().unwrap().pulls
  }

  /// Wait until `count` requests have reached the fake.
  pub async fn wait_for_started(&self, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
      while self.started() < count {
        tokio::time::sleep(Duration::from_millis(5)).await;
      }
    })
    .await
    .expect("requests did not start in time");
  }
}

#[async_trait]
impl RemoteApi for ScriptedApi {
  async fn push_entry(&self, path: &str, entry: &SyncQueueEntry) -> Result<(), ApiError> {
    self.started.fetch_add(1, Ordering::SeqCst);
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);

    if let Some(gate) = &self.gate {
      gate.acquire().await.expect("gate closed").forget();
    }

    let result = {
      let mut state = self.state.lock().unwrap();
      if state.reject_ids.contains(&entry.id) {
        Err(ApiError::Status {
          status: 500,
          body: "rejected".to_string(),
        })
      } else {
        state.submitted.push((path.to_string(), entry.clone()));
        Ok(())
      }
    };

    self.in_flight.fetch_sub(1, Ordering::SeqCst);
    result
  }

  async fn fetch_initial_data(&self) -> Result<InitialData, ApiError> {
    let mut state = self.state.lock().unwrap();
    state.pulls += 1;
    state.snapshot.clone().ok_or(ApiError::Status {
      status: 503,
      body: "unavailable".to_string(),
    })
  }
}

pub fn memory_store() -> SqliteStore {
  let store = SqliteStore::in_memory();
  store.init().expect("init store");
  store
}

/// Coordinator over a fresh in-memory store that never drains on its own.
pub fn coordinator(api: ScriptedApi, connectivity: ConnectivityFlag) -> TestCoordinator {
  SyncCoordinator::new(memory_store(), api, connectivity).with_auto_flush(false)
}

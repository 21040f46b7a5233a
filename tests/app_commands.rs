mod common;

use common::{coordinator, ScriptedApi};
use ledgersync::app::App;
use ledgersync::cache::CacheStore;
use ledgersync::sync::{ConnectivityFlag, DrainOutcome, SyncAction, SyncStatus};
use serde_json::json;

#[tokio::test]
async fn save_writes_locally_and_syncs() {
  let api = ScriptedApi::new();
  let app = App::new(coordinator(api.clone(), ConnectivityFlag::online()));

  let (record, report) = app
    .save("accounts", r#"{"id": "acc1", "name": "Wallet", "balance": 100}"#)
    .await
    .expect("save");

  assert_eq!(record["id"], "acc1");
  assert_eq!(report.outcome, DrainOutcome::Completed);
  assert_eq!(app.list("accounts").len(), 1);
  assert_eq!(api.submitted_ids(), ["acc1"]);
}

#[tokio::test]
async fn save_without_id_assigns_one_shared_with_the_queue() {
  let api = ScriptedApi::new();
  let app = App::new(coordinator(api.clone(), ConnectivityFlag::offline()));

  let (record, report) = app
    .save("transactions", r#"{"accountId": "acc1", "amount": -20}"#)
    .await
    .expect("save");

  assert_eq!(report.outcome, DrainOutcome::Offline);
  let id = record["id"].as_str().expect("generated id");
  let pending = app.coordinator().pending_entries();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].id, id);
  assert!(app.coordinator().store().get("transactions", id).is_some());
}

#[tokio::test]
async fn save_rejects_non_objects() {
  let app = App::new(coordinator(ScriptedApi::new(), ConnectivityFlag::online()));
  assert!(app.save("accounts", "[1, 2]").await.is_err());
  assert!(app.save("accounts", "not json").await.is_err());
  assert_eq!(app.coordinator().pending_count(), 0);
}

#[tokio::test]
async fn save_into_unknown_collection_fails_before_queueing() {
  let app = App::new(coordinator(ScriptedApi::new(), ConnectivityFlag::online()));
  assert!(app.save("spaceships", r#"{"id": "x"}"#).await.is_err());
  assert_eq!(app.coordinator().pending_count(), 0);
}

#[tokio::test]
async fn remove_deletes_locally_and_queues_delete() {
  let api = ScriptedApi::new();
  api.reject("c1");
  let app = App::new(coordinator(api.clone(), ConnectivityFlag::online()));
  app
    .coordinator()
    .store()
    .put("contacts", &json!({"id": "c1", "name": "Ana"}))
    .expect("seed");

  let report = app.remove("contacts", "c1").await.expect("remove");

  assert!(matches!(report.outcome, DrainOutcome::Blocked { .. }));
  assert!(app.list("contacts").is_empty());

  let summary = app.status();
  assert_eq!(summary.status, SyncStatus::Stalled);
  assert_eq!(summary.pending.len(), 1);
  assert_eq!(summary.pending[0].action, SyncAction::Delete);
  assert!(summary.counts.iter().any(|(name, count)| name == "contacts" && *count == 0));
}

#[tokio::test]
async fn balances_sum_cached_accounts() {
  let app = App::new(coordinator(ScriptedApi::new(), ConnectivityFlag::offline()));
  let store = app.coordinator().store();
  store
    .put("accounts", &json!({"id": "a1", "name": "Wallet", "balance": 100.5}))
    .expect("seed");
  store
    .put("accounts", &json!({"id": "a2", "name": "Bank", "balance": 900}))
    .expect("seed");

  let balances = app.balances();
  assert_eq!(balances.accounts.len(), 2);
  assert_eq!(balances.accounts[0].name, "Bank");
  assert!((balances.total - 1000.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn reset_wipes_everything_including_queue() {
  let app = App::new(coordinator(ScriptedApi::new(), ConnectivityFlag::offline()));
  app
    .save("goals", r#"{"id": "g1", "target": 10}"#)
    .await
    .expect("save");

  app.reset().expect("reset");

  assert!(app.list("goals").is_empty());
  assert_eq!(app.coordinator().pending_count(), 0);
}

mod common;

use common::{coordinator, ScriptedApi};
use ledgersync::cache::{without_stamp, CacheStore, SYNC_QUEUE};
use ledgersync::sync::{ConnectivityFlag, SyncAction};
use serde_json::{json, Value};

fn ids(records: &[Value]) -> Vec<String> {
  let mut ids: Vec<String> = records
    .iter()
    .map(|r| r["id"].as_str().unwrap_or_default().to_string())
    .collect();
  ids.sort();
  ids
}

#[tokio::test]
async fn pull_replaces_collections_with_server_state() {
  let api = ScriptedApi::new();
  let sync = coordinator(api.clone(), ConnectivityFlag::online());

  for i in 0..10 {
    sync
      .store()
      .put("transactions", &json!({ "id": format!("old{i}"), "amount": i }))
      .expect("seed");
  }
  sync
    .store()
    .put("accounts", &json!({"id": "stale", "name": "Old"}))
    .expect("seed");

  api.serve_snapshot(json!({
    "accounts": [{"id": "a1", "name": "Wallet", "balance": 100}],
    "transactions": []
  }));

  let report = sync.pull_from_server().await.expect("pull");
  assert_eq!(report.records, 1);

  let accounts = sync.store().get_all("accounts");
  assert_eq!(accounts.len(), 1);
  assert_eq!(
    without_stamp(&accounts[0]),
    json!({"id": "a1", "name": "Wallet", "balance": 100})
  );
  assert!(sync.store().get_all("transactions").is_empty());
}

#[tokio::test]
async fn failed_pull_leaves_cache_untouched() {
  let api = ScriptedApi::new();
  let sync = coordinator(api.clone(), ConnectivityFlag::online());

  sync
    .store()
    .put("accounts", &json!({"id": "a1", "name": "Wallet"}))
    .expect("seed");
  sync
    .store()
    .put("contacts", &json!({"id": "c1", "name": "Ana"}))
    .expect("seed");
  let before_accounts = sync.store().get_all("accounts");
  let before_contacts = sync.store().get_all("contacts");

  // No snapshot scripted, the fake answers 503
  let err = sync.pull_from_server().await.expect_err("pull must fail");
  assert!(format!("{err:#}").contains("503"));
  assert_eq!(api.pulls(), 1);

  assert_eq!(sync.store().get_all("accounts"), before_accounts);
  assert_eq!(sync.store().get_all("contacts"), before_contacts);
}

#[tokio::test]
async fn pull_keeps_pending_offline_writes() {
  let api = ScriptedApi::new();
  let sync = coordinator(api.clone(), ConnectivityFlag::offline());

  sync
    .enqueue(SyncAction::Save, "accounts", json!({"id": "local1"}))
    .expect("enqueue");

  api.serve_snapshot(json!({
    "accounts": [],
    "sync_queue": [{"id": "server-should-not-write-this"}]
  }));
  sync.pull_from_server().await.expect("pull");

  let pending = sync.pending_entries();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].id, "local1");
  assert_eq!(sync.store().count(SYNC_QUEUE), 1);
}

#[tokio::test]
async fn collections_missing_from_snapshot_are_emptied() {
  let api = ScriptedApi::new();
  let sync = coordinator(api.clone(), ConnectivityFlag::online());

  sync
    .store()
    .put("goals", &json!({"id": "g1"}))
    .expect("seed");

  api.serve_snapshot(json!({
    "accounts": [{"id": "a1"}, {"id": "a2"}],
    "settings": {"currency": "EUR", "locale": "es-AR"},
    "unknownThing": [{"id": "x"}]
  }));
  sync.pull_from_server().await.expect("pull");

  assert!(sync.store().get_all("goals").is_empty());
  assert_eq!(ids(&sync.store().get_all("accounts")), ["a1", "a2"]);

  let settings = sync.store().get_all("settings");
  assert_eq!(settings.len(), 1);
  assert_eq!(settings[0]["id"], "settings");
  assert_eq!(settings[0]["currency"], "EUR");

  assert!(sync.store().get_all("unknownThing").is_empty());
}

#[tokio::test]
async fn snapshot_with_invalid_row_changes_nothing() {
  let api = ScriptedApi::new();
  let sync = coordinator(api.clone(), ConnectivityFlag::online());

  sync
    .store()
    .put("accounts", &json!({"id": "keep"}))
    .expect("seed");

  api.serve_snapshot(json!({
    "accounts": [{"id": "a1"}],
    "contacts": [{"name": "no id"}]
  }));
  assert!(sync.pull_from_server().await.is_err());

  assert_eq!(ids(&sync.store().get_all("accounts")), ["keep"]);
}

//! Offline cache and mutation queue synchronization for the ledger ERP client.
//!
//! Two pieces cooperate:
//! - [`cache`]: a durable store of named record collections, one per entity
//!   type, plus the `sync_queue` collection of pending mutations.
//! - [`sync`]: the coordinator that queues local writes, drains the queue
//!   against the backend in order, and pulls full server state.
//!
//! ```no_run
//! use ledgersync::api::HttpApi;
//! use ledgersync::cache::{CacheStore, SqliteStore};
//! use ledgersync::config::Config;
//! use ledgersync::sync::{ConnectivityFlag, SyncAction, SyncCoordinator};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> color_eyre::Result<()> {
//! let config = Config::load(None)?;
//! let store = SqliteStore::open(config.cache.database_path()?)?;
//! let sync = SyncCoordinator::new(store, HttpApi::new(&config)?, ConnectivityFlag::online());
//!
//! let account = json!({"id": "acc1", "name": "Wallet", "balance": 100});
//! sync.store().put("accounts", &account)?;
//! sync.enqueue(SyncAction::Save, "accounts", account)?;
//! let report = sync.trigger_sync().await;
//! println!("{} submitted, {} pending", report.submitted, report.remaining);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod ledger;
pub mod logging;
pub mod sync;

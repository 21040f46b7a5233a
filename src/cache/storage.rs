//! Cache storage trait and SQLite implementation.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::collections::default_collections;
use super::error::{CacheError, StoreResult};
use super::traits::{record_id, with_stamp, without_stamp, Cacheable};

/// Trait for cache storage backends.
///
/// A backend holds named collections of JSON records keyed by their `id`.
/// Reads degrade to empty results when the store is closed or the collection
/// is unknown; writes fail loudly.
pub trait CacheStore: Send + Sync {
  /// Open the backing storage and create every required collection.
  /// Calling it on an already open store is a no-op.
  fn init(&self) -> StoreResult<()>;

  /// Release the backing storage. Later reads return nothing, writes fail.
  fn close(&self) -> StoreResult<()>;

  /// Names of the registered collections.
  fn collections(&self) -> Vec<String>;

  /// Every record in a collection, in no particular order.
  fn get_all(&self, collection: &str) -> Vec<Value>;

  /// A single record by id.
  fn get(&self, collection: &str, id: &str) -> Option<Value>;

  /// Number of records in a collection.
  fn count(&self, collection: &str) -> usize;

  /// Upsert a record by id, stamping `_updatedAt` with the current time.
  fn put(&self, collection: &str, record: &Value) -> StoreResult<()>;

  /// Remove a record by id. Removing an absent id succeeds.
  fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

  /// Remove a record only if every field of `expected` (other than
  /// `_updatedAt`) is stored with the same value. Returns whether a record
  /// was removed.
  fn delete_if_matches(&self, collection: &str, id: &str, expected: &Value)
    -> StoreResult<bool>;

  /// Empty one collection. Unknown or empty collections are left alone.
  fn clear_store(&self, collection: &str) -> StoreResult<()>;

  /// Empty every collection.
  fn clear_all_stores(&self) -> StoreResult<()>;

  /// Replace the contents of each listed collection in a single transaction.
  fn replace_collections(&self, snapshot: &[(String, Vec<Value>)]) -> StoreResult<()>;

  /// Store a typed entity in its collection.
  fn put_entity<T: Cacheable>(&self, entity: &T) -> StoreResult<()> {
    let record = serde_json::to_value(entity)?;
    let id = record_id(&record)?;
    if id != entity.cache_key() {
      return Err(CacheError::InvalidRecord(format!(
        "serialized id {} does not match cache key {}",
        id,
        entity.cache_key()
      )));
    }
    self.put(T::collection(), &record)
  }

  /// Every record of a typed collection that deserializes as `T`.
  fn get_all_as<T: Cacheable>(&self) -> Vec<T> {
    self
      .get_all(T::collection())
      .into_iter()
      .filter_map(|record| serde_json::from_value(record).ok())
      .collect()
  }
}

/// Where a SQLite store keeps its data.
#[derive(Debug, Clone)]
enum Location {
  File(PathBuf),
  Memory,
}

/// An open database plus the collections registered in it.
struct Session {
  conn: Connection,
  collections: BTreeSet<String>,
}

impl Session {
  fn require(&self, collection: &str) -> StoreResult<()> {
    if self.collections.contains(collection) {
      Ok(())
    } else {
      Err(CacheError::UnknownCollection(collection.to_string()))
    }
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStore {
  location: Location,
  required: Vec<String>,
  session: Mutex<Option<Session>>,
}

impl SqliteStore {
  /// Create a store backed by the database file at `path`.
  /// Nothing is opened until [`CacheStore::init`] is called.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      location: Location::File(path.into()),
      required: default_collections(),
      session: Mutex::new(None),
    }
  }

  /// Create a store backed by a private in-memory database.
  pub fn in_memory() -> Self {
    Self {
      location: Location::Memory,
      required: default_collections(),
      session: Mutex::new(None),
    }
  }

  /// Create and initialize a store at `path`.
  pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
    let store = Self::new(path);
    store.init()?;
    Ok(store)
  }

  /// Override the collections created on init.
  pub fn with_collections<I, N>(mut self, collections: I) -> Self
  where
    I: IntoIterator<Item = N>,
    N: Into<String>,
  {
    self.required = collections.into_iter().map(Into::into).collect();
    self
  }

  /// Get the default database path.
  pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .map(|dir| dir.join("ledgersync").join("cache.db"))
  }

  fn lock(&self) -> StoreResult<MutexGuard<'_, Option<Session>>> {
    self
      .session
      .lock()
      .map_err(|e| CacheError::LockPoisoned(e.to_string()))
  }

  fn connect(&self) -> StoreResult<Connection> {
    match &self.location {
      Location::File(path) => {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
          std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
            path: parent.to_path_buf(),
            source,
          })?;
        }

        let conn = Connection::open(path).map_err(|source| CacheError::Open {
          path: path.clone(),
          source,
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(conn)
      }
      Location::Memory => Connection::open_in_memory().map_err(|source| CacheError::Open {
        path: PathBuf::from(":memory:"),
        source,
      }),
    }
  }

  /// Run a read against the open session, degrading to `default` on any error.
  fn read<T>(&self, default: T, f: impl FnOnce(&Session) -> StoreResult<T>) -> T {
    let guard = match self.lock() {
      Ok(guard) => guard,
      Err(e) => {
        warn!(error = %e, "Cache read skipped");
        return default;
      }
    };

    match guard.as_ref() {
      Some(session) => f(session).unwrap_or_else(|e| {
        warn!(error = %e, "Cache read failed");
        default
      }),
      None => default,
    }
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Registered collection names
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY
);

-- Records of every collection (stores serialized JSON)
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data BLOB NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (collection, id)
);
"#;

impl CacheStore for SqliteStore {
  fn init(&self) -> StoreResult<()> {
    let mut guard = self.lock()?;
    if guard.is_some() {
      return Ok(());
    }

    let conn = self.connect()?;
    conn.execute_batch(CACHE_SCHEMA)?;

    {
      let mut stmt = conn.prepare("INSERT OR IGNORE INTO collections (name) VALUES (?1)")?;
      for name in &self.required {
        stmt.execute(params![name])?;
      }
    }

    let collections = {
      let mut stmt = conn.prepare("SELECT name FROM collections")?;
      let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;
      names
    };

    info!(
      location = ?self.location,
      collections = collections.len(),
      "Cache opened"
    );
    *guard = Some(Session { conn, collections });
    Ok(())
  }

  fn close(&self) -> StoreResult<()> {
    let mut guard = self.lock()?;
    if let Some(session) = guard.take() {
      session.conn.close().map_err(|(_, e)| CacheError::Sqlite(e))?;
      debug!(location = ?self.location, "Cache closed");
    }
    Ok(())
  }

  fn collections(&self) -> Vec<String> {
    self.read(Vec::new(), |session| {
      Ok(session.collections.iter().cloned().collect())
    })
  }

  fn get_all(&self, collection: &str) -> Vec<Value> {
    self.read(Vec::new(), |session| {
      if !session.collections.contains(collection) {
        return Ok(Vec::new());
      }

      let mut stmt = session
        .conn
        .prepare("SELECT data FROM records WHERE collection = ?1")?;

      let records: Vec<Value> = stmt
        .query_map(params![collection], |row| row.get::<_, Vec<u8>>(0))?
        .filter_map(|r| r.ok())
        .filter_map(|data| serde_json::from_slice(&data).ok())
        .collect();

      Ok(records)
    })
  }

  fn get(&self, collection: &str, id: &str) -> Option<Value> {
    self.read(None, |session| {
      let data: Option<Vec<u8>> = session
        .conn
        .query_row(
          "SELECT data FROM records WHERE collection = ?1 AND id = ?2",
          params![collection, id],
          |row| row.get(0),
        )
        .optional()?;

      match data {
        Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
        None => Ok(None),
      }
    })
  }

  fn count(&self, collection: &str) -> usize {
    self.read(0, |session| {
      let count: i64 = session.conn.query_row(
        "SELECT COUNT(*) FROM records WHERE collection = ?1",
        params![collection],
        |row| row.get(0),
      )?;
      Ok(count as usize)
    })
  }

  fn put(&self, collection: &str, record: &Value) -> StoreResult<()> {
    let guard = self.lock()?;
    let session = guard.as_ref().ok_or(CacheError::NotInitialized)?;
    session.require(collection)?;

    insert_record(&session.conn, collection, record, now_ms())
  }

  fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
    let guard = self.lock()?;
    let session = guard.as_ref().ok_or(CacheError::NotInitialized)?;
    session.require(collection)?;

    session.conn.execute(
      "DELETE FROM records WHERE collection = ?1 AND id = ?2",
      params![collection, id],
    )?;
    Ok(())
  }

  fn delete_if_matches(
    &self,
    collection: &str,
    id: &str,
    expected: &Value,
  ) -> StoreResult<bool> {
    let guard = self.lock()?;
    let session = guard.as_ref().ok_or(CacheError::NotInitialized)?;
    session.require(collection)?;

    let data: Option<Vec<u8>> = session
      .conn
      .query_row(
        "SELECT data FROM records WHERE collection = ?1 AND id = ?2",
        params![collection, id],
        |row| row.get(0),
      )
      .optional()?;

    let Some(data) = data else {
      return Ok(false);
    };

    let stored: Value = serde_json::from_slice(&data)?;
    let expected = without_stamp(expected);
    let matches = match (stored.as_object(), expected.as_object()) {
      (Some(stored), Some(fields)) => fields
        .iter()
        .all(|(key, value)| stored.get(key) == Some(value)),
      _ => false,
    };
    if !matches {
      return Ok(false);
    }

    session.conn.execute(
      "DELETE FROM records WHERE collection = ?1 AND id = ?2",
      params![collection, id],
    )?;
    Ok(true)
  }

  fn clear_store(&self, collection: &str) -> StoreResult<()> {
    let guard = self.lock()?;
    let session = guard.as_ref().ok_or(CacheError::NotInitialized)?;

    let removed = session.conn.execute(
      "DELETE FROM records WHERE collection = ?1",
      params![collection],
    )?;
    debug!(collection, removed, "Cleared collection");
    Ok(())
  }

  fn clear_all_stores(&self) -> StoreResult<()> {
    let guard = self.lock()?;
    let session = guard.as_ref().ok_or(CacheError::NotInitialized)?;

    let removed = session.conn.execute("DELETE FROM records", [])?;
    debug!(removed, "Cleared all collections");
    Ok(())
  }

  fn replace_collections(&self, snapshot: &[(String, Vec<Value>)]) -> StoreResult<()> {
    let mut guard = self.lock()?;
    let session = guard.as_mut().ok_or(CacheError::NotInitialized)?;
    for (collection, _) in snapshot {
      session.require(collection)?;
    }

    let now = now_ms();
    let tx = session.conn.transaction()?;
    for (collection, records) in snapshot {
      tx.execute(
        "DELETE FROM records WHERE collection = ?1",
        params![collection],
      )?;
      for record in records {
        insert_record(&tx, collection, record, now)?;
      }
    }
    tx.commit()?;

    Ok(())
  }
}

/// Upsert one stamped record.
fn insert_record(conn: &Connection, collection: &str, record: &Value, now: i64) -> StoreResult<()> {
  let id = record_id(record)?;
  let stamped = with_stamp(record, now)?;
  let data = serde_json::to_vec(&stamped)?;

  conn.execute(
    "INSERT OR REPLACE INTO records (collection, id, data, updated_at)
     VALUES (?1, ?2, ?3, ?4)",
    params![collection, id, data, now],
  )?;
  Ok(())
}

/// Current time in epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
  Utc::now().timestamp_millis()
}

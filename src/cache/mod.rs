//! Local cache store for offline operation.
//!
//! This module provides a durable, namespaced key/value store that:
//! - Keeps one collection per entity type, keyed by record id
//! - Stamps every write with `_updatedAt`
//! - Holds the pending mutation queue as one more collection (`sync_queue`)
//! - Degrades reads to empty results and fails writes loudly

mod collections;
mod error;
mod storage;
mod traits;

pub use collections::{default_collections, ENTITY_COLLECTIONS, SYNC_QUEUE};
pub use error::{CacheError, StoreResult};
pub use storage::{CacheStore, SqliteStore};
pub use traits::{record_id, without_stamp, Cacheable, UPDATED_AT_FIELD};

pub(crate) use storage::now_ms;

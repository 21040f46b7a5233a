//! Core traits and record helpers for the local cache.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::error::{CacheError, StoreResult};

/// Field injected into every stored record with the write time (epoch ms).
pub const UPDATED_AT_FIELD: &str = "_updatedAt";

/// Trait for typed entities that live in a cache collection.
///
/// Records are stored as JSON objects; implementors only need to say which
/// collection they belong to and which field identifies them.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier for this entity within its collection
  fn cache_key(&self) -> String;

  /// Collection name the entity is stored under (e.g., "accounts")
  fn collection() -> &'static str;
}

/// Extract the id of a record.
///
/// String ids are used as-is and numeric ids are normalised to their decimal
/// form, so `{"id": 7}` and `{"id": "7"}` address the same slot.
pub fn record_id(record: &Value) -> StoreResult<String> {
  let object = record
    .as_object()
    .ok_or_else(|| CacheError::InvalidRecord("record is not a JSON object".to_string()))?;

  match object.get("id") {
    Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
    Some(Value::Number(id)) => Ok(id.to_string()),
    Some(other) => Err(CacheError::InvalidRecord(format!(
      "record id must be a string or number, got {}",
      other
    ))),
    None => Err(CacheError::InvalidRecord("record has no id".to_string())),
  }
}

/// Return a copy of `record` with the `_updatedAt` stamp removed.
pub fn without_stamp(record: &Value) -> Value {
  let mut record = record.clone();
  if let Some(object) = record.as_object_mut() {
    object.remove(UPDATED_AT_FIELD);
  }
  record
}

/// Return a copy of `record` stamped with `_updatedAt = now_ms`.
pub(crate) fn with_stamp(record: &Value, now_ms: i64) -> StoreResult<Value> {
  let mut record = record.clone();
  let object = record
    .as_object_mut()
    .ok_or_else(|| CacheError::InvalidRecord("record is not a JSON object".to_string()))?;
  object.insert(UPDATED_AT_FIELD.to_string(), Value::from(now_ms));
  Ok(record)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn numeric_and_string_ids_share_a_slot() {
    assert_eq!(record_id(&json!({"id": 7})).unwrap(), "7");
    assert_eq!(record_id(&json!({"id": "7"})).unwrap(), "7");
  }

  #[test]
  fn rejects_records_without_usable_id() {
    assert!(record_id(&json!({"name": "Wallet"})).is_err());
    assert!(record_id(&json!({"id": ""})).is_err());
    assert!(record_id(&json!({"id": null})).is_err());
    assert!(record_id(&json!(["acc1"])).is_err());
  }

  #[test]
  fn stamp_round_trip() {
    let record = json!({"id": "acc1", "balance": 100});
    let stamped = with_stamp(&record, 1_700_000_000_000).unwrap();
    assert_eq!(stamped[UPDATED_AT_FIELD], 1_700_000_000_000i64);
    assert_eq!(without_stamp(&stamped), record);
  }
}

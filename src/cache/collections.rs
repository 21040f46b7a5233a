//! Names of the collections the cache creates on init.

/// Collection holding pending sync queue entries.
pub const SYNC_QUEUE: &str = "sync_queue";

/// Entity collections mirrored from the server.
pub const ENTITY_COLLECTIONS: &[&str] = &[
  "accounts",
  "transactions",
  "contacts",
  "categories",
  "goals",
  "budgets",
  "recurringTransactions",
  "products",
  "opticalRxs",
  "commercialOrders",
  "serviceOrders",
  "patients",
  "appointments",
  "settings",
];

/// Every collection a default cache is expected to hold.
pub fn default_collections() -> Vec<String> {
  ENTITY_COLLECTIONS
    .iter()
    .copied()
    .chain(std::iter::once(SYNC_QUEUE))
    .map(String::from)
    .collect()
}

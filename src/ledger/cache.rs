//! Caching implementations for ledger types.

use crate::cache::Cacheable;

use super::types::{Account, Contact, Transaction};

impl Cacheable for Account {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn collection() -> &'static str {
    "accounts"
  }
}

impl Cacheable for Transaction {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn collection() -> &'static str {
    "transactions"
  }
}

impl Cacheable for Contact {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn collection() -> &'static str {
    "contacts"
  }
}

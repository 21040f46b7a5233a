//! Typed views over the cached ledger collections.

mod cache;
pub mod types;

pub use types::{Account, Contact, Transaction};

//! Offline synchronization.
//!
//! Local writes are recorded in a durable queue inside the cache and replayed
//! against the backend one at a time, oldest first, stopping at the first
//! rejection so no later mutation of a record can overtake an earlier one.
//! A pull replaces the local entity collections with server truth.
//!
//! There is no backoff or dead-letter handling: a permanently rejected entry
//! blocks the queue until it is resolved by hand.

mod connectivity;
mod coordinator;
mod endpoint;
mod queue;
mod status;

pub use connectivity::{Connectivity, ConnectivityFlag};
pub use coordinator::{DrainOutcome, DrainReport, PullReport, SyncCoordinator};
pub use endpoint::SyncEndpoint;
pub use queue::{sort_for_drain, SyncAction, SyncQueueEntry};
pub use status::SyncStatus;

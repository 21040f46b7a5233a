use tokio::sync::{broadcast, watch};

/// Sync indicator published after every state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
  /// A drain is submitting queued mutations
  Syncing,
  /// Connected and nothing is known to be stuck
  Online,
  /// No connectivity; queued mutations wait for reconnect
  Offline,
  /// Connected, but the head of the queue was rejected and blocks the rest
  Stalled,
}

impl std::fmt::Display for SyncStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Syncing => write!(f, "syncing"),
      Self::Online => write!(f, "online"),
      Self::Offline => write!(f, "offline"),
      Self::Stalled => write!(f, "stalled"),
    }
  }
}

/// Fan-out of status notifications plus the latest value.
pub(crate) struct StatusHub {
  events: broadcast::Sender<SyncStatus>,
  latest: watch::Sender<SyncStatus>,
}

impl StatusHub {
  pub fn new(initial: SyncStatus) -> Self {
    let (events, _) = broadcast::channel(64);
    let (latest, _) = watch::channel(initial);
    Self { events, latest }
  }

  pub fn publish(&self, status: SyncStatus) {
    self.latest.send_replace(status);
    // No subscribers is fine
    let _ = self.events.send(status);
  }

  pub fn subscribe(&self) -> broadcast::Receiver<SyncStatus> {
    self.events.subscribe()
  }

  pub fn latest(&self) -> SyncStatus {
    *self.latest.borrow()
  }
}

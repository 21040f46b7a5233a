use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Source of the online/offline signal consulted around each drain.
pub trait Connectivity: Send + Sync {
  fn is_online(&self) -> bool;
}

impl<T: Connectivity + ?Sized> Connectivity for Arc<T> {
  fn is_online(&self) -> bool {
    (**self).is_online()
  }
}

/// Shared, settable connectivity flag.
///
/// Clones observe the same flag, so the owner of one clone can flip the
/// network state seen by a coordinator holding another.
#[derive(Debug, Clone)]
pub struct ConnectivityFlag {
  online: Arc<AtomicBool>,
}

impl ConnectivityFlag {
  pub fn new(online: bool) -> Self {
    Self {
      online: Arc::new(AtomicBool::new(online)),
    }
  }

  pub fn online() -> Self {
    Self::new(true)
  }

  pub fn offline() -> Self {
    Self::new(false)
  }

  pub fn set_online(&self, online: bool) {
    self.online.store(online, Ordering::SeqCst);
  }
}

impl Default for ConnectivityFlag {
  fn default() -> Self {
    Self::online()
  }
}

impl Connectivity for ConnectivityFlag {
  fn is_online(&self) -> bool {
    self.online.load(Ordering::SeqCst)
  }
}

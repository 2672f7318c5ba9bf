//! Cooperative cancellation shared between the control thread and a worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, SvoError};

/// Cloneable cancellation flag.
///
/// Long-running operations call [`CancellationToken::check`] at their
/// granularity (per frame during projection, per node during the octree
/// pass) and unwind with [`SvoError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
  flag: Arc<AtomicBool>,
}

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  /// Request cancellation. Idempotent.
  pub fn cancel(&self) {
    self.flag.store(true, Ordering::Relaxed);
  }

  #[inline]
  pub fn is_cancelled(&self) -> bool {
    self.flag.load(Ordering::Relaxed)
  }

  /// `Err(Cancelled)` once cancellation was requested.
  #[inline]
  pub fn check(&self) -> Result<()> {
    if self.is_cancelled() {
      Err(SvoError::Cancelled)
    } else {
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fresh_token_passes() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
    assert!(token.check().is_ok());
  }

  #[test]
  fn test_clones_share_flag() {
    let token = CancellationToken::new();
    let clone = token.clone();
    clone.cancel();
    assert!(token.is_cancelled());
    assert!(matches!(token.check(), Err(SvoError::Cancelled)));
  }

  #[test]
  fn test_cancel_across_threads() {
    let token = CancellationToken::new();
    let remote = token.clone();
    std::thread::spawn(move || remote.cancel()).join().unwrap();
    assert!(token.is_cancelled());
  }
}

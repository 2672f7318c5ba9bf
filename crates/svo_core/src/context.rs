//! Compute context: the one data-parallel device shared by every stage.
//!
//! Wraps a dedicated rayon pool. Created once per process and handed to the
//! projector and partitioner by `Arc`, so kernel-style dispatch never touches
//! rayon's global pool and never happens from two threads at once unless the
//! caller shares the context deliberately.
//!
//! ```ignore
//! let ctx = Arc::new(ComputeContext::new(0)?); // 0 = one thread per CPU
//! let projector = FrameProjector::new(Arc::clone(&ctx), settings);
//! ```

use crate::error::{Result, SvoError};

/// Owned thread pool used for tile and lattice dispatch.
#[derive(Debug)]
pub struct ComputeContext {
  pool: rayon::ThreadPool,
}

impl ComputeContext {
  /// Build a context with `num_threads` workers (0 = rayon's default).
  ///
  /// Pool construction failures surface as [`SvoError::Compute`].
  pub fn new(num_threads: usize) -> Result<Self> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(num_threads)
      .thread_name(|i| format!("svo-compute-{i}"))
      .build()
      .map_err(|e| SvoError::Compute(e.to_string()))?;
    Ok(Self { pool })
  }

  /// Run `op` inside the pool; parallel iterators inside use its workers.
  ///
  /// Blocks the calling thread until `op` returns.
  pub fn install<OP, R>(&self, op: OP) -> R
  where
    OP: FnOnce() -> R + Send,
    R: Send,
  {
    self.pool.install(op)
  }

  /// Number of worker threads in the pool.
  pub fn num_threads(&self) -> usize {
    self.pool.current_num_threads()
  }
}

#[cfg(test)]
mod tests {
  use rayon::prelude::*;

  use super::*;

  #[test]
  fn test_explicit_thread_count() {
    let ctx = ComputeContext::new(2).unwrap();
    assert_eq!(ctx.num_threads(), 2);
  }

  #[test]
  fn test_default_threads() {
    let ctx = ComputeContext::new(0).unwrap();
    assert!(ctx.num_threads() >= 1);
  }

  #[test]
  fn test_install_runs_parallel_work() {
    let ctx = ComputeContext::new(2).unwrap();
    let sum: u64 = ctx.install(|| (0..1000u64).into_par_iter().sum());
    assert_eq!(sum, 499_500);
  }
}

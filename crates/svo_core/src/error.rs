//! Error type for the reduction pipeline.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SvoError>;

/// Failures surfaced by projection, accumulation, octree building and I/O.
///
/// `InvalidFrame` is recoverable per item: the pipeline logs it and moves on.
/// Everything else aborts the operation in flight without persisting partial
/// state.
#[derive(Debug, Error)]
pub enum SvoError {
  #[error("frame {label}: {reason}")]
  InvalidFrame { label: String, reason: String },

  #[error("point cloud exceeded its budget of {ceiling_bytes} bytes")]
  PointBudgetExceeded { ceiling_bytes: usize },

  #[error("brick pool full: {needed} bricks needed, capacity is {capacity}")]
  PoolCapacityExceeded { needed: usize, capacity: usize },

  #[error("octree needs {needed} nodes, index words address at most {limit}")]
  NodeCapacityExceeded { needed: usize, limit: usize },

  #[error("nothing to reduce: no frame produced a sample")]
  EmptyInput,

  #[error("operation cancelled")]
  Cancelled,

  #[error("compute device failure: {0}")]
  Compute(String),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("unsupported svo format version {major}.{minor}")]
  UnsupportedVersion { major: i64, minor: i64 },

  #[error("corrupt svo stream: {0}")]
  Corrupt(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl SvoError {
  pub(crate) fn invalid_frame(label: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::InvalidFrame {
      label: label.into(),
      reason: reason.into(),
    }
  }

  /// Failures confined to one input frame; the pipeline skips the frame.
  pub fn is_frame_local(&self) -> bool {
    matches!(self, Self::InvalidFrame { .. } | Self::Io(_))
  }

  /// Resource ceilings the caller may retry around with stricter settings.
  pub fn is_resource_exceeded(&self) -> bool {
    matches!(
      self,
      Self::PointBudgetExceeded { .. }
        | Self::PoolCapacityExceeded { .. }
        | Self::NodeCapacityExceeded { .. }
    )
  }
}

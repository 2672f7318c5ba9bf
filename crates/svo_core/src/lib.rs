//! svo_core - diffuse-scattering reduction into sparse voxel octrees
//!
//! Turns calibrated 2D detector frames into a multi-resolution sparse voxel
//! octree over reciprocal space, with brick-pooled payloads and a versioned
//! binary file format.
//!
//! # Pipeline
//!
//! - **Projection**: Ewald-sphere mapping of every pixel, goniometer rotation
//!   composition and intensity corrections, dispatched in tiles
//! - **Accumulation**: one byte-budgeted sample buffer across all frames
//! - **Partitioning**: kd-tree occupancy queries with interchangeable
//!   per-site and batched evaluation
//! - **Octree**: breadth-first build over a flat node table
//! - **Store**: `index` / `brick` / `pool` arrays and their file format
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use svo_core::{reduce, CancellationToken, ComputeContext, EventSink, ReductionConfig, VecFrameSource};
//!
//! let ctx = Arc::new(ComputeContext::new(0)?);
//! let output = reduce(
//!     &VecFrameSource::new(frames),
//!     &ReductionConfig::default(),
//!     ctx,
//!     &CancellationToken::new(),
//!     &EventSink::discard(),
//! )?;
//! output.store.save("crystal.svo")?;
//! println!("{}", output.summary);
//! ```

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Result, SvoError};
pub use types::{BrickLayout, MinMax, RotationAxis, Sample};

// Shared infrastructure
pub mod cancel;
pub mod config;
pub mod context;
pub mod progress;
pub use cancel::CancellationToken;
pub use config::ReductionConfig;
pub use context::ComputeContext;
pub use progress::{EventSink, LogLevel, ReductionEvent, ReductionSummary, Stage};

// Frame projection
pub mod projection;
pub use projection::{CalibratedFrame, FrameGeometry, FrameProjector};

// Point accumulation
pub mod accumulator;
pub use accumulator::{PointAccumulator, PointCloud, ResolutionSuggestion};

// Occupancy queries
pub mod partition;
pub use partition::{Occupancy, SpatialPartitioner};

// Sparse voxel octree
pub mod octree;
pub use octree::{Extent, IndexWord, OctreeBuilder, PoolCoord};

// Persistence
pub mod store;
pub use store::SvoStore;

// Orchestration
pub mod pipeline;
pub use pipeline::{reduce, FrameSource, ReductionOutput, ReductionWorker, VecFrameSource};

#[cfg(test)]
pub mod test_utils;

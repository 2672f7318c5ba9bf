//! Sparse voxel octree over the reciprocal-space extent.
//!
//! The tree is stored as flat arrays addressed by integer offsets, never by
//! references, so it serializes trivially and a renderer can walk it
//! directly.
//!
//! # Level Convention
//!
//! Level 0 = the root (coarsest), each level halves the node side.
//!
//! ```text
//! extent_side(L) = 2Q / 2^L
//! voxel_size(L)  = extent_side(L) / brick_inner
//! ```
//!
//! # Module Structure
//!
//! - [`bounds`]: `Extent` - double-precision axis-aligned box
//! - [`node`]: `OctreeNode` - brick coordinate at a level
//! - [`config`]: `OctreeConfig` - coordinate math and search radii
//! - [`packing`]: `IndexWord` / `PoolCoord` - bit-packed output words
//! - [`budget`]: `PoolBudget` - brick pool slot allocation
//! - [`builder`]: `OctreeBuilder` - breadth-first build

pub mod bounds;
pub mod budget;
pub mod builder;
pub mod config;
pub mod node;
pub mod packing;

// Re-exports
pub use bounds::Extent;
pub use budget::PoolBudget;
pub use builder::{BuildProgress, BuiltOctree, LevelStats, OctreeBuilder};
pub use config::OctreeConfig;
pub use node::OctreeNode;
pub use packing::{IndexWord, PoolCoord};

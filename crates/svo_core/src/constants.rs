//! Brick layout, word packing and file format constants.
//!
//! # Brick Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                   BRICK LAYOUT (one axis)                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  Voxel index:   0     1     2     3     4     5     6  │  7   │
//! │                 └──────── 7 inner voxels ──────────────┘  │   │
//! │                   cover the node extent exactly           │   │
//! │                                                    apron ─┘   │
//! │                                   (first voxel of the +1      │
//! │                                    neighbour, for seamless    │
//! │                                    trilinear interpolation)   │
//! │                                                               │
//! │  Voxel k is centred at: node_min + (k + 0.5) * voxel_size     │
//! │  voxel_size = extent_side(level) / BRICK_INNER_DIMENSION      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory Layout
//!
//! Bricks are stored X fastest (texture order):
//!
//! ```text
//! index = x + outer * (y + outer * z)
//! ```
//!
//! # Packed Words
//!
//! ```text
//! index word:  [31] msd | [30] data | [29..0] child
//! brick word:  [29..20] pool x | [19..10] pool y | [9..0] pool z
//! ```

/// Default side of the authoritative region of a brick.
pub const DEFAULT_BRICK_INNER_DIMENSION: usize = 7;

/// Default side of a stored brick (inner region plus interpolation apron).
pub const DEFAULT_BRICK_OUTER_DIMENSION: usize = 8;

/// Default pool power: the pool holds `2^power` bricks per axis.
pub const DEFAULT_BRICK_POOL_POWER: u32 = 7;

/// Deepest supported tree (levels are 0-based, so 15 levels = 0..=14).
pub const MAX_LEVELS: usize = 15;

/// Width of the child offset field in an index word.
pub const CHILD_BITS: u32 = 30;

/// Mask selecting the child offset of an index word.
pub const CHILD_MASK: u32 = (1 << CHILD_BITS) - 1;

/// Index word flag: node is terminal (most subdivided).
pub const MSD_FLAG: u32 = 1 << 31;

/// Index word flag: node carries a brick.
pub const DATA_FLAG: u32 = 1 << 30;

/// Maximum node count addressable by the child field.
pub const MAX_NODES: usize = 1 << CHILD_BITS;

/// Width of each pool axis field in a brick word.
pub const POOL_AXIS_BITS: u32 = 10;

/// Mask selecting one pool axis of a brick word.
pub const POOL_AXIS_MASK: u32 = (1 << POOL_AXIS_BITS) - 1;

/// Largest pool power representable by the brick word.
pub const MAX_BRICK_POOL_POWER: u32 = POOL_AXIS_BITS;

/// Reference point-cloud ceiling (~1 GB).
pub const DEFAULT_POINT_BUDGET_BYTES: usize = 1_000_000_000;

/// Largest point cloud the partitioner can index (`u32` sample indices).
pub const MAX_CLOUD_POINTS: usize = u32::MAX as usize;

/// Default brick pool ceiling (1 GiB of `f32` voxels).
pub const DEFAULT_POOL_BUDGET_BYTES: usize = 1 << 30;

/// Pixels per projection tile axis (one work group is `TILE x TILE`).
pub const DEFAULT_TILE_SIZE: usize = 128;

/// Candidate count above which the batched occupancy strategy is chosen.
pub const DEFAULT_DENSITY_THRESHOLD: usize = 4096;

/// Format major version written by this crate.
pub const FORMAT_MAJOR: i64 = 1;

/// Format minor version written by this crate.
pub const FORMAT_MINOR: i64 = 4;

/// First minor version carrying the creation/view settings block.
pub const SETTINGS_MIN_MINOR: i64 = 4;

/// Convert brick coordinates to a linear voxel index (X fastest).
#[inline(always)]
pub const fn voxel_index(x: usize, y: usize, z: usize, outer: usize) -> usize {
  x + outer * (y + outer * z)
}

/// Convert a linear voxel index back to brick coordinates.
#[inline(always)]
pub const fn voxel_coord(index: usize, outer: usize) -> (usize, usize, usize) {
  let x = index % outer;
  let y = (index / outer) % outer;
  let z = index / (outer * outer);
  (x, y, z)
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;

//! OctreeConfig - tree depth, brick layout and world coordinate mapping.

use glam::DVec3;

use super::{Extent, OctreeNode};
use crate::constants::DEFAULT_BRICK_POOL_POWER;
use crate::types::BrickLayout;

/// Configuration for one octree build.
#[derive(Clone, Debug)]
pub struct OctreeConfig {
  /// Region covered by the root node.
  pub extent: Extent,

  /// Number of levels (level 0 = root, the last level is `levels - 1`).
  pub levels: usize,

  /// Brick inner/outer dimension.
  pub layout: BrickLayout,

  /// Pool holds `2^pool_power` bricks per axis.
  pub pool_power: u32,
}

impl OctreeConfig {
  pub fn new(extent: Extent, levels: usize, layout: BrickLayout, pool_power: u32) -> Self {
    Self {
      extent,
      levels,
      layout,
      pool_power,
    }
  }

  /// Index of the finest level.
  #[inline]
  pub fn last_level(&self) -> usize {
    self.levels.saturating_sub(1)
  }

  /// Node side length at `level`.
  /// extent_side = root_side / 2^level
  #[inline]
  pub fn extent_side(&self, level: usize) -> f64 {
    self.extent.side() / (1u64 << level) as f64
  }

  /// Voxel spacing inside a brick at `level`.
  /// voxel_size = extent_side / brick_inner
  #[inline]
  pub fn voxel_size(&self, level: usize) -> f64 {
    self.extent_side(level) / self.layout.inner as f64
  }

  /// Search radius used for occupancy queries at `level`.
  ///
  /// Half a voxel diagonal, or the global pixel footprint when that is larger.
  #[inline]
  pub fn search_radius(&self, level: usize, global_high_radius: f64) -> f64 {
    let half_diagonal = 3.0_f64.sqrt() * 0.5 * self.voxel_size(level);
    if global_high_radius.is_finite() {
      half_diagonal.max(global_high_radius)
    } else {
      half_diagonal
    }
  }

  /// Region covered by a node.
  #[inline]
  pub fn node_extent(&self, node: &OctreeNode) -> Extent {
    let side = self.extent_side(node.level as usize);
    let min = self.extent.min + DVec3::new(node.x as f64, node.y as f64, node.z as f64) * side;
    Extent::new(min, min + DVec3::splat(side))
  }

  /// Bricks per pool axis.
  #[inline]
  pub fn pool_side(&self) -> usize {
    1usize << self.pool_power
  }

  /// Pool texture side in voxels (`2^power · brick_outer`).
  #[inline]
  pub fn pool_texture_side(&self) -> usize {
    self.pool_side() * self.layout.outer
  }
}

impl Default for OctreeConfig {
  fn default() -> Self {
    Self {
      extent: Extent::cube(1.0),
      levels: 1,
      layout: BrickLayout::default(),
      pool_power: DEFAULT_BRICK_POOL_POWER,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

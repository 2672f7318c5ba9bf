//! Breadth-first sparse octree construction.
//!
//! # Node Table
//!
//! ```text
//! ┌──────┬──────────────────┬─────────────────────────────────┬────
//! │ root │ level 1 (8)      │ level 2 (8 per non-empty L1)    │ ...
//! └──────┴──────────────────┴─────────────────────────────────┴────
//!    0     1 ........... 8    9 ...
//! ```
//!
//! Levels are laid out one after another. The children of the `k`-th
//! non-empty node of a level start at
//!
//! ```text
//! child = confirmed + nodes_in_level + k * 8
//! ```
//!
//! i.e. child ranges are bump-allocated right after the level that owns them,
//! in the order their parents are visited. Offset 0 is the root, so a child
//! offset of 0 means "no children".

use super::budget::PoolBudget;
use super::packing::{IndexWord, PoolCoord};
use super::{OctreeConfig, OctreeNode};
use crate::cancel::CancellationToken;
use crate::constants::MAX_NODES;
use crate::error::{Result, SvoError};
use crate::partition::{Occupancy, SpatialPartitioner};
use crate::types::BrickLayout;

/// Per-level outcome of a build.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LevelStats {
  pub level: usize,
  /// Nodes visited at this level.
  pub nodes: usize,
  /// Nodes that received a brick.
  pub non_empty: usize,
  /// Occupancy search radius used at this level.
  pub search_radius: f64,
}

/// Progress of a running build, reported once per visited node.
///
/// A build that runs out of non-empty nodes before its last level reports
/// one extra event for the last level with `total == 0`, so the fraction
/// always ends at 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildProgress {
  pub level: usize,
  pub levels: usize,
  /// Nodes finished at the current level.
  pub done: usize,
  /// Nodes pending at the current level.
  pub total: usize,
}

impl BuildProgress {
  /// Overall completion in `[0, 1]`, levels weighted equally.
  pub fn fraction(&self) -> f32 {
    let within = if self.total == 0 {
      1.0
    } else {
      self.done as f32 / self.total as f32
    };
    ((self.level as f32 + within) / self.levels.max(1) as f32).min(1.0)
  }
}

/// Flat arrays produced by a finished build.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuiltOctree {
  /// Packed [`IndexWord`]s, one per node, level order.
  pub index: Vec<u32>,
  /// Packed [`PoolCoord`]s, one per node; 0 for nodes without data.
  pub brick: Vec<u32>,
  /// Brick payloads in pool-slot order, `outer^3` floats each.
  pub pool: Vec<f32>,
  pub levels: usize,
  pub layout: BrickLayout,
  pub pool_power: u32,
  pub level_stats: Vec<LevelStats>,
}

impl BuiltOctree {
  pub fn node_count(&self) -> usize {
    self.index.len()
  }

  pub fn brick_count(&self) -> usize {
    self.pool.len() / self.layout.voxels()
  }
}

/// Helper-table entry for a node whose level is being or has been visited.
#[derive(Clone, Copy, Debug)]
struct NodeRecord {
  node: OctreeNode,
  /// Root has no parent.
  parent: Option<u32>,
  word: IndexWord,
  pool: Option<PoolCoord>,
}

impl NodeRecord {
  fn pending(parent: Option<u32>) -> Self {
    Self {
      node: OctreeNode::root(),
      parent,
      word: IndexWord::default(),
      pool: None,
    }
  }
}

/// Builds the node table level by level from occupancy queries.
pub struct OctreeBuilder<'a> {
  config: OctreeConfig,
  partitioner: &'a SpatialPartitioner,
  /// Largest per-frame pixel footprint; floors every level's search radius.
  high_radius: f64,
  pool_bytes: usize,
}

impl<'a> OctreeBuilder<'a> {
  pub fn new(config: OctreeConfig, partitioner: &'a SpatialPartitioner) -> Self {
    Self {
      config,
      partitioner,
      high_radius: 0.0,
      pool_bytes: usize::MAX,
    }
  }

  /// Floor the search radius with the global high-radius suggestion.
  pub fn with_high_radius(mut self, radius: f64) -> Self {
    self.high_radius = radius;
    self
  }

  /// Cap the brick pool at `bytes`.
  pub fn with_pool_budget(mut self, bytes: usize) -> Self {
    self.pool_bytes = bytes;
    self
  }

  pub fn config(&self) -> &OctreeConfig {
    &self.config
  }

  /// Run the level-order pass.
  ///
  /// `cancel` is checked before every node; on cancellation or any failure
  /// the partial tree is dropped.
  #[cfg_attr(feature = "spans", tracing::instrument(skip_all, name = "octree::build"))]
  pub fn build(
    &self,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(BuildProgress),
  ) -> Result<BuiltOctree> {
    let config = &self.config;
    let layout = config.layout;
    let levels = config.levels;
    if levels == 0 {
      return Err(SvoError::InvalidConfig("octree needs at least one level".into()));
    }
    let last_level = config.last_level();

    let mut budget = PoolBudget::new(config.pool_power, layout, self.pool_bytes);
    let mut records = vec![NodeRecord::pending(None)];
    let mut pool: Vec<f32> = Vec::new();
    let mut level_stats = Vec::with_capacity(levels);

    let mut confirmed = 0usize;
    let mut nodes_in_level = 1usize;

    for level in 0..levels {
      let search_radius = config.search_radius(level, self.high_radius);
      let mut non_empty = 0usize;

      for i in 0..nodes_in_level {
        cancel.check()?;
        let id = confirmed + i;

        let node = match records[id].parent {
          Some(parent) => records[parent as usize].node.child((i % 8) as u8),
          None => OctreeNode::root(),
        };
        records[id].node = node;

        let extent = config.node_extent(&node);
        match self.partitioner.occupancy(&extent, search_radius, layout, level) {
          Occupancy::Empty => {
            records[id].word = IndexWord::new(true, false, 0);
          }
          Occupancy::Brick(voxels) => {
            let coord = budget.claim()?;
            if pool.try_reserve(voxels.len()).is_err() {
              return Err(SvoError::PoolCapacityExceeded {
                needed: budget.used(),
                capacity: budget.capacity(),
              });
            }
            pool.extend_from_slice(&voxels);

            let msd = level == last_level;
            let child = if msd {
              0
            } else {
              let child = confirmed + nodes_in_level + non_empty * 8;
              if child + 8 > MAX_NODES {
                return Err(SvoError::NodeCapacityExceeded {
                  needed: child + 8,
                  limit: MAX_NODES,
                });
              }
              debug_assert_eq!(records.len(), child, "child range must be contiguous");
              records.extend((0..8).map(|_| NodeRecord::pending(Some(id as u32))));
              child
            };

            records[id].word = IndexWord::new(msd, true, child as u32);
            records[id].pool = Some(coord);
            non_empty += 1;
          }
        }

        on_progress(BuildProgress {
          level,
          levels,
          done: i + 1,
          total: nodes_in_level,
        });
      }

      tracing::info!(
        level,
        nodes = nodes_in_level,
        non_empty,
        search_radius,
        pool_used = budget.used(),
        "octree level done"
      );
      level_stats.push(LevelStats {
        level,
        nodes: nodes_in_level,
        non_empty,
        search_radius,
      });

      confirmed += nodes_in_level;
      nodes_in_level = records.len() - confirmed;
      if nodes_in_level == 0 {
        if level < last_level {
          on_progress(BuildProgress {
            level: last_level,
            levels,
            done: 0,
            total: 0,
          });
        }
        break;
      }
    }

    let index = records.iter().map(|r| r.word.pack()).collect();
    let brick = records
      .iter()
      .map(|r| r.pool.map(|c| c.pack()).unwrap_or(0))
      .collect();
    pool.shrink_to_fit();

    Ok(BuiltOctree {
      index,
      brick,
      pool,
      levels,
      layout,
      pool_power: config.pool_power,
      level_stats,
    })
  }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;

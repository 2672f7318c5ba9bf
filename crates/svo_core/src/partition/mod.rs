//! Spatial partitioner: brick occupancy queries over the frozen point cloud.
//!
//! A brick at some node is sampled on an `outer^3` lattice. Voxel `k` along an
//! axis sits at `node_min + (k + 0.5) * spacing` with
//! `spacing = node_side / inner`, so the first `inner` voxels cover the node
//! and the rest reach into the `+1` neighbour.
//!
//! Each site combines the samples within `search_radius` by inverse-distance
//! weighting:
//!
//! ```text
//! value = Σ w_i · I_i / Σ w_i,   w_i = 1 / max(d_i, spacing · 1e-3)
//! ```
//!
//! Sites nobody reaches hold 0. The brick is empty when no site is reached.
//! The rule is a pair of sums, so it does not depend on point order.

mod kdtree;
mod strategy;

use std::sync::Arc;

use glam::DVec3;
use rayon::prelude::*;

pub use kdtree::{KdTree, Neighbor, NeighborList};
pub use strategy::{CandidateThreshold, DensityPolicy, FixedStrategy, OccupancyStrategy};

use crate::accumulator::PointCloud;
use crate::constants::voxel_coord;
use crate::context::ComputeContext;
use crate::octree::Extent;
use crate::types::BrickLayout;

/// Relative floor of the inverse-distance weight denominator.
const WEIGHT_FLOOR: f64 = 1e-3;

/// Result of one occupancy query.
#[derive(Clone, Debug, PartialEq)]
pub enum Occupancy {
  /// No sample reaches any lattice site.
  Empty,
  /// `outer^3` voxels, X fastest.
  Brick(Vec<f32>),
}

impl Occupancy {
  pub fn is_empty(&self) -> bool {
    matches!(self, Occupancy::Empty)
  }

  /// Voxel values, or `None` for an empty brick.
  pub fn voxels(&self) -> Option<&[f32]> {
    match self {
      Occupancy::Empty => None,
      Occupancy::Brick(v) => Some(v),
    }
  }
}

/// Lattice sites of one brick.
#[derive(Clone, Copy, Debug)]
struct Lattice {
  /// Centre of site (0, 0, 0).
  origin: DVec3,
  spacing: f64,
  outer: usize,
}

impl Lattice {
  fn new(extent: &Extent, layout: BrickLayout) -> Self {
    let spacing = extent.side() / layout.inner as f64;
    Self {
      origin: extent.min + DVec3::splat(0.5 * spacing),
      spacing,
      outer: layout.outer,
    }
  }

  #[inline]
  fn site(&self, x: usize, y: usize, z: usize) -> DVec3 {
    self.origin + DVec3::new(x as f64, y as f64, z as f64) * self.spacing
  }

  /// Box spanning every site centre.
  fn bounds(&self) -> Extent {
    let last = (self.outer - 1) as f64 * self.spacing;
    Extent::new(self.origin, self.origin + DVec3::splat(last))
  }

  /// Sites along one axis that may lie within `radius` of `coord`.
  ///
  /// Widened by one site each way; the exact distance test decides.
  fn axis_span(&self, coord: f64, origin: f64, radius: f64) -> Option<(usize, usize)> {
    let lo = ((coord - radius - origin) / self.spacing).ceil() - 1.0;
    let hi = ((coord + radius - origin) / self.spacing).floor() + 1.0;
    let last = (self.outer - 1) as f64;
    if hi < 0.0 || lo > last {
      return None;
    }
    Some((lo.max(0.0) as usize, hi.min(last) as usize))
  }

  fn weight_floor(&self) -> f64 {
    self.spacing * WEIGHT_FLOOR
  }
}

/// Running inverse-distance-weighted sum for one site.
#[derive(Clone, Copy, Debug, Default)]
struct SiteSum {
  weighted: f64,
  weights: f64,
  hits: u32,
}

impl SiteSum {
  #[inline]
  fn add(&mut self, dist_sq: f64, intensity: f64, floor: f64) {
    let w = 1.0 / dist_sq.sqrt().max(floor);
    self.weighted += w * intensity;
    self.weights += w;
    self.hits += 1;
  }

  #[inline]
  fn value(&self) -> f32 {
    if self.hits == 0 {
      0.0
    } else {
      (self.weighted / self.weights) as f32
    }
  }
}

/// Range-search structure built once over the frozen point cloud.
///
/// Takes ownership of the cloud and indexes it in place, so the only memory
/// added on top of the samples is [`Self::index_bytes`].
pub struct SpatialPartitioner {
  cloud: PointCloud,
  tree: KdTree,
  ctx: Arc<ComputeContext>,
  policy: Box<dyn DensityPolicy>,
}

impl SpatialPartitioner {
  /// Bulk-load the cloud. Uses [`CandidateThreshold::default`].
  #[cfg_attr(feature = "spans", tracing::instrument(skip_all, name = "partition::build"))]
  pub fn build(cloud: PointCloud, ctx: Arc<ComputeContext>) -> Self {
    let tree = KdTree::build(cloud.samples());
    tracing::debug!(
      points = cloud.len(),
      sample_bytes = cloud.byte_len(),
      index_bytes = tree.byte_len(),
      "partitioner built"
    );
    Self {
      cloud,
      tree,
      ctx,
      policy: Box::new(CandidateThreshold::default()),
    }
  }

  /// The indexed cloud.
  pub fn cloud(&self) -> &PointCloud {
    &self.cloud
  }

  /// Bytes the search index adds on top of the cloud's samples.
  pub fn index_bytes(&self) -> usize {
    self.tree.byte_len()
  }

  /// Replace the density policy.
  pub fn with_policy(mut self, policy: impl DensityPolicy + 'static) -> Self {
    self.policy = Box::new(policy);
    self
  }

  pub fn len(&self) -> usize {
    self.cloud.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cloud.is_empty()
  }

  /// Evaluate the brick lattice inside `extent`.
  pub fn occupancy(&self, extent: &Extent, search_radius: f64, layout: BrickLayout, level: usize) -> Occupancy {
    let lattice = Lattice::new(extent, layout);
    let reach = lattice.bounds().expanded(search_radius);
    let candidates = self.tree.box_query(self.cloud.samples(), &reach);
    if candidates.is_empty() {
      return Occupancy::Empty;
    }

    let strategy = self.policy.choose(candidates.len(), layout.voxels());
    tracing::trace!(level, candidates = candidates.len(), ?strategy, "occupancy");
    let radius_sq = search_radius * search_radius;
    let sums = match strategy {
      OccupancyStrategy::PerSite => self.per_site(&lattice, radius_sq),
      OccupancyStrategy::Batched => self.batched(&lattice, search_radius, &candidates),
    };

    if sums.iter().all(|s| s.hits == 0) {
      return Occupancy::Empty;
    }
    Occupancy::Brick(sums.iter().map(SiteSum::value).collect())
  }

  /// One range query per site.
  fn per_site(&self, lattice: &Lattice, radius_sq: f64) -> Vec<SiteSum> {
    let outer = lattice.outer;
    let floor = lattice.weight_floor();
    let samples = self.cloud.samples();
    let mut neighbors = NeighborList::new();
    (0..outer * outer * outer)
      .map(|index| {
        let (x, y, z) = voxel_coord(index, outer);
        neighbors.clear();
        self.tree.range_search(samples, lattice.site(x, y, z), radius_sq, &mut neighbors);
        let mut sum = SiteSum::default();
        for n in &neighbors {
          sum.add(n.dist_sq, samples[n.index].intensity as f64, floor);
        }
        sum
      })
      .collect()
  }

  /// Scatter candidates onto the lattice, one z-slice per task.
  fn batched(&self, lattice: &Lattice, radius: f64, candidates: &[usize]) -> Vec<SiteSum> {
    struct Reach {
      index: usize,
      x: (usize, usize),
      y: (usize, usize),
      z: (usize, usize),
    }

    let origin = lattice.origin;
    let samples = self.cloud.samples();
    let reaches: Vec<Reach> = candidates
      .iter()
      .filter_map(|&index| {
        let p = samples[index].position();
        Some(Reach {
          index,
          x: lattice.axis_span(p.x, origin.x, radius)?,
          y: lattice.axis_span(p.y, origin.y, radius)?,
          z: lattice.axis_span(p.z, origin.z, radius)?,
        })
      })
      .collect();

    let outer = lattice.outer;
    let radius_sq = radius * radius;
    let floor = lattice.weight_floor();
    let mut sums = vec![SiteSum::default(); outer * outer * outer];
    self.ctx.install(|| {
      sums
        .par_chunks_mut(outer * outer)
        .enumerate()
        .for_each(|(z, slice)| {
          for r in reaches.iter().filter(|r| r.z.0 <= z && z <= r.z.1) {
            let p = samples[r.index].position();
            let intensity = samples[r.index].intensity as f64;
            for y in r.y.0..=r.y.1 {
              for x in r.x.0..=r.x.1 {
                let dist_sq = lattice.site(x, y, z).distance_squared(p);
                if dist_sq <= radius_sq {
                  slice[x + outer * y].add(dist_sq, intensity, floor);
                }
              }
            }
          }
        });
    });
    sums
  }
}

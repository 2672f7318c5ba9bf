//! Selection between the two occupancy evaluation paths.

use crate::constants::DEFAULT_DENSITY_THRESHOLD;

/// How one brick's lattice is evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OccupancyStrategy {
  /// One kd-tree range query per lattice site, on the calling thread.
  PerSite,
  /// Candidates scattered onto the lattice, z-slices dispatched on the
  /// compute context.
  Batched,
}

/// Chooses a strategy for one brick.
///
/// Both strategies produce the same brick within floating tolerance, so a
/// policy only trades throughput.
pub trait DensityPolicy: Send + Sync {
  /// `candidates` is the number of samples that may reach any lattice site,
  /// `sites` the number of lattice sites.
  fn choose(&self, candidates: usize, sites: usize) -> OccupancyStrategy;
}

/// Batched above a fixed candidate count, per-site otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidateThreshold {
  pub threshold: usize,
}

impl CandidateThreshold {
  pub fn new(threshold: usize) -> Self {
    Self { threshold }
  }
}

impl Default for CandidateThreshold {
  fn default() -> Self {
    Self::new(DEFAULT_DENSITY_THRESHOLD)
  }
}

impl DensityPolicy for CandidateThreshold {
  fn choose(&self, candidates: usize, _sites: usize) -> OccupancyStrategy {
    if candidates > self.threshold {
      OccupancyStrategy::Batched
    } else {
      OccupancyStrategy::PerSite
    }
  }
}

/// Always the same strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedStrategy(pub OccupancyStrategy);

impl DensityPolicy for FixedStrategy {
  fn choose(&self, _candidates: usize, _sites: usize) -> OccupancyStrategy {
    self.0
  }
}

//! Static 3D kd-tree over the samples of a frozen point cloud.
//!
//! The tree does not copy positions: it keeps a `u32` permutation of sample
//! indices and reads coordinates from the cloud on every query. Leaves
//! reference contiguous ranges of that permutation. Samples left of a split
//! are `<= value`, samples right of it are `>= value`.

use glam::DVec3;
use smallvec::SmallVec;

use crate::constants::MAX_CLOUD_POINTS;
use crate::octree::Extent;
use crate::types::Sample;

/// Range query hit: sample index and squared distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
  pub index: usize,
  pub dist_sq: f64,
}

/// Inline capacity sized for a typical per-site neighbourhood.
pub type NeighborList = SmallVec<[Neighbor; 16]>;

#[derive(Debug, Clone)]
enum Node {
  Split {
    axis: u8,
    value: f64,
    left: u32,
    right: u32,
  },
  Leaf {
    start: u32,
    end: u32,
  },
}

/// Maximum number of samples in a leaf.
const LEAF_SIZE: usize = 16;

/// Index over a sample slice. Every query takes the same slice it was built on.
#[derive(Debug, Clone, Default)]
pub struct KdTree {
  nodes: Vec<Node>,
  order: Vec<u32>,
}

impl KdTree {
  /// Bulk-load over `samples`; hits report indices into `samples`.
  pub fn build(samples: &[Sample]) -> Self {
    let n = samples.len();
    debug_assert!(n <= MAX_CLOUD_POINTS, "sample indices must fit in u32");
    let mut tree = KdTree {
      nodes: Vec::new(),
      order: (0..n as u32).collect(),
    };
    if n > 0 {
      let mut order = std::mem::take(&mut tree.order);
      tree.build_range(samples, &mut order, 0, n);
      tree.order = order;
    }
    tree
  }

  fn build_range(&mut self, samples: &[Sample], order: &mut [u32], start: usize, end: usize) -> usize {
    let count = end - start;
    if count <= LEAF_SIZE {
      let id = self.nodes.len();
      self.nodes.push(Node::Leaf {
        start: start as u32,
        end: end as u32,
      });
      return id;
    }

    let axis = widest_axis(samples, &order[start..end]);
    let median = count / 2;
    order[start..end].select_nth_unstable_by(median, |&a, &b| {
      samples[a as usize].position()[axis].total_cmp(&samples[b as usize].position()[axis])
    });
    let mid = start + median;
    let value = samples[order[mid] as usize].position()[axis];

    let id = self.nodes.len();
    self.nodes.push(Node::Leaf { start: 0, end: 0 });
    let left = self.build_range(samples, order, start, mid);
    let right = self.build_range(samples, order, mid, end);
    self.nodes[id] = Node::Split {
      axis: axis as u8,
      value,
      left: left as u32,
      right: right as u32,
    };
    id
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  /// Heap bytes held by the index (the samples are not counted).
  pub fn byte_len(&self) -> usize {
    self.nodes.len() * std::mem::size_of::<Node>() + self.order.len() * std::mem::size_of::<u32>()
  }

  /// Append every sample within `radius_sq` (inclusive) of `query` to `out`.
  pub fn range_search(&self, samples: &[Sample], query: DVec3, radius_sq: f64, out: &mut NeighborList) {
    if !self.nodes.is_empty() {
      self.range_search_node(samples, 0, query, radius_sq, out);
    }
  }

  fn range_search_node(
    &self,
    samples: &[Sample],
    id: usize,
    query: DVec3,
    radius_sq: f64,
    out: &mut NeighborList,
  ) {
    match self.nodes[id] {
      Node::Leaf { start, end } => {
        for &i in &self.order[start as usize..end as usize] {
          let index = i as usize;
          let dist_sq = query.distance_squared(samples[index].position());
          if dist_sq <= radius_sq {
            out.push(Neighbor { index, dist_sq });
          }
        }
      }
      Node::Split {
        axis,
        value,
        left,
        right,
      } => {
        let diff = query[axis as usize] - value;
        let (near, far) = if diff <= 0.0 { (left, right) } else { (right, left) };
        let (near, far) = (near as usize, far as usize);
        self.range_search_node(samples, near, query, radius_sq, out);
        if diff * diff <= radius_sq {
          self.range_search_node(samples, far, query, radius_sq, out);
        }
      }
    }
  }

  /// Indices of every sample inside `extent` (boundaries count).
  pub fn box_query(&self, samples: &[Sample], extent: &Extent) -> Vec<usize> {
    let mut out = Vec::new();
    if !self.nodes.is_empty() {
      self.box_query_node(samples, 0, extent, &mut out);
    }
    out
  }

  fn box_query_node(&self, samples: &[Sample], id: usize, extent: &Extent, out: &mut Vec<usize>) {
    match self.nodes[id] {
      Node::Leaf { start, end } => {
        for &i in &self.order[start as usize..end as usize] {
          if extent.contains_point(samples[i as usize].position()) {
            out.push(i as usize);
          }
        }
      }
      Node::Split {
        axis,
        value,
        left,
        right,
      } => {
        let axis = axis as usize;
        if extent.min[axis] <= value {
          self.box_query_node(samples, left as usize, extent, out);
        }
        if extent.max[axis] >= value {
          self.box_query_node(samples, right as usize, extent, out);
        }
      }
    }
  }
}

fn widest_axis(samples: &[Sample], order: &[u32]) -> usize {
  let mut lo = DVec3::splat(f64::INFINITY);
  let mut hi = DVec3::splat(f64::NEG_INFINITY);
  for &i in order {
    let p = samples[i as usize].position();
    lo = lo.min(p);
    hi = hi.max(p);
  }
  let spread = hi - lo;
  if spread.x >= spread.y && spread.x >= spread.z {
    0
  } else if spread.y >= spread.z {
    1
  } else {
    2
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn grid(n: usize) -> Vec<Sample> {
    let mut samples = Vec::new();
    for z in 0..n {
      for y in 0..n {
        for x in 0..n {
          samples.push(Sample::new(x as f32, y as f32, z as f32, 1.0));
        }
      }
    }
    samples
  }

  fn brute_range(samples: &[Sample], query: DVec3, radius_sq: f64) -> Vec<usize> {
    (0..samples.len())
      .filter(|&i| samples[i].position().distance_squared(query) <= radius_sq)
      .collect()
  }

  #[test]
  fn test_empty_tree() {
    let tree = KdTree::build(&[]);
    assert!(tree.is_empty());
    let mut out = NeighborList::new();
    tree.range_search(&[], DVec3::ZERO, 10.0, &mut out);
    assert!(out.is_empty());
    assert!(tree.box_query(&[], &Extent::cube(10.0)).is_empty());
  }

  #[test]
  fn test_range_search_matches_brute_force() {
    let samples = grid(8);
    let tree = KdTree::build(&samples);
    for query in [DVec3::splat(3.5), DVec3::ZERO, DVec3::new(7.0, 0.2, 4.9)] {
      for radius in [0.5, 1.0, 1.5, 3.0] {
        let mut out = NeighborList::new();
        tree.range_search(&samples, query, radius * radius, &mut out);
        let mut got: Vec<usize> = out.iter().map(|n| n.index).collect();
        got.sort_unstable();
        assert_eq!(got, brute_range(&samples, query, radius * radius));
        for n in &out {
          assert_eq!(n.dist_sq, samples[n.index].position().distance_squared(query));
        }
      }
    }
  }

  #[test]
  fn test_duplicate_points_are_all_found() {
    let samples = vec![Sample::new(1.0, 1.0, 1.0, 2.0); 40];
    let tree = KdTree::build(&samples);
    let mut out = NeighborList::new();
    tree.range_search(&samples, DVec3::splat(1.0), 0.0, &mut out);
    assert_eq!(out.len(), 40);
  }

  #[test]
  fn test_box_query_matches_brute_force() {
    let samples = grid(6);
    let tree = KdTree::build(&samples);
    let extent = Extent::new(DVec3::new(1.0, 0.5, 2.0), DVec3::new(3.0, 4.0, 2.0));
    let mut got = tree.box_query(&samples, &extent);
    got.sort_unstable();
    let expected: Vec<usize> = (0..samples.len())
      .filter(|&i| extent.contains_point(samples[i].position()))
      .collect();
    assert_eq!(got, expected);
    assert_eq!(got.len(), 3 * 4);
  }

  #[test]
  fn test_index_costs_a_fraction_of_the_samples() {
    let samples = grid(20);
    let tree = KdTree::build(&samples);
    assert_eq!(tree.len(), samples.len());
    let sample_bytes = samples.len() * std::mem::size_of::<Sample>();
    // u32 permutation plus about two nodes per leaf of 8..=16 samples.
    assert!(tree.byte_len() < sample_bytes, "{} vs {sample_bytes}", tree.byte_len());
  }
}

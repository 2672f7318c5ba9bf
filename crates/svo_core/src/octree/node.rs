//! OctreeNode - value type naming a brick position in the octree.
//!
//! Nodes are identified by their grid coordinates at their own level.
//! Level 0 = the root (whole extent), each level halves the brick side.

/// Octree node - immutable value type.
///
/// At level `L` the extent is cut into a `2^L` grid per axis; `x`, `y`, `z`
/// index that grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct OctreeNode {
  /// Grid X position at this node's level
  pub x: u32,
  /// Grid Y position at this node's level
  pub y: u32,
  /// Grid Z position at this node's level
  pub z: u32,
  /// Depth (0 = root)
  pub level: u32,
}

impl OctreeNode {
  pub fn new(x: u32, y: u32, z: u32, level: u32) -> Self {
    Self { x, y, z, level }
  }

  /// The single level-0 node covering the whole extent.
  pub const fn root() -> Self {
    Self {
      x: 0,
      y: 0,
      z: 0,
      level: 0,
    }
  }

  /// Get child node (one level finer).
  ///
  /// Octant: 0-7 where bits represent +X, +Y, +Z offsets:
  /// - bit 0: X offset (0 or 1)
  /// - bit 1: Y offset (0 or 1)
  /// - bit 2: Z offset (0 or 1)
  pub fn child(&self, octant: u8) -> Self {
    debug_assert!(octant < 8, "octant out of range");
    Self {
      x: self.x * 2 + (octant & 1) as u32,
      y: self.y * 2 + ((octant >> 1) & 1) as u32,
      z: self.z * 2 + ((octant >> 2) & 1) as u32,
      level: self.level + 1,
    }
  }

  /// Get parent node (one level coarser). None for the root.
  pub fn parent(&self) -> Option<Self> {
    if self.level == 0 {
      return None;
    }
    Some(Self {
      x: self.x / 2,
      y: self.y / 2,
      z: self.z / 2,
      level: self.level - 1,
    })
  }

  /// Which octant of its parent this node occupies.
  pub fn octant(&self) -> u8 {
    ((self.x & 1) | ((self.y & 1) << 1) | ((self.z & 1) << 2)) as u8
  }

  /// Grid cells per axis at this node's level.
  pub fn grid_size(&self) -> u64 {
    1u64 << self.level
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;

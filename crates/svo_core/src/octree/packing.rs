//! Bit-packed node and pool-coordinate words consumed by renderers.
//!
//! ```text
//! IndexWord  [31] msd | [30] data | [29..0] child
//! PoolCoord  [29..20] x | [19..10] y | [9..0] z
//! ```
//!
//! `child` is the node-table offset of the first of 8 contiguous children
//! (0 = none), so a tree holds at most `2^30` nodes. Each pool axis field is
//! 10 bits, so the pool is at most `1024^3` bricks.

use crate::constants::{CHILD_MASK, DATA_FLAG, MSD_FLAG, POOL_AXIS_BITS, POOL_AXIS_MASK};

/// Unpacked index word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IndexWord {
  /// Terminal node (most subdivided).
  pub msd: bool,
  /// Node carries a brick.
  pub data: bool,
  /// Offset of the first child, 0 when there are none.
  pub child: u32,
}

impl IndexWord {
  pub fn new(msd: bool, data: bool, child: u32) -> Self {
    debug_assert!(child <= CHILD_MASK, "child offset {child} exceeds 30 bits");
    Self { msd, data, child }
  }

  #[inline]
  pub fn pack(&self) -> u32 {
    let mut word = self.child & CHILD_MASK;
    if self.msd {
      word |= MSD_FLAG;
    }
    if self.data {
      word |= DATA_FLAG;
    }
    word
  }

  #[inline]
  pub fn unpack(word: u32) -> Self {
    Self {
      msd: word & MSD_FLAG != 0,
      data: word & DATA_FLAG != 0,
      child: word & CHILD_MASK,
    }
  }

  /// Whether the node has 8 children.
  #[inline]
  pub fn has_children(&self) -> bool {
    self.child != 0
  }
}

/// Brick position inside the pool, in bricks per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PoolCoord {
  pub x: u32,
  pub y: u32,
  pub z: u32,
}

impl PoolCoord {
  pub fn new(x: u32, y: u32, z: u32) -> Self {
    debug_assert!(
      x <= POOL_AXIS_MASK && y <= POOL_AXIS_MASK && z <= POOL_AXIS_MASK,
      "pool coordinate exceeds 10 bits"
    );
    Self { x, y, z }
  }

  /// Coordinate of the `slot`-th assigned brick in a pool `side` bricks wide.
  ///
  /// Slots fill X first, then Y, then Z.
  pub fn from_slot(slot: usize, side: usize) -> Self {
    Self::new(
      (slot % side) as u32,
      ((slot / side) % side) as u32,
      (slot / (side * side)) as u32,
    )
  }

  /// Inverse of [`Self::from_slot`].
  pub fn slot(&self, side: usize) -> usize {
    self.x as usize + side * (self.y as usize + side * self.z as usize)
  }

  #[inline]
  pub fn pack(&self) -> u32 {
    ((self.x & POOL_AXIS_MASK) << (2 * POOL_AXIS_BITS))
      | ((self.y & POOL_AXIS_MASK) << POOL_AXIS_BITS)
      | (self.z & POOL_AXIS_MASK)
  }

  #[inline]
  pub fn unpack(word: u32) -> Self {
    Self {
      x: (word >> (2 * POOL_AXIS_BITS)) & POOL_AXIS_MASK,
      y: (word >> POOL_AXIS_BITS) & POOL_AXIS_MASK,
      z: word & POOL_AXIS_MASK,
    }
  }
}

use std::collections::HashSet;

use super::*;

/// Child node is one level deeper.
#[test]
fn test_child_is_finer() {
  let parent = OctreeNode::new(1, 2, 3, 4);
  assert_eq!(parent.child(0).level, 5);
}

/// All 8 octants produce distinct children with the documented bit layout.
#[test]
fn test_child_all_8_octants() {
  let parent = OctreeNode::new(3, 4, 5, 10);
  let mut seen = HashSet::new();

  for octant in 0u8..8 {
    let child = parent.child(octant);

    assert_eq!(child.x, parent.x * 2 + (octant & 1) as u32, "Octant {} X mismatch", octant);
    assert_eq!(child.y, parent.y * 2 + ((octant >> 1) & 1) as u32, "Octant {} Y mismatch", octant);
    assert_eq!(child.z, parent.z * 2 + ((octant >> 2) & 1) as u32, "Octant {} Z mismatch", octant);
    assert_eq!(child.octant(), octant);
    assert!(seen.insert(child), "Octant {} duplicated", octant);
  }
}

#[test]
fn test_parent_child_roundtrip() {
  let node = OctreeNode::new(5, 6, 7, 3);
  for octant in 0u8..8 {
    assert_eq!(node.child(octant).parent(), Some(node));
  }
}

#[test]
fn test_root_has_no_parent() {
  assert_eq!(OctreeNode::root().parent(), None);
  assert_eq!(OctreeNode::root().grid_size(), 1);
}

#[test]
fn test_grid_size_doubles() {
  let mut node = OctreeNode::root();
  for level in 0..15 {
    assert_eq!(node.grid_size(), 1 << level);
    node = node.child(7);
  }
  assert_eq!(node.x, (1 << 15) - 1);
}

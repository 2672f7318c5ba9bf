use super::*;

#[test]
fn test_sample_is_sixteen_bytes() {
  assert_eq!(SAMPLE_BYTES, 16);
}

#[test]
fn test_sample_position_widens() {
  let s = Sample::new(1.5, -2.0, 0.25, 10.0);
  assert_eq!(s.position(), DVec3::new(1.5, -2.0, 0.25));
}

#[test]
fn test_sample_bits_distinguish_signed_zero() {
  let a = Sample::new(0.0, 0.0, 0.0, 1.0);
  let b = Sample::new(-0.0, 0.0, 0.0, 1.0);
  assert_eq!(a, b);
  assert_ne!(a.to_bits(), b.to_bits());
}

#[test]
fn test_default_layout() {
  let layout = BrickLayout::default();
  assert_eq!(layout.inner, 7);
  assert_eq!(layout.outer, 8);
  assert_eq!(layout.voxels(), 512);
  assert_eq!(layout.bytes(), 2048);
}

#[test]
fn test_minmax_encapsulate() {
  let mut range = MinMax::empty();
  assert!(range.is_empty());
  assert_eq!(range.to_array(), [0.0, 0.0]);

  range.encapsulate(3.0);
  range.encapsulate(-1.0);
  range.encapsulate(2.0);

  assert!(!range.is_empty());
  assert_eq!(range.to_array(), [-1.0, 3.0]);
}

#[test]
fn test_rotation_axis_defaults_to_phi() {
  assert_eq!(RotationAxis::default(), RotationAxis::Phi);
}

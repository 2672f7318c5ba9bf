//! Core data types shared across the reduction pipeline.

use glam::DVec3;
use serde::Deserialize;

/// One corrected reciprocal-space sample.
///
/// Position is in inverse Ångström, intensity already corrected.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sample {
  pub x: f32,
  pub y: f32,
  pub z: f32,
  pub intensity: f32,
}

/// Bytes occupied by one sample in the point cloud.
pub const SAMPLE_BYTES: usize = std::mem::size_of::<Sample>();

impl Sample {
  pub fn new(x: f32, y: f32, z: f32, intensity: f32) -> Self {
    Self { x, y, z, intensity }
  }

  /// Position in double precision (for range queries).
  #[inline]
  pub fn position(&self) -> DVec3 {
    DVec3::new(self.x as f64, self.y as f64, self.z as f64)
  }

  /// Raw bit pattern, used for exact comparisons.
  #[inline]
  pub fn to_bits(&self) -> [u32; 4] {
    [
      self.x.to_bits(),
      self.y.to_bits(),
      self.z.to_bits(),
      self.intensity.to_bits(),
    ]
  }
}

/// Goniometer axis oscillated during a frame's exposure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationAxis {
  #[default]
  Phi,
  Kappa,
  Omega,
}

/// Brick dimensions: inner (authoritative) and outer (stored) side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrickLayout {
  pub inner: usize,
  pub outer: usize,
}

impl BrickLayout {
  pub fn new(inner: usize, outer: usize) -> Self {
    debug_assert!(inner >= 1 && outer >= inner, "outer must cover inner");
    Self { inner, outer }
  }

  /// Voxels per stored brick (outer³).
  #[inline]
  pub fn voxels(&self) -> usize {
    self.outer * self.outer * self.outer
  }

  /// Bytes per stored brick.
  #[inline]
  pub fn bytes(&self) -> usize {
    self.voxels() * std::mem::size_of::<f32>()
  }
}

impl Default for BrickLayout {
  fn default() -> Self {
    Self {
      inner: crate::constants::DEFAULT_BRICK_INNER_DIMENSION,
      outer: crate::constants::DEFAULT_BRICK_OUTER_DIMENSION,
    }
  }
}

/// Running minimum/maximum of a scalar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMax {
  pub min: f64,
  pub max: f64,
}

impl MinMax {
  /// Create with inverted range (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: f64::INFINITY,
      max: f64::NEG_INFINITY,
    }
  }

  /// Expand to include a value.
  #[inline]
  pub fn encapsulate(&mut self, value: f64) {
    self.min = self.min.min(value);
    self.max = self.max.max(value);
  }

  /// True when no value was ever encapsulated.
  pub fn is_empty(&self) -> bool {
    self.min > self.max
  }

  /// `[min, max]`, or zeros when empty.
  pub fn to_array(&self) -> [f64; 2] {
    if self.is_empty() {
      [0.0, 0.0]
    } else {
      [self.min, self.max]
    }
  }
}

impl Default for MinMax {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

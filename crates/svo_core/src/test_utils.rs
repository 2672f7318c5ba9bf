//! Test utilities shared across modules.
//!
//! Synthetic frames, point clouds and a small compute context so each stage
//! can be tested in isolation.

use std::sync::Arc;

use crate::context::ComputeContext;
use crate::projection::{
  CalibratedFrame, CorrectionConfig, FrameGeometry, Gate, ProjectionSettings,
};
use crate::types::Sample;

// =============================================================================
// Compute
// =============================================================================

/// Two-thread context so parallel paths actually run in parallel.
pub fn test_context() -> Arc<ComputeContext> {
  Arc::new(ComputeContext::new(2).expect("test pool"))
}

/// Open gates, no corrections.
pub fn open_settings() -> ProjectionSettings {
  ProjectionSettings {
    reduce_gate: Gate::open(),
    project_gate: Gate::open(),
    corrections: CorrectionConfig::none(),
    ..Default::default()
  }
}

// =============================================================================
// Frames
// =============================================================================

/// 4x4 detector, λ = 1 Å, 1 m distance, beam at (2, 2), 100 µm pixels.
pub fn small_geometry() -> FrameGeometry {
  FrameGeometry {
    wavelength: 1.0,
    detector_distance: 1.0,
    beam_center_x: 2.0,
    beam_center_y: 2.0,
    pixel_size_x: 1e-4,
    pixel_size_y: 1e-4,
    ..Default::default()
  }
}

/// Frame whose pixel values follow a deterministic non-trivial pattern.
pub fn pattern_frame(label: &str, width: usize, height: usize, geometry: FrameGeometry) -> CalibratedFrame {
  let pixels = (0..width * height)
    .map(|i| {
      let (c, r) = ((i % width) as f32, (i / width) as f32);
      1.0 + ((c * 0.37 + r * 0.11).sin().abs() * 100.0).floor()
    })
    .collect();
  CalibratedFrame::new(label, width, height, pixels, geometry)
}

/// Frame with every pixel set to `value`.
pub fn constant_frame(label: &str, width: usize, height: usize, value: f32, geometry: FrameGeometry) -> CalibratedFrame {
  CalibratedFrame::new(label, width, height, vec![value; width * height], geometry)
}

/// Closed-form |Q| for a pixel on a flat detector normal to the beam.
pub fn ewald_q(geometry: &FrameGeometry, column: f64, row: f64) -> f64 {
  let dx = (column - geometry.beam_center_x) * geometry.pixel_size_x;
  let dy = (row - geometry.beam_center_y) * geometry.pixel_size_y;
  let two_theta = (dx * dx + dy * dy).sqrt().atan2(geometry.detector_distance);
  2.0 * (0.5 * two_theta).sin() / geometry.wavelength
}

// =============================================================================
// Point clouds
// =============================================================================

/// Pseudo-random samples inside `[-half, half]^3` (fixed LCG, reproducible).
pub fn scattered_cloud(count: usize, half: f32, seed: u64) -> Vec<Sample> {
  let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
  let mut next = move || {
    state = state
      .wrapping_mul(6364136223846793005)
      .wrapping_add(1442695040888963407);
    ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
  };
  (0..count)
    .map(|_| {
      let (x, y, z) = (next() * half, next() * half, next() * half);
      Sample::new(x, y, z, 1.0 + (next() + 1.0) * 50.0)
    })
    .collect()
}

/// Tight clump of samples around `center`.
pub fn clump(center: [f32; 3], spread: f32, count: usize, intensity: f32) -> Vec<Sample> {
  scattered_cloud(count, spread, 7)
    .into_iter()
    .map(|s| Sample::new(center[0] + s.x, center[1] + s.y, center[2] + s.z, intensity))
    .collect()
}

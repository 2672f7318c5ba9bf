//! Tests for Ewald-sphere frame projection.

use super::*;
use crate::error::SvoError;
use crate::projection::{FrameGeometry, RotationOffsets};
use crate::test_utils::*;

fn projector(settings: ProjectionSettings) -> FrameProjector {
  FrameProjector::new(test_context(), settings)
}

fn sorted_bits(samples: &[Sample]) -> Vec<[u32; 4]> {
  let mut bits: Vec<_> = samples.iter().map(Sample::to_bits).collect();
  bits.sort_unstable();
  bits
}

// =============================================================================
// Geometry
// =============================================================================

/// 4x4 frame with open gates: every pixel lands on the Ewald sphere.
#[test]
fn test_small_frame_matches_closed_form() {
  let geometry = small_geometry();
  let frame = constant_frame("a", 4, 4, 5.0, geometry.clone());

  let out = projector(open_settings()).project(&frame).unwrap();

  assert_eq!(out.samples.len(), 16);
  assert_eq!(out.stats.accepted(), 16);
  for (i, sample) in out.samples.iter().enumerate() {
    let (column, row) = ((i % 4) as f64, (i / 4) as f64);
    let expected = ewald_q(&geometry, column, row);
    let actual = sample.position().length();
    if expected == 0.0 {
      assert_eq!(actual, 0.0, "beam-centre pixel should map to Q = 0");
    } else {
      let rel = (actual - expected).abs() / expected;
      assert!(rel < 1e-5, "pixel ({column}, {row}): |Q| {actual} vs {expected}");
    }
    assert_eq!(sample.intensity, 5.0);
  }
}

/// Goniometer rotation moves samples but keeps |Q|.
#[test]
fn test_rotation_preserves_magnitude() {
  let mut geometry = small_geometry();
  geometry.omega = 35.0;
  geometry.kappa = -20.0;
  geometry.start_angle = 12.0;
  geometry.angle_increment = 0.2;
  let frame = constant_frame("rot", 4, 4, 1.0, geometry.clone());

  let plain = projector(open_settings())
    .project(&constant_frame("plain", 4, 4, 1.0, small_geometry()))
    .unwrap();
  let rotated = projector(open_settings()).project(&frame).unwrap();

  let mut moved = false;
  for (a, b) in plain.samples.iter().zip(&rotated.samples) {
    let (la, lb) = (a.position().length(), b.position().length());
    assert!((la - lb).abs() <= 1e-6 * la.max(1e-9));
    moved |= (a.position() - b.position()).length() > 1e-9;
  }
  assert!(moved, "non-zero angles must rotate samples");
}

/// Omega active at 90°: a sample on +Y is carried onto the X axis.
#[test]
fn test_omega_rotation_direction() {
  let mut geometry = small_geometry();
  geometry.start_angle = 90.0;
  let settings = ProjectionSettings {
    active_axis: RotationAxis::Omega,
    ..open_settings()
  };
  // Pixel (3, 2) scatters toward +Y.
  let frame = constant_frame("omega", 4, 4, 1.0, geometry);
  let out = projector(settings).project(&frame).unwrap();
  let s = out.samples[2 * 4 + 3];

  let q = ewald_q(&small_geometry(), 3.0, 2.0) as f32;
  assert!(s.x > 0.999 * q, "expected +X, got {s:?}");
  assert!(s.y.abs() < 1e-3 * q);
  assert!(s.z.abs() < 1e-3 * q);
}

/// Rotation offsets act like extra goniometer angle.
#[test]
fn test_offsets_equivalent_to_angles() {
  let mut shifted = small_geometry();
  shifted.omega = 15.0;
  let with_angle = projector(open_settings())
    .project(&constant_frame("a", 4, 4, 1.0, shifted))
    .unwrap();

  let mut settings = open_settings();
  settings.goniometer.offsets = RotationOffsets {
    omega: 15.0,
    ..Default::default()
  };
  let with_offset = projector(settings)
    .project(&constant_frame("b", 4, 4, 1.0, small_geometry()))
    .unwrap();

  assert_eq!(with_angle.samples, with_offset.samples);
}

// =============================================================================
// Determinism and tiling
// =============================================================================

#[test]
fn test_projection_is_deterministic() {
  let frame = pattern_frame("det", 300, 200, FrameGeometry {
    beam_center_x: 150.0,
    beam_center_y: 90.0,
    ..small_geometry()
  });
  let p = projector(open_settings());

  let a = p.project(&frame).unwrap();
  let b = p.project(&frame).unwrap();

  let bits_a: Vec<_> = a.samples.iter().map(Sample::to_bits).collect();
  let bits_b: Vec<_> = b.samples.iter().map(Sample::to_bits).collect();
  assert_eq!(bits_a, bits_b);
}

#[test]
fn test_tile_size_does_not_change_sample_set() {
  let frame = pattern_frame("tiles", 53, 41, FrameGeometry {
    beam_center_x: 20.0,
    beam_center_y: 20.0,
    ..small_geometry()
  });

  let coarse = projector(open_settings()).project(&frame).unwrap();
  let fine = projector(ProjectionSettings {
    tile_size: 7,
    ..open_settings()
  })
  .project(&frame)
  .unwrap();

  assert_eq!(coarse.samples.len(), 53 * 41);
  assert_eq!(sorted_bits(&coarse.samples), sorted_bits(&fine.samples));
  assert_eq!(coarse.stats, fine.stats);
}

#[test]
fn test_tiles_cover_detector_once() {
  let tiles = super::tiles(300, 130, 128);
  assert_eq!(tiles.len(), 3 * 2);
  let area: usize = tiles.iter().map(|t| (t.x1 - t.x0) * (t.y1 - t.y0)).sum();
  assert_eq!(area, 300 * 130);
  assert_eq!(tiles[0], Tile { x0: 0, x1: 128, y0: 0, y1: 128 });
  assert_eq!(tiles[5], Tile { x0: 256, x1: 300, y0: 128, y1: 130 });
}

// =============================================================================
// Gates and corrections
// =============================================================================

#[test]
fn test_reduce_gate_filters_raw_intensity() {
  let mut frame = constant_frame("gate", 4, 4, 10.0, small_geometry());
  frame.pixels[0] = 0.5;
  frame.pixels[5] = 5000.0;
  frame.pixels[9] = f32::NAN;

  let out = projector(ProjectionSettings {
    reduce_gate: Gate::new(1.0, 1000.0),
    ..open_settings()
  })
  .project(&frame)
  .unwrap();

  assert_eq!(out.samples.len(), 13);
  assert_eq!(out.stats.rejected_raw, 3);
  assert_eq!(out.stats.rejected_corrected, 0);
}

#[test]
fn test_project_gate_uses_corrected_intensity() {
  let mut geometry = small_geometry();
  geometry.flux = 4.0;
  let frame = constant_frame("flux", 4, 4, 10.0, geometry);

  let settings = ProjectionSettings {
    project_gate: Gate::new(0.0, 3.0),
    corrections: CorrectionConfig {
      flux: true,
      ..CorrectionConfig::none()
    },
    ..open_settings()
  };
  let out = projector(settings).project(&frame).unwrap();

  // 10 / 4 = 2.5 passes the [0, 3] window.
  assert_eq!(out.samples.len(), 16);
  assert!(out.samples.iter().all(|s| s.intensity == 2.5));

  let strict = ProjectionSettings {
    project_gate: Gate::new(0.0, 2.0),
    corrections: CorrectionConfig {
      flux: true,
      ..CorrectionConfig::none()
    },
    ..open_settings()
  };
  let out = projector(strict).project(&frame).unwrap();
  assert!(out.samples.is_empty());
  assert_eq!(out.stats.rejected_corrected, 16);
}

#[test]
fn test_lorentz_zeroes_beam_centre() {
  let frame = constant_frame("lorentz", 4, 4, 10.0, small_geometry());
  let settings = ProjectionSettings {
    corrections: CorrectionConfig {
      lorentz: true,
      ..CorrectionConfig::none()
    },
    ..open_settings()
  };
  let out = projector(settings).project(&frame).unwrap();
  assert_eq!(out.samples[2 * 4 + 2].intensity, 0.0);
}

// =============================================================================
// Suggestions and failures
// =============================================================================

#[test]
fn test_suggestion_bounds() {
  let geometry = FrameGeometry {
    beam_center_x: 50.0,
    beam_center_y: 50.0,
    wavelength: 0.5,
    ..small_geometry()
  };
  let frame = constant_frame("s", 100, 100, 1.0, geometry);
  let out = projector(open_settings()).project(&frame).unwrap();
  let s = out.suggestion;

  assert_eq!(s.q_max, 2.0);
  assert!(s.radius_low > 0.0);
  assert!(s.radius_low <= s.radius_high);
  // Near the beam one pixel spans ~ pixel_size / distance / λ.
  let central = 1e-4 / 1.0 / 0.5;
  assert!((s.radius_high - central).abs() / central < 1e-3);
}

#[test]
fn test_invalid_frame_is_reported() {
  let mut frame = constant_frame("broken", 4, 4, 1.0, small_geometry());
  frame.geometry.detector_distance = -1.0;
  let err = projector(open_settings()).project(&frame).unwrap_err();
  assert!(matches!(err, SvoError::InvalidFrame { .. }));
}

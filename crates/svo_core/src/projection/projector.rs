//! Ewald-sphere projection of one detector frame into reciprocal space.
//!
//! ```text
//!   detector pixel (c, r)
//!         │  p = (D, (c - bx)·sx, -(r - by)·sy)
//!         ▼
//!   k_f = p/|p| · 1/λ          k_i = X · 1/λ
//!         │
//!         ▼
//!   Q = k_f - k_i  ──►  R_phi · R_kappa · R_omega · Q  ──►  (x, y, z)
//!         │
//!         ▼
//!   I_raw ∈ reduce gate? ──► I = I_raw · corrections ──► I ∈ project gate?
//! ```
//!
//! The frame is cut into square tiles dispatched on the compute context.
//! Tiles only read the frame; each returns its own sample list and the lists
//! are concatenated in tile order, so output is identical from run to run.

use std::sync::Arc;

use glam::{DMat3, DVec3};
use rayon::prelude::*;

use super::corrections::{CorrectionConfig, PixelGeometry, BEAM_DIRECTION};
use super::frame::CalibratedFrame;
use super::goniometer::Goniometer;
use crate::constants::DEFAULT_TILE_SIZE;
use crate::context::ComputeContext;
use crate::error::Result;
use crate::types::{RotationAxis, Sample};

/// Inclusive intensity window. NaN never passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gate {
  pub low: f64,
  pub high: f64,
}

impl Gate {
  pub fn new(low: f64, high: f64) -> Self {
    Self { low, high }
  }

  /// Gate accepting every finite value.
  pub fn open() -> Self {
    Self {
      low: f64::MIN,
      high: f64::MAX,
    }
  }

  #[inline]
  pub fn contains(&self, value: f64) -> bool {
    value >= self.low && value <= self.high
  }
}

/// Everything the projector needs besides the frame itself.
#[derive(Clone, Debug)]
pub struct ProjectionSettings {
  /// Window on raw pixel intensity.
  pub reduce_gate: Gate,
  /// Window on corrected intensity.
  pub project_gate: Gate,
  pub active_axis: RotationAxis,
  pub corrections: CorrectionConfig,
  pub goniometer: Goniometer,
  /// Tile side in pixels.
  pub tile_size: usize,
}

impl Default for ProjectionSettings {
  fn default() -> Self {
    Self {
      reduce_gate: Gate::open(),
      project_gate: Gate::open(),
      active_axis: RotationAxis::default(),
      corrections: CorrectionConfig::default(),
      goniometer: Goniometer::default(),
      tile_size: DEFAULT_TILE_SIZE,
    }
  }
}

/// Per-frame hints for sizing the octree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSuggestion {
  /// Smallest reciprocal-space footprint of one pixel.
  pub radius_low: f64,
  /// Largest reciprocal-space footprint of one pixel.
  pub radius_high: f64,
  /// Largest scattering vector magnitude worth covering (1/λ).
  pub q_max: f64,
}

/// Pixel accounting for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProjectionStats {
  pub pixels: usize,
  pub rejected_raw: usize,
  pub rejected_corrected: usize,
}

impl ProjectionStats {
  fn merge(&mut self, other: &Self) {
    self.pixels += other.pixels;
    self.rejected_raw += other.rejected_raw;
    self.rejected_corrected += other.rejected_corrected;
  }

  pub fn accepted(&self) -> usize {
    self.pixels - self.rejected_raw - self.rejected_corrected
  }
}

/// Output of projecting one frame.
#[derive(Clone, Debug)]
pub struct FrameProjection {
  pub samples: Vec<Sample>,
  pub suggestion: FrameSuggestion,
  pub stats: ProjectionStats,
}

/// Half-open pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Tile {
  x0: usize,
  x1: usize,
  y0: usize,
  y1: usize,
}

/// Cut a `width x height` detector into tiles, row-major.
fn tiles(width: usize, height: usize, size: usize) -> Vec<Tile> {
  let size = size.max(1);
  let mut out = Vec::with_capacity(width.div_ceil(size) * height.div_ceil(size));
  for y0 in (0..height).step_by(size) {
    for x0 in (0..width).step_by(size) {
      out.push(Tile {
        x0,
        x1: (x0 + size).min(width),
        y0,
        y1: (y0 + size).min(height),
      });
    }
  }
  out
}

/// Frame-constant quantities, computed once before dispatch.
struct FramePlan {
  rotation: DMat3,
  rotation_axis: DVec3,
  wavenumber: f64,
  distance: f64,
  beam: (f64, f64),
  pixel_size: (f64, f64),
  exposure_time: f64,
  flux: f64,
}

impl FramePlan {
  fn new(frame: &CalibratedFrame, settings: &ProjectionSettings) -> Self {
    let g = &frame.geometry;
    let angles = settings.goniometer.resolve(g, settings.active_axis);
    Self {
      rotation: settings.goniometer.sample_rotation(&angles),
      rotation_axis: settings.goniometer.axis_in_lab(&angles, settings.active_axis),
      wavenumber: 1.0 / g.wavelength,
      distance: g.detector_distance,
      beam: (g.beam_center_x, g.beam_center_y),
      pixel_size: (g.pixel_size_x, g.pixel_size_y),
      exposure_time: g.exposure_time,
      flux: g.flux,
    }
  }

  /// Unit scattered direction and cosine to the detector normal.
  #[inline]
  fn outgoing(&self, column: f64, row: f64) -> (DVec3, f64) {
    let p = DVec3::new(
      self.distance,
      (column - self.beam.0) * self.pixel_size.0,
      -(row - self.beam.1) * self.pixel_size.1,
    );
    let len = p.length();
    (p / len, self.distance / len)
  }

  /// Unrotated scattering vector `k_f - k_i`.
  #[inline]
  fn scattering_vector(&self, outgoing: DVec3) -> DVec3 {
    (outgoing - BEAM_DIRECTION) * self.wavenumber
  }

  fn project_tile(
    &self,
    frame: &CalibratedFrame,
    tile: Tile,
    settings: &ProjectionSettings,
  ) -> (Vec<Sample>, ProjectionStats) {
    let mut samples = Vec::new();
    let mut stats = ProjectionStats::default();

    for row in tile.y0..tile.y1 {
      for column in tile.x0..tile.x1 {
        stats.pixels += 1;
        let raw = frame.pixel(column, row) as f64;
        if !settings.reduce_gate.contains(raw) {
          stats.rejected_raw += 1;
          continue;
        }

        let (outgoing, cos_incidence) = self.outgoing(column as f64, row as f64);
        let pixel = PixelGeometry {
          outgoing,
          cos_incidence,
          rotation_axis: self.rotation_axis,
        };
        let intensity = raw * settings.corrections.factor(&pixel, self.exposure_time, self.flux);
        if !intensity.is_finite() || !settings.project_gate.contains(intensity) {
          stats.rejected_corrected += 1;
          continue;
        }

        let q = self.rotation * self.scattering_vector(outgoing);
        samples.push(Sample::new(q.x as f32, q.y as f32, q.z as f32, intensity as f32));
      }
    }

    (samples, stats)
  }

  /// Reciprocal-space size of the pixel at `(column, row)`.
  fn footprint(&self, column: f64, row: f64) -> f64 {
    let q = self.scattering_vector(self.outgoing(column, row).0);
    let qx = self.scattering_vector(self.outgoing(column + 1.0, row).0);
    let qy = self.scattering_vector(self.outgoing(column, row + 1.0).0);
    (qx - q).length().max((qy - q).length())
  }

  fn suggestion(&self, width: usize, height: usize) -> FrameSuggestion {
    let (w, h) = ((width - 1) as f64, (height - 1) as f64);
    let extrema = [
      (0.0, 0.0),
      (w, 0.0),
      (0.0, h),
      (w, h),
      (0.5 * w, 0.0),
      (0.5 * w, h),
      (0.0, 0.5 * h),
      (w, 0.5 * h),
      (self.beam.0.clamp(0.0, w), self.beam.1.clamp(0.0, h)),
    ];

    let mut radius_low = f64::INFINITY;
    let mut radius_high = 0.0_f64;
    for (column, row) in extrema {
      let r = self.footprint(column, row);
      radius_low = radius_low.min(r);
      radius_high = radius_high.max(r);
    }

    FrameSuggestion {
      radius_low,
      radius_high,
      q_max: self.wavenumber,
    }
  }
}

/// Projects calibrated frames into reciprocal-space samples.
pub struct FrameProjector {
  ctx: Arc<ComputeContext>,
  settings: ProjectionSettings,
}

impl FrameProjector {
  pub fn new(ctx: Arc<ComputeContext>, settings: ProjectionSettings) -> Self {
    Self { ctx, settings }
  }

  pub fn settings(&self) -> &ProjectionSettings {
    &self.settings
  }

  /// Project one frame.
  ///
  /// Fails with `InvalidFrame` when the geometry cannot be used; the caller
  /// decides whether that is fatal.
  #[cfg_attr(feature = "spans", tracing::instrument(skip_all, fields(frame = %frame.label)))]
  pub fn project(&self, frame: &CalibratedFrame) -> Result<FrameProjection> {
    frame.validate()?;

    let plan = FramePlan::new(frame, &self.settings);
    let tiles = tiles(frame.width, frame.height, self.settings.tile_size);
    let settings = &self.settings;

    let results: Vec<(Vec<Sample>, ProjectionStats)> = self.ctx.install(|| {
      tiles
        .par_iter()
        .map(|&tile| plan.project_tile(frame, tile, settings))
        .collect()
    });

    let total = results.iter().map(|(s, _)| s.len()).sum();
    let mut samples = Vec::with_capacity(total);
    let mut stats = ProjectionStats::default();
    for (tile_samples, tile_stats) in results {
      samples.extend_from_slice(&tile_samples);
      stats.merge(&tile_stats);
    }

    tracing::debug!(
      frame = %frame.label,
      accepted = stats.accepted(),
      rejected_raw = stats.rejected_raw,
      rejected_corrected = stats.rejected_corrected,
      "projected frame"
    );

    Ok(FrameProjection {
      samples,
      suggestion: plan.suggestion(frame.width, frame.height),
      stats,
    })
  }
}

#[cfg(test)]
#[path = "projector_test.rs"]
mod projector_test;

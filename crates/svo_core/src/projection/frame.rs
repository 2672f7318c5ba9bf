//! Calibrated detector frames as delivered by an external header parser.

use crate::error::{Result, SvoError};

/// Acquisition geometry of one frame.
///
/// Lengths in metres, wavelength in Ångström, angles in degrees.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameGeometry {
  pub wavelength: f64,
  pub detector_distance: f64,
  /// Beam centre in pixels (column).
  pub beam_center_x: f64,
  /// Beam centre in pixels (row).
  pub beam_center_y: f64,
  pub pixel_size_x: f64,
  pub pixel_size_y: f64,
  /// Oscillation start of the active axis.
  pub start_angle: f64,
  /// Oscillation width of the active axis.
  pub angle_increment: f64,
  pub kappa: f64,
  pub phi: f64,
  pub omega: f64,
  /// Seconds; 0 means unknown (no exposure normalization).
  pub exposure_time: f64,
  /// Incident flux; 0 means unknown (no flux normalization).
  pub flux: f64,
}

impl Default for FrameGeometry {
  fn default() -> Self {
    Self {
      wavelength: 1.0,
      detector_distance: 1.0,
      beam_center_x: 0.0,
      beam_center_y: 0.0,
      pixel_size_x: 172e-6,
      pixel_size_y: 172e-6,
      start_angle: 0.0,
      angle_increment: 0.0,
      kappa: 0.0,
      phi: 0.0,
      omega: 0.0,
      exposure_time: 0.0,
      flux: 0.0,
    }
  }
}

/// Pixel buffer plus geometry. Read-only to the pipeline.
///
/// Pixels are row-major: `pixels[row * width + column]`.
#[derive(Clone, Debug)]
pub struct CalibratedFrame {
  /// Human-readable identifier (usually the source path).
  pub label: String,
  pub width: usize,
  pub height: usize,
  pub pixels: Vec<f32>,
  pub geometry: FrameGeometry,
}

impl CalibratedFrame {
  pub fn new(
    label: impl Into<String>,
    width: usize,
    height: usize,
    pixels: Vec<f32>,
    geometry: FrameGeometry,
  ) -> Self {
    Self {
      label: label.into(),
      width,
      height,
      pixels,
      geometry,
    }
  }

  /// Raw intensity at `(column, row)`.
  #[inline]
  pub fn pixel(&self, column: usize, row: usize) -> f32 {
    self.pixels[row * self.width + column]
  }

  /// Reject frames whose geometry cannot be projected.
  pub fn validate(&self) -> Result<()> {
    let g = &self.geometry;
    let fail = |reason: String| Err(SvoError::invalid_frame(&self.label, reason));

    if self.width == 0 || self.height == 0 {
      return fail(format!("empty detector {}x{}", self.width, self.height));
    }
    let Some(count) = self.width.checked_mul(self.height) else {
      return fail(format!("detector {}x{} overflows", self.width, self.height));
    };
    if self.pixels.len() != count {
      return fail(format!(
        "pixel buffer holds {} values, expected {}x{}",
        self.pixels.len(),
        self.width,
        self.height
      ));
    }
    for (name, value) in [
      ("wavelength", g.wavelength),
      ("detector distance", g.detector_distance),
      ("pixel size x", g.pixel_size_x),
      ("pixel size y", g.pixel_size_y),
    ] {
      if !(value.is_finite() && value > 0.0) {
        return fail(format!("{name} must be positive, got {value}"));
      }
    }
    for (name, value) in [
      ("beam center x", g.beam_center_x),
      ("beam center y", g.beam_center_y),
      ("start angle", g.start_angle),
      ("angle increment", g.angle_increment),
      ("kappa", g.kappa),
      ("phi", g.phi),
      ("omega", g.omega),
    ] {
      if !value.is_finite() {
        return fail(format!("{name} is not finite"));
      }
    }
    for (name, value) in [("exposure time", g.exposure_time), ("flux", g.flux)] {
      if !(value.is_finite() && value >= 0.0) {
        return fail(format!("{name} must be non-negative, got {value}"));
      }
    }
    Ok(())
  }
}

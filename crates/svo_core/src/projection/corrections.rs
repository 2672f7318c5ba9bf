//! Multiplicative intensity corrections applied per pixel.
//!
//! Lab frame as in [`super::goniometer`]: beam along +X, polarization plane
//! horizontal (X-Y).

use glam::DVec3;
use serde::Deserialize;

/// Beam direction in the lab frame.
pub const BEAM_DIRECTION: DVec3 = DVec3::X;

/// Which corrections to apply.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
  /// Divide by incident flux (when the frame reports one).
  pub flux: bool,
  /// Divide by exposure time (when the frame reports one).
  pub exposure: bool,
  /// Divide by the polarization factor.
  pub polarization: bool,
  /// Multiply by the inverse rotation-method Lorentz factor.
  pub lorentz: bool,
  /// Normalize for the pixel's solid angle (flat detector, cos³ falloff).
  pub solid_angle: bool,
  /// Fraction of the beam polarized in the horizontal plane.
  pub polarization_fraction: f64,
}

impl CorrectionConfig {
  /// No correction: corrected intensity equals raw intensity.
  pub fn none() -> Self {
    Self {
      flux: false,
      exposure: false,
      polarization: false,
      lorentz: false,
      solid_angle: false,
      polarization_fraction: 0.99,
    }
  }

  /// Combined correction factor for one pixel.
  ///
  /// Returns a non-finite value when a correction is undefined for this
  /// geometry; callers reject such samples.
  #[inline]
  pub fn factor(&self, pixel: &PixelGeometry, exposure_time: f64, flux: f64) -> f64 {
    let mut factor = 1.0;

    if self.flux && flux > 0.0 {
      factor /= flux;
    }
    if self.exposure && exposure_time > 0.0 {
      factor /= exposure_time;
    }
    if self.polarization {
      let s = pixel.outgoing;
      let f = self.polarization_fraction;
      let p = f * (1.0 - s.y * s.y) + (1.0 - f) * (1.0 - s.z * s.z);
      factor = if p > 0.0 { factor / p } else { f64::NAN };
    }
    if self.lorentz {
      factor *= pixel.rotation_axis.dot(pixel.outgoing.cross(BEAM_DIRECTION)).abs();
    }
    if self.solid_angle {
      let c = pixel.cos_incidence;
      factor /= c * c * c;
    }

    factor
  }
}

impl Default for CorrectionConfig {
  fn default() -> Self {
    Self {
      flux: true,
      exposure: true,
      polarization: true,
      lorentz: true,
      solid_angle: true,
      polarization_fraction: 0.99,
    }
  }
}

/// Per-pixel geometry needed by the corrections.
#[derive(Clone, Copy, Debug)]
pub struct PixelGeometry {
  /// Unit direction of the scattered ray.
  pub outgoing: DVec3,
  /// Cosine between the scattered ray and the detector normal.
  pub cos_incidence: f64,
  /// Lab direction of the oscillated goniometer axis.
  pub rotation_axis: DVec3,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn straight_through() -> PixelGeometry {
    PixelGeometry {
      outgoing: DVec3::X,
      cos_incidence: 1.0,
      rotation_axis: DVec3::Z,
    }
  }

  fn off_axis() -> PixelGeometry {
    let outgoing = DVec3::new(1.0, 1.0, 0.0).normalize();
    PixelGeometry {
      outgoing,
      cos_incidence: outgoing.x,
      rotation_axis: DVec3::Z,
    }
  }

  #[test]
  fn test_none_is_identity() {
    let c = CorrectionConfig::none();
    assert_eq!(c.factor(&off_axis(), 2.0, 1000.0), 1.0);
  }

  #[test]
  fn test_flux_and_exposure_normalize() {
    let c = CorrectionConfig {
      flux: true,
      exposure: true,
      ..CorrectionConfig::none()
    };
    assert_eq!(c.factor(&straight_through(), 2.0, 100.0), 1.0 / 200.0);
    // Unknown values are skipped.
    assert_eq!(c.factor(&straight_through(), 0.0, 0.0), 1.0);
  }

  #[test]
  fn test_polarization_in_and_out_of_plane() {
    let c = CorrectionConfig {
      polarization: true,
      polarization_fraction: 1.0,
      ..CorrectionConfig::none()
    };
    // 45° in the horizontal plane: P = 1 - sin²45° = 0.5
    assert!((c.factor(&off_axis(), 0.0, 0.0) - 2.0).abs() < 1e-12);
    // Forward scattering is unaffected.
    assert!((c.factor(&straight_through(), 0.0, 0.0) - 1.0).abs() < 1e-12);
  }

  #[test]
  fn test_lorentz_vanishes_on_beam() {
    let c = CorrectionConfig {
      lorentz: true,
      ..CorrectionConfig::none()
    };
    assert_eq!(c.factor(&straight_through(), 0.0, 0.0), 0.0);
    // |Z · (s × X)| = sin 45°
    let expected = std::f64::consts::FRAC_1_SQRT_2;
    assert!((c.factor(&off_axis(), 0.0, 0.0) - expected).abs() < 1e-12);
  }

  #[test]
  fn test_solid_angle_boosts_oblique_pixels() {
    let c = CorrectionConfig {
      solid_angle: true,
      ..CorrectionConfig::none()
    };
    let cos = std::f64::consts::FRAC_1_SQRT_2;
    let expected = 1.0 / (cos * cos * cos);
    assert!((c.factor(&off_axis(), 0.0, 0.0) - expected).abs() < 1e-9);
  }
}

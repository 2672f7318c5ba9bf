//! Three-circle (kappa) goniometer: rotation composition from frame angles.
//!
//! Omega is the outermost circle, kappa is mounted on omega, phi on kappa.
//! Mapping a lab-frame scattering vector into the sample frame undoes the
//! rotations innermost first:
//!
//! ```text
//! q_sample = R_phi(-phi) · R_kappa(-kappa) · R_omega(-omega) · q_lab
//! ```
//!
//! The composition order is fixed: the physical direction of each inner
//! axis depends on the outer settings, so reordering changes the result.
//!
//! Lab frame: beam along +X, Y horizontal, Z vertical (omega axis).

use glam::{DMat3, DVec3};
use serde::Deserialize;

use super::frame::FrameGeometry;
use crate::types::RotationAxis;

/// Base direction of the omega (and, at kappa = 0, phi) axis.
pub const OMEGA_AXIS: DVec3 = DVec3::Z;

/// Default tilt of the kappa axis away from omega.
pub const DEFAULT_KAPPA_TILT_DEGREES: f64 = 50.0;

/// Additive angle corrections (degrees), applied to every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RotationOffsets {
  pub omega: f64,
  pub kappa: f64,
  pub phi: f64,
}

/// Resolved goniometer setting for one frame, in radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GoniometerAngles {
  pub omega: f64,
  pub kappa: f64,
  pub phi: f64,
}

/// Goniometer model: axis directions plus per-axis offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Goniometer {
  pub kappa_axis: DVec3,
  pub offsets: RotationOffsets,
}

impl Goniometer {
  /// Kappa axis tilted by `kappa_tilt_degrees` from Z toward +Y.
  pub fn new(kappa_tilt_degrees: f64, offsets: RotationOffsets) -> Self {
    let tilt = kappa_tilt_degrees.to_radians();
    Self {
      kappa_axis: DVec3::new(0.0, tilt.sin(), tilt.cos()),
      offsets,
    }
  }

  /// Angles for a frame, with the active axis at its oscillation midpoint.
  pub fn resolve(&self, geometry: &FrameGeometry, active: RotationAxis) -> GoniometerAngles {
    let midpoint = geometry.start_angle + 0.5 * geometry.angle_increment;
    let (mut omega, mut kappa, mut phi) = (geometry.omega, geometry.kappa, geometry.phi);
    match active {
      RotationAxis::Omega => omega = midpoint,
      RotationAxis::Kappa => kappa = midpoint,
      RotationAxis::Phi => phi = midpoint,
    }
    GoniometerAngles {
      omega: (omega + self.offsets.omega).to_radians(),
      kappa: (kappa + self.offsets.kappa).to_radians(),
      phi: (phi + self.offsets.phi).to_radians(),
    }
  }

  /// Lab-to-sample rotation `R = R_phi · R_kappa · R_omega` (inverse angles).
  pub fn sample_rotation(&self, angles: &GoniometerAngles) -> DMat3 {
    let r_phi = DMat3::from_axis_angle(OMEGA_AXIS, -angles.phi);
    let r_kappa = DMat3::from_axis_angle(self.kappa_axis, -angles.kappa);
    let r_omega = DMat3::from_axis_angle(OMEGA_AXIS, -angles.omega);
    r_phi * r_kappa * r_omega
  }

  /// Physical direction of `axis` in the lab frame at this setting.
  ///
  /// Outer circles carry the inner axes with them.
  pub fn axis_in_lab(&self, angles: &GoniometerAngles, axis: RotationAxis) -> DVec3 {
    let omega = DMat3::from_axis_angle(OMEGA_AXIS, angles.omega);
    match axis {
      RotationAxis::Omega => OMEGA_AXIS,
      RotationAxis::Kappa => omega * self.kappa_axis,
      RotationAxis::Phi => {
        let kappa = DMat3::from_axis_angle(self.kappa_axis, angles.kappa);
        omega * kappa * OMEGA_AXIS
      }
    }
  }
}

impl Default for Goniometer {
  fn default() -> Self {
    Self::new(DEFAULT_KAPPA_TILT_DEGREES, RotationOffsets::default())
  }
}

#[cfg(test)]
#[path = "goniometer_test.rs"]
mod goniometer_test;

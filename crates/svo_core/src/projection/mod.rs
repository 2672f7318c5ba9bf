//! Frame projection: detector pixels to corrected reciprocal-space samples.
//!
//! - [`frame`]: `CalibratedFrame` input contract and validation
//! - [`goniometer`]: rotation composition from kappa-goniometer angles
//! - [`corrections`]: polarization, Lorentz, flux, exposure, solid angle
//! - [`projector`]: tiled, data-parallel Ewald-sphere projection

pub mod corrections;
pub mod frame;
pub mod goniometer;
pub mod projector;

pub use corrections::{CorrectionConfig, PixelGeometry};
pub use frame::{CalibratedFrame, FrameGeometry};
pub use goniometer::{Goniometer, GoniometerAngles, RotationOffsets};
pub use projector::{
  FrameProjection, FrameProjector, FrameSuggestion, Gate, ProjectionSettings, ProjectionStats,
};

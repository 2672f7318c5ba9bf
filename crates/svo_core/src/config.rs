//! Reduction configuration.
//!
//! Every field has a default, so a partial TOML table (or none at all) is a
//! valid configuration.

use serde::Deserialize;

use crate::constants::{
  DEFAULT_BRICK_INNER_DIMENSION, DEFAULT_BRICK_OUTER_DIMENSION, DEFAULT_BRICK_POOL_POWER,
  DEFAULT_DENSITY_THRESHOLD, DEFAULT_POINT_BUDGET_BYTES, DEFAULT_POOL_BUDGET_BYTES,
  DEFAULT_TILE_SIZE, MAX_BRICK_POOL_POWER, MAX_CLOUD_POINTS, MAX_LEVELS,
};
use crate::error::{Result, SvoError};
use crate::projection::goniometer::DEFAULT_KAPPA_TILT_DEGREES;
use crate::projection::{CorrectionConfig, Gate, Goniometer, ProjectionSettings, RotationOffsets};
use crate::types::{BrickLayout, RotationAxis, SAMPLE_BYTES};

/// Settings for one reduction run.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
  /// Raw-intensity gate.
  pub threshold_reduce_low: f64,
  pub threshold_reduce_high: f64,
  /// Corrected-intensity gate.
  pub threshold_project_low: f64,
  pub threshold_project_high: f64,

  /// Octree depth; `None` uses the depth recommended by the point cloud.
  pub levels: Option<usize>,
  pub brick_inner_dimension: usize,
  pub brick_outer_dimension: usize,
  /// Pool holds `2^power` bricks per axis.
  pub brick_pool_power: u32,

  pub active_axis: RotationAxis,
  /// Ceiling on the accumulated samples (16 bytes each). The partitioner
  /// indexes the same buffer in place and adds about 4 bytes per sample.
  pub point_budget_bytes: usize,
  pub pool_budget_bytes: usize,

  pub corrections: CorrectionConfig,
  /// Goniometer angle corrections in degrees.
  pub offsets: RotationOffsets,
  pub kappa_tilt_degrees: f64,

  /// Projection tile side in pixels.
  pub tile_size: usize,
  /// Candidate count above which occupancy is evaluated batched.
  pub density_threshold: usize,
  /// Compute threads (0 = one per CPU).
  pub threads: usize,
  /// Free-form text stored in the output file.
  pub metadata: String,
}

impl Default for ReductionConfig {
  fn default() -> Self {
    Self {
      threshold_reduce_low: 0.0,
      threshold_reduce_high: f64::MAX,
      threshold_project_low: 0.0,
      threshold_project_high: f64::MAX,
      levels: None,
      brick_inner_dimension: DEFAULT_BRICK_INNER_DIMENSION,
      brick_outer_dimension: DEFAULT_BRICK_OUTER_DIMENSION,
      brick_pool_power: DEFAULT_BRICK_POOL_POWER,
      active_axis: RotationAxis::default(),
      point_budget_bytes: DEFAULT_POINT_BUDGET_BYTES,
      pool_budget_bytes: DEFAULT_POOL_BUDGET_BYTES,
      corrections: CorrectionConfig::default(),
      offsets: RotationOffsets::default(),
      kappa_tilt_degrees: DEFAULT_KAPPA_TILT_DEGREES,
      tile_size: DEFAULT_TILE_SIZE,
      density_threshold: DEFAULT_DENSITY_THRESHOLD,
      threads: 0,
      metadata: String::new(),
    }
  }
}

impl ReductionConfig {
  /// Reject values the pipeline cannot honour.
  pub fn validate(&self) -> Result<()> {
    let invalid = |msg: String| Err(SvoError::InvalidConfig(msg));

    for (name, low, high) in [
      ("reduce", self.threshold_reduce_low, self.threshold_reduce_high),
      ("project", self.threshold_project_low, self.threshold_project_high),
    ] {
      if low.is_nan() || high.is_nan() || low > high {
        return invalid(format!("{name} thresholds [{low}, {high}] are not a range"));
      }
    }
    if let Some(levels) = self.levels {
      if !(1..=MAX_LEVELS).contains(&levels) {
        return invalid(format!("levels must be in 1..={MAX_LEVELS}, got {levels}"));
      }
    }
    if self.brick_inner_dimension == 0 {
      return invalid("brick_inner_dimension must be positive".into());
    }
    if self.brick_outer_dimension < self.brick_inner_dimension {
      return invalid(format!(
        "brick_outer_dimension {} is smaller than brick_inner_dimension {}",
        self.brick_outer_dimension, self.brick_inner_dimension
      ));
    }
    if !(1..=MAX_BRICK_POOL_POWER).contains(&self.brick_pool_power) {
      return invalid(format!(
        "brick_pool_power must be in 1..={MAX_BRICK_POOL_POWER}, got {}",
        self.brick_pool_power
      ));
    }
    if self.point_budget_bytes == 0 || self.pool_budget_bytes == 0 {
      return invalid("byte budgets must be positive".into());
    }
    if self.point_budget_bytes / SAMPLE_BYTES > MAX_CLOUD_POINTS {
      return invalid(format!(
        "point_budget_bytes {} holds more than {MAX_CLOUD_POINTS} samples",
        self.point_budget_bytes
      ));
    }
    let fraction = self.corrections.polarization_fraction;
    if !(0.0..=1.0).contains(&fraction) {
      return invalid(format!("polarization_fraction must be in [0, 1], got {fraction}"));
    }
    if !self.kappa_tilt_degrees.is_finite() {
      return invalid("kappa_tilt_degrees must be finite".into());
    }
    if self.tile_size == 0 {
      return invalid("tile_size must be positive".into());
    }
    Ok(())
  }

  pub fn layout(&self) -> BrickLayout {
    BrickLayout::new(self.brick_inner_dimension, self.brick_outer_dimension)
  }

  pub fn reduce_gate(&self) -> Gate {
    Gate::new(self.threshold_reduce_low, self.threshold_reduce_high)
  }

  pub fn project_gate(&self) -> Gate {
    Gate::new(self.threshold_project_low, self.threshold_project_high)
  }

  pub fn projection_settings(&self) -> ProjectionSettings {
    ProjectionSettings {
      reduce_gate: self.reduce_gate(),
      project_gate: self.project_gate(),
      active_axis: self.active_axis,
      corrections: self.corrections,
      goniometer: Goniometer::new(self.kappa_tilt_degrees, self.offsets),
      tile_size: self.tile_size,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_is_valid() {
    let config = ReductionConfig::default();
    config.validate().unwrap();
    assert_eq!(config.layout(), BrickLayout::new(7, 8));
    assert_eq!(config.levels, None);
  }

  #[test]
  fn test_rejects_out_of_range() {
    let cases = [
      ReductionConfig {
        levels: Some(0),
        ..Default::default()
      },
      ReductionConfig {
        levels: Some(16),
        ..Default::default()
      },
      ReductionConfig {
        brick_outer_dimension: 6,
        ..Default::default()
      },
      ReductionConfig {
        brick_pool_power: 11,
        ..Default::default()
      },
      ReductionConfig {
        threshold_reduce_low: 10.0,
        threshold_reduce_high: 1.0,
        ..Default::default()
      },
      ReductionConfig {
        point_budget_bytes: 0,
        ..Default::default()
      },
      ReductionConfig {
        tile_size: 0,
        ..Default::default()
      },
    ];
    for config in cases {
      assert!(matches!(config.validate(), Err(SvoError::InvalidConfig(_))), "{config:?}");
    }
  }

  #[cfg(target_pointer_width = "64")]
  #[test]
  fn test_rejects_point_budget_beyond_index_range() {
    let config = ReductionConfig {
      point_budget_bytes: (MAX_CLOUD_POINTS + 1) * SAMPLE_BYTES,
      ..Default::default()
    };
    assert!(matches!(config.validate(), Err(SvoError::InvalidConfig(_))));
  }

  #[test]
  fn test_projection_settings_follow_config() {
    let config = ReductionConfig {
      threshold_reduce_low: 5.0,
      threshold_project_high: 100.0,
      active_axis: RotationAxis::Omega,
      tile_size: 32,
      ..Default::default()
    };
    let settings = config.projection_settings();
    assert_eq!(settings.reduce_gate, Gate::new(5.0, f64::MAX));
    assert_eq!(settings.project_gate, Gate::new(0.0, 100.0));
    assert_eq!(settings.active_axis, RotationAxis::Omega);
    assert_eq!(settings.tile_size, 32);
  }
}

//! Creation and view settings carried by format 1.4 and later.

use crate::types::MinMax;

/// Marks a setting that an older file did not record.
pub const UNSET: f64 = -1.0;

/// How the file was produced.
#[derive(Clone, Debug, PartialEq)]
pub struct CreationSettings {
  /// Seconds since the Unix epoch, as a decimal string.
  pub date: String,
  /// Raw-intensity gate `[low, high]`.
  pub reduce_cutoff: [f64; 2],
  /// Corrected-intensity gate `[low, high]`.
  pub project_cutoff: [f64; 2],
  /// Omega, kappa and phi corrections in degrees.
  pub correction_angles: [f64; 3],
  /// Labels of the frames that went into the cloud.
  pub files: Vec<String>,
}

impl CreationSettings {
  /// Defaults for files written before the settings block existed.
  pub fn legacy(date: impl Into<String>) -> Self {
    Self {
      date: date.into(),
      reduce_cutoff: [UNSET; 2],
      project_cutoff: [UNSET; 2],
      correction_angles: [UNSET; 3],
      files: Vec::new(),
    }
  }
}

/// Suggested initial view for a renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewSettings {
  /// 0 = volume.
  pub mode: i64,
  pub tf_style: i64,
  pub tf_texture: i64,
  pub data_min: f64,
  pub data_max: f64,
  pub alpha: f64,
  pub brightness: f64,
}

impl ViewSettings {
  /// Volume mode over `data`, neutral alpha and brightness.
  pub fn for_range(data: [f64; 2]) -> Self {
    Self {
      mode: 0,
      tf_style: 0,
      tf_texture: 0,
      data_min: data[0],
      data_max: data[1],
      alpha: 1.0,
      brightness: 1.0,
    }
  }
}

impl Default for ViewSettings {
  fn default() -> Self {
    Self::for_range(MinMax::empty().to_array())
  }
}

//! Byte-budgeted accumulation of projected samples across frames.
//!
//! The accumulator owns one growing sample buffer that may never exceed its
//! byte ceiling. Once a push would cross the ceiling, the samples that still
//! fit are kept, the run is marked failed and every further push is refused.
//! The caller can retry the whole reduction with stricter gates.

use crate::constants::MAX_LEVELS;
use crate::error::{Result, SvoError};
use crate::octree::Extent;
use crate::projection::{FrameProjection, FrameSuggestion};
use crate::types::{MinMax, Sample, SAMPLE_BYTES};

/// Frozen point cloud, produced by [`PointAccumulator::finalize`].
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
  samples: Vec<Sample>,
  intensity: MinMax,
}

impl PointCloud {
  /// Freeze an existing sample list.
  pub fn from_samples(samples: Vec<Sample>) -> Self {
    let mut intensity = MinMax::empty();
    for s in &samples {
      intensity.encapsulate(s.intensity as f64);
    }
    Self { samples, intensity }
  }

  pub fn samples(&self) -> &[Sample] {
    &self.samples
  }

  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  /// Bytes held by the samples.
  pub fn byte_len(&self) -> usize {
    self.samples.len() * SAMPLE_BYTES
  }

  /// Intensity range over all samples.
  pub fn intensity_range(&self) -> MinMax {
    self.intensity
  }

  /// Samples lying outside `extent`. The octree never reaches them.
  pub fn count_outside(&self, extent: &Extent) -> usize {
    self.samples.iter().filter(|s| !extent.contains_point(s.position())).count()
  }
}

/// Octree sizing hints derived from every frame's suggestion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolutionSuggestion {
  /// Largest scattering vector seen (half side of the extent).
  pub q_max: f64,
  /// Smallest pixel footprint over all frames.
  pub radius_low: f64,
  /// Largest pixel footprint over all frames.
  pub radius_high: f64,
  /// `2·Q / radius_high`: voxels per axis the coarsest pixel supports.
  pub resolution_min: f64,
  /// `2·Q / radius_low`: voxels per axis the finest pixel supports.
  pub resolution_max: f64,
  /// `log2(resolution_min / brick_inner)`.
  pub level_min: f64,
  /// `log2(resolution_max / brick_inner)`.
  pub level_max: f64,
}

impl ResolutionSuggestion {
  /// Extent cube `[-Q, Q]^3`.
  pub fn extent(&self) -> Extent {
    Extent::cube(self.q_max)
  }

  /// Level count that resolves the finest pixel footprint, clamped to the
  /// supported range.
  pub fn recommended_levels(&self) -> usize {
    if !self.level_max.is_finite() || self.level_max <= 0.0 {
      return 1;
    }
    (self.level_max.ceil() as usize + 1).clamp(1, MAX_LEVELS)
  }
}

/// Streaming, byte-bounded sample buffer.
#[derive(Debug)]
pub struct PointAccumulator {
  samples: Vec<Sample>,
  ceiling_bytes: usize,
  capacity: usize,
  failed: bool,
  frames: usize,
  radius_low: f64,
  radius_high: f64,
  q_max: f64,
  intensity: MinMax,
}

impl PointAccumulator {
  /// Create an empty accumulator bounded by `ceiling_bytes`.
  pub fn new(ceiling_bytes: usize) -> Self {
    Self {
      samples: Vec::new(),
      ceiling_bytes,
      capacity: ceiling_bytes / SAMPLE_BYTES,
      failed: false,
      frames: 0,
      radius_low: f64::INFINITY,
      radius_high: 0.0,
      q_max: 0.0,
      intensity: MinMax::empty(),
    }
  }

  /// Append samples, keeping whatever fits under the ceiling.
  ///
  /// Fails with `PointBudgetExceeded` when the ceiling is reached; the
  /// accumulator then stays failed.
  pub fn push(&mut self, samples: &[Sample]) -> Result<()> {
    let exceeded = SvoError::PointBudgetExceeded {
      ceiling_bytes: self.ceiling_bytes,
    };
    if self.failed {
      return Err(exceeded);
    }

    let room = self.capacity - self.samples.len();
    let take = samples.len().min(room);
    if self.samples.try_reserve(take).is_err() {
      self.failed = true;
      tracing::warn!(len = self.samples.len(), "point buffer allocation failed");
      return Err(exceeded);
    }
    for s in &samples[..take] {
      self.intensity.encapsulate(s.intensity as f64);
    }
    self.samples.extend_from_slice(&samples[..take]);

    if take < samples.len() {
      self.failed = true;
      tracing::warn!(
        ceiling_bytes = self.ceiling_bytes,
        dropped = samples.len() - take,
        "point budget exceeded, accumulation halted"
      );
      return Err(exceeded);
    }
    Ok(())
  }

  /// Fold one frame's sizing hints into the running extrema.
  pub fn record_suggestion(&mut self, suggestion: &FrameSuggestion) {
    self.radius_low = self.radius_low.min(suggestion.radius_low);
    self.radius_high = self.radius_high.max(suggestion.radius_high);
    self.q_max = self.q_max.max(suggestion.q_max);
  }

  /// Append a projected frame: its samples and its suggestion.
  pub fn push_projection(&mut self, projection: &FrameProjection) -> Result<()> {
    self.push(&projection.samples)?;
    self.record_suggestion(&projection.suggestion);
    self.frames += 1;
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  pub fn byte_len(&self) -> usize {
    self.samples.len() * SAMPLE_BYTES
  }

  pub fn ceiling_bytes(&self) -> usize {
    self.ceiling_bytes
  }

  /// Frames accepted through [`Self::push_projection`].
  pub fn frames(&self) -> usize {
    self.frames
  }

  pub fn is_failed(&self) -> bool {
    self.failed
  }

  /// Sizing hints for the current state.
  pub fn suggestion(&self, brick_inner: usize) -> ResolutionSuggestion {
    let two_q = 2.0 * self.q_max;
    let resolution = |radius: f64| {
      if radius > 0.0 && radius.is_finite() {
        two_q / radius
      } else {
        0.0
      }
    };
    let level = |resolution: f64| (resolution / brick_inner as f64).log2();

    let resolution_min = resolution(self.radius_high);
    let resolution_max = resolution(self.radius_low);
    ResolutionSuggestion {
      q_max: self.q_max,
      radius_low: self.radius_low,
      radius_high: self.radius_high,
      resolution_min,
      resolution_max,
      level_min: level(resolution_min),
      level_max: level(resolution_max),
    }
  }

  /// Freeze the buffer, shrinking it to its length.
  ///
  /// A failed accumulator cannot be finalized.
  pub fn finalize(mut self, brick_inner: usize) -> Result<(PointCloud, ResolutionSuggestion)> {
    if self.failed {
      return Err(SvoError::PointBudgetExceeded {
        ceiling_bytes: self.ceiling_bytes,
      });
    }
    let suggestion = self.suggestion(brick_inner);
    self.samples.shrink_to_fit();
    let cloud = PointCloud {
      samples: self.samples,
      intensity: self.intensity,
    };

    let outside = cloud.count_outside(&suggestion.extent());
    if outside > 0 {
      tracing::warn!(outside, q_max = suggestion.q_max, "samples fall outside the octree extent");
    }
    tracing::info!(
      samples = cloud.len(),
      outside,
      bytes = cloud.byte_len(),
      q_max = suggestion.q_max,
      level_min = suggestion.level_min,
      level_max = suggestion.level_max,
      "point cloud finalized"
    );

    Ok((cloud, suggestion))
  }
}

#[cfg(test)]
#[path = "accumulator_test.rs"]
mod accumulator_test;

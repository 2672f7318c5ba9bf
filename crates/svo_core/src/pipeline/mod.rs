//! Reduction pipeline: frames → projection → accumulation → partition →
//! octree → store.
//!
//! # Flow
//!
//! ```text
//! FrameSource ──load──► FrameProjector ──samples──► PointAccumulator
//!                                                        │ finalize
//!                                                        ▼
//! SvoStore ◄──arrays── OctreeBuilder ◄──occupancy── SpatialPartitioner
//! ```
//!
//! [`reduce`] runs everything on the calling thread; [`ReductionWorker`]
//! runs it on one dedicated thread and streams events back.

mod worker;

use std::sync::Arc;

use web_time::{Instant, SystemTime, UNIX_EPOCH};

pub use worker::ReductionWorker;

use crate::accumulator::{PointAccumulator, ResolutionSuggestion};
use crate::cancel::CancellationToken;
use crate::config::ReductionConfig;
use crate::context::ComputeContext;
use crate::error::{Result, SvoError};
use crate::octree::{LevelStats, OctreeBuilder, OctreeConfig};
use crate::partition::{CandidateThreshold, SpatialPartitioner};
use crate::progress::{EventSink, ReductionSummary, Stage};
use crate::projection::{CalibratedFrame, FrameProjector};
use crate::store::{CreationSettings, SvoStore};

/// Indexed access to input frames.
pub trait FrameSource {
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Load and parse frame `index`. Errors skip the frame.
  fn load(&self, index: usize) -> Result<CalibratedFrame>;
}

/// Frames already in memory.
#[derive(Clone, Debug, Default)]
pub struct VecFrameSource {
  frames: Vec<CalibratedFrame>,
}

impl VecFrameSource {
  pub fn new(frames: Vec<CalibratedFrame>) -> Self {
    Self { frames }
  }
}

impl FrameSource for VecFrameSource {
  fn len(&self) -> usize {
    self.frames.len()
  }

  fn load(&self, index: usize) -> Result<CalibratedFrame> {
    self
      .frames
      .get(index)
      .cloned()
      .ok_or_else(|| SvoError::invalid_frame(format!("#{index}"), "no such frame"))
  }
}

/// Everything a successful reduction produces.
#[derive(Clone, Debug)]
pub struct ReductionOutput {
  pub store: SvoStore,
  pub summary: ReductionSummary,
  pub suggestion: ResolutionSuggestion,
  pub level_stats: Vec<LevelStats>,
}

/// Seconds since the Unix epoch, as stored in creation settings.
fn creation_date() -> String {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs().to_string())
    .unwrap_or_default()
}

/// Run the full reduction on the calling thread.
///
/// `cancel` is checked once per frame and once per octree node; a cancelled
/// or failed run returns an error and keeps nothing.
#[cfg_attr(feature = "spans", tracing::instrument(skip_all, name = "pipeline::reduce"))]
pub fn reduce<S: FrameSource + ?Sized>(
  frames: &S,
  config: &ReductionConfig,
  ctx: Arc<ComputeContext>,
  cancel: &CancellationToken,
  events: &EventSink,
) -> Result<ReductionOutput> {
  config.validate()?;
  let start = Instant::now();
  let layout = config.layout();
  let total = frames.len();

  // Stage 1: projection and accumulation
  let projector = FrameProjector::new(Arc::clone(&ctx), config.projection_settings());
  let mut accumulator = PointAccumulator::new(config.point_budget_bytes);
  let mut labels = Vec::new();
  let mut skipped = 0usize;

  events.info(format!("projecting {total} frames"));
  for i in 0..total {
    cancel.check()?;

    let projection = frames.load(i).and_then(|frame| {
      let projection = projector.project(&frame)?;
      Ok((frame.label, projection))
    });
    match projection {
      Ok((label, projection)) => {
        if let Err(e) = accumulator.push_projection(&projection) {
          events.warn(format!("{e}; retry with stricter thresholds"));
          return Err(e);
        }
        labels.push(label);
      }
      Err(e) if e.is_frame_local() => {
        tracing::warn!(frame = i, error = %e, "skipping frame");
        events.warn(format!("skipping frame {i}: {e}"));
        skipped += 1;
      }
      Err(e) => return Err(e),
    }
    events.progress(Stage::Projecting, (i + 1) as f32 / total as f32);
  }

  if accumulator.is_empty() {
    return Err(SvoError::EmptyInput);
  }
  let projected = accumulator.frames();
  let (cloud, suggestion) = accumulator.finalize(layout.inner)?;
  let levels = config.levels.unwrap_or_else(|| suggestion.recommended_levels());
  events.info(format!(
    "{} samples from {projected} frames, building {levels} levels",
    cloud.len()
  ));

  // Stage 2: partition
  cancel.check()?;
  events.progress(Stage::Partitioning, 0.0);
  let partitioner = SpatialPartitioner::build(cloud, ctx)
    .with_policy(CandidateThreshold::new(config.density_threshold));
  events.progress(Stage::Partitioning, 1.0);

  // Stage 3: octree
  let extent = suggestion.extent();
  let octree_config = OctreeConfig::new(extent, levels, layout, config.brick_pool_power);
  let mut last_percent = -1i32;
  let tree = OctreeBuilder::new(octree_config, &partitioner)
    .with_high_radius(suggestion.radius_high)
    .with_pool_budget(config.pool_budget_bytes)
    .build(cancel, |progress| {
      let fraction = progress.fraction();
      let percent = (fraction * 100.0) as i32;
      if percent != last_percent {
        last_percent = percent;
        events.progress(Stage::Building, fraction);
      }
    })
    .inspect_err(|e| {
      if e.is_resource_exceeded() {
        events.warn(format!("{e}; retry with fewer levels or a larger pool"));
      }
    })?;
  let level_stats = tree.level_stats.clone();

  // Stage 4: store
  let offsets = config.offsets;
  let store = SvoStore::from_octree(tree, extent, partitioner.cloud().intensity_range())
    .with_metadata(config.metadata.clone())
    .with_creation(CreationSettings {
      date: creation_date(),
      reduce_cutoff: [config.threshold_reduce_low, config.threshold_reduce_high],
      project_cutoff: [config.threshold_project_low, config.threshold_project_high],
      correction_angles: [offsets.omega, offsets.kappa, offsets.phi],
      files: labels,
    });

  let summary = ReductionSummary {
    frames_total: total,
    frames_projected: projected,
    frames_skipped: skipped,
    samples: partitioner.len(),
    elapsed: start.elapsed(),
    levels,
    nodes: store.node_count(),
    bricks: store.brick_count(),
    output_bytes: store.byte_size(),
  };
  tracing::info!(
    frames = projected,
    skipped,
    samples = summary.samples,
    bricks = summary.bricks,
    bytes = summary.output_bytes,
    "reduction finished"
  );
  events.info("reduction finished");

  Ok(ReductionOutput {
    store,
    summary,
    suggestion,
    level_stats,
  })
}

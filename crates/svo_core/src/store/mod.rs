//! In-memory sparse voxel octree and its versioned file format.

mod format;
pub mod settings;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;

pub use settings::{CreationSettings, ViewSettings, UNSET};

use crate::constants::{FORMAT_MAJOR, FORMAT_MINOR};
use crate::error::Result;
use crate::octree::{BuiltOctree, Extent, IndexWord, PoolCoord};
use crate::types::{BrickLayout, MinMax};

/// Row-major 3x3 identity.
pub const IDENTITY_ORIENTATION: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Octree arrays plus everything persisted alongside them.
///
/// Arrays are write-once: a store is built from a finished octree (or read
/// from a file) and then only read or serialized.
#[derive(Clone, Debug, PartialEq)]
pub struct SvoStore {
  version: (i64, i64),
  levels: usize,
  layout: BrickLayout,
  pool_power: u32,
  minmax: [f64; 2],
  extent: Extent,
  pool: Vec<f32>,
  index: Vec<u32>,
  brick: Vec<u32>,
  orientation: [f64; 9],
  metadata: String,
  creation: CreationSettings,
  view: ViewSettings,
}

impl SvoStore {
  /// Wrap a finished octree. `data` is the intensity range of the cloud.
  pub fn from_octree(tree: BuiltOctree, extent: Extent, data: MinMax) -> Self {
    let minmax = data.to_array();
    Self {
      version: (FORMAT_MAJOR, FORMAT_MINOR),
      levels: tree.levels,
      layout: tree.layout,
      pool_power: tree.pool_power,
      minmax,
      extent,
      pool: tree.pool,
      index: tree.index,
      brick: tree.brick,
      orientation: IDENTITY_ORIENTATION,
      metadata: String::new(),
      creation: CreationSettings::legacy(String::new()),
      view: ViewSettings::for_range(minmax),
    }
  }

  pub fn with_orientation(mut self, orientation: [f64; 9]) -> Self {
    self.orientation = orientation;
    self
  }

  pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
    self.metadata = metadata.into();
    self
  }

  pub fn with_creation(mut self, creation: CreationSettings) -> Self {
    self.creation = creation;
    self
  }

  pub fn with_view(mut self, view: ViewSettings) -> Self {
    self.view = view;
    self
  }

  // ===========================================================================
  // Persistence
  // ===========================================================================

  /// Write the current format version to `path`.
  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let mut w = BufWriter::new(File::create(path.as_ref())?);
    self.write_to(&mut w)?;
    w.flush()?;
    Ok(())
  }

  /// Read a file; pre-1.4 files take their creation date from the file's
  /// modification time.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let file = File::open(path.as_ref())?;
    let modified = file
      .metadata()
      .and_then(|m| m.modified())
      .ok()
      .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
      .map(|d| d.as_secs().to_string())
      .unwrap_or_default();
    let store = Self::read_from(BufReader::new(file), &modified)?;
    tracing::debug!(
      path = %path.as_ref().display(),
      nodes = store.node_count(),
      bricks = store.brick_count(),
      "svo opened"
    );
    Ok(store)
  }

  pub fn write_to(&self, mut writer: impl Write) -> Result<()> {
    format::write_store(&mut writer, self, FORMAT_MINOR)
  }

  pub fn read_from(mut reader: impl Read, fallback_date: &str) -> Result<Self> {
    format::read_store(&mut reader, fallback_date)
  }

  // ===========================================================================
  // Accessors
  // ===========================================================================

  /// `(major, minor)` this store was read as, or the version it will be
  /// written as.
  pub fn version(&self) -> (i64, i64) {
    self.version
  }

  pub fn levels(&self) -> usize {
    self.levels
  }

  pub fn brick_pool_power(&self) -> u32 {
    self.pool_power
  }

  pub fn brick_inner_dimension(&self) -> usize {
    self.layout.inner
  }

  pub fn brick_outer_dimension(&self) -> usize {
    self.layout.outer
  }

  pub fn layout(&self) -> BrickLayout {
    self.layout
  }

  /// Non-empty bricks held by the pool.
  pub fn brick_count(&self) -> usize {
    self.pool.len() / self.layout.voxels()
  }

  pub fn node_count(&self) -> usize {
    self.index.len()
  }

  /// Bytes held by the index, brick and pool arrays.
  pub fn byte_size(&self) -> usize {
    (self.index.len() + self.brick.len() + self.pool.len()) * 4
  }

  pub fn minmax(&self) -> [f64; 2] {
    self.minmax
  }

  pub fn extent(&self) -> &Extent {
    &self.extent
  }

  pub fn index(&self) -> &[u32] {
    &self.index
  }

  pub fn brick(&self) -> &[u32] {
    &self.brick
  }

  pub fn pool(&self) -> &[f32] {
    &self.pool
  }

  pub fn orientation(&self) -> &[f64; 9] {
    &self.orientation
  }

  pub fn metadata(&self) -> &str {
    &self.metadata
  }

  pub fn creation(&self) -> &CreationSettings {
    &self.creation
  }

  pub fn view(&self) -> &ViewSettings {
    &self.view
  }

  /// Unpacked index word of node `i`.
  pub fn node(&self, i: usize) -> Option<IndexWord> {
    self.index.get(i).map(|&w| IndexWord::unpack(w))
  }

  /// Pool coordinate of node `i`, for nodes carrying data.
  pub fn pool_coord(&self, i: usize) -> Option<PoolCoord> {
    let word = self.node(i)?;
    if !word.data {
      return None;
    }
    self.brick.get(i).map(|&b| PoolCoord::unpack(b))
  }

  /// Voxels of node `i`'s brick, `outer^3` values, X fastest.
  pub fn brick_voxels(&self, i: usize) -> Option<&[f32]> {
    let coord = self.pool_coord(i)?;
    let voxels = self.layout.voxels();
    let start = coord.slot(1usize << self.pool_power) * voxels;
    self.pool.get(start..start + voxels)
  }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

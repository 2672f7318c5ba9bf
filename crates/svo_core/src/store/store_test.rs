use std::io::Cursor;

use super::format::write_store;
use super::*;
use crate::accumulator::PointCloud;
use crate::cancel::CancellationToken;
use crate::error::SvoError;
use crate::octree::{OctreeBuilder, OctreeConfig};
use crate::partition::SpatialPartitioner;
use crate::test_utils::{clump, test_context};

fn sample_store() -> SvoStore {
  let mut samples = clump([0.3, 0.3, 0.3], 0.05, 100, 4.0);
  samples.extend(clump([-0.5, 0.2, -0.4], 0.05, 100, 8.0));
  let cloud = PointCloud::from_samples(samples);
  let partitioner = SpatialPartitioner::build(cloud, test_context());
  let extent = Extent::cube(1.0);
  let config = OctreeConfig::new(extent, 3, BrickLayout::default(), 7);
  let tree = OctreeBuilder::new(config, &partitioner)
    .build(&CancellationToken::new(), |_| {})
    .unwrap();

  SvoStore::from_octree(tree, extent, partitioner.cloud().intensity_range())
    .with_orientation([0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0])
    .with_metadata("sample: test crystal")
    .with_creation(CreationSettings {
      date: "1700000000".into(),
      reduce_cutoff: [0.0, 1e6],
      project_cutoff: [0.5, 1e7],
      correction_angles: [0.1, -0.2, 0.3],
      files: vec!["frame_0001".into(), "frame_0002".into()],
    })
    .with_view(ViewSettings {
      tf_style: 2,
      alpha: 0.5,
      ..ViewSettings::for_range(partitioner.cloud().intensity_range().to_array())
    })
}

fn to_bytes(store: &SvoStore, minor: i64) -> Vec<u8> {
  let mut bytes = Vec::new();
  write_store(&mut bytes, store, minor).unwrap();
  bytes
}

#[test]
fn test_file_round_trip() {
  let store = sample_store();
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("volume.svo");
  store.save(&path).unwrap();

  let opened = SvoStore::open(&path).unwrap();
  assert_eq!(opened.index(), store.index());
  assert_eq!(opened.brick(), store.brick());
  assert_eq!(opened.pool(), store.pool());
  assert_eq!(opened.levels(), 3);
  assert_eq!(opened.brick_inner_dimension(), 7);
  assert_eq!(opened.brick_outer_dimension(), 8);
  assert_eq!(opened.version(), (1, 4));
  assert_eq!(opened, store);
}

#[test]
fn test_stream_round_trip() {
  let store = sample_store();
  let mut bytes = Vec::new();
  store.write_to(&mut bytes).unwrap();
  let read = SvoStore::read_from(Cursor::new(bytes), "unused").unwrap();
  assert_eq!(read, store);
  assert_eq!(read.creation().files.len(), 2);
  assert_eq!(read.metadata(), "sample: test crystal");
  assert_eq!(read.view().tf_style, 2);
  assert_eq!(read.view().alpha, 0.5);
}

#[test]
fn test_header_layout() {
  let store = sample_store();
  let bytes = to_bytes(&store, 4);
  let word = |i: usize| u64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().unwrap());
  assert_eq!(word(0), 1);
  assert_eq!(word(1), 4);
  assert_eq!(word(2), 8);
  assert_eq!(word(3), 7);
  assert_eq!(word(4), 7);
  assert_eq!(word(5), 3);
  // Pool count follows minmax and extent.
  assert_eq!(word(16) as usize, store.pool().len());
}

#[test]
fn test_legacy_minor_uses_defaults() {
  let store = sample_store();
  let read = SvoStore::read_from(Cursor::new(to_bytes(&store, 3)), "1234").unwrap();

  assert_eq!(read.version(), (1, 3));
  assert_eq!(read.index(), store.index());
  assert_eq!(read.pool(), store.pool());
  assert_eq!(read.creation(), &CreationSettings::legacy("1234"));
  assert_eq!(read.view(), &ViewSettings::for_range(store.minmax()));
  assert_eq!(read.view().data_min, 4.0);
  assert_eq!(read.view().data_max, 8.0);
}

#[test]
fn test_legacy_file_dates_from_modification_time() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("old.svo");
  std::fs::write(&path, to_bytes(&sample_store(), 2)).unwrap();

  let opened = SvoStore::open(&path).unwrap();
  let seconds: u64 = opened.creation().date.parse().unwrap();
  assert!(seconds > 0);
}

#[test]
fn test_unsupported_major() {
  let mut bytes = to_bytes(&sample_store(), 4);
  bytes[..8].copy_from_slice(&2i64.to_le_bytes());
  match SvoStore::read_from(Cursor::new(bytes), "") {
    Err(SvoError::UnsupportedVersion { major, minor }) => assert_eq!((major, minor), (2, 4)),
    other => panic!("expected UnsupportedVersion, got {other:?}"),
  }
}

#[test]
fn test_truncated_stream_is_corrupt() {
  let bytes = to_bytes(&sample_store(), 4);
  for cut in [4, 40, 200, bytes.len() - 1] {
    let result = SvoStore::read_from(Cursor::new(&bytes[..cut]), "");
    assert!(matches!(result, Err(SvoError::Corrupt(_))), "cut at {cut}");
  }
}

#[test]
fn test_absurd_count_is_corrupt() {
  let mut bytes = to_bytes(&sample_store(), 4);
  bytes[128..136].copy_from_slice(&(u64::MAX / 8).to_le_bytes());
  assert!(matches!(SvoStore::read_from(Cursor::new(bytes), ""), Err(SvoError::Corrupt(_))));
}

#[test]
fn test_bad_dimensions_are_corrupt() {
  let mut bytes = to_bytes(&sample_store(), 4);
  // inner > outer
  bytes[24..32].copy_from_slice(&9u64.to_le_bytes());
  assert!(matches!(SvoStore::read_from(Cursor::new(bytes), ""), Err(SvoError::Corrupt(_))));
}

#[test]
fn test_accessors() {
  let store = sample_store();
  assert_eq!(store.brick_pool_power(), 7);
  assert_eq!(store.brick_count() * 512, store.pool().len());
  assert_eq!(
    store.byte_size(),
    4 * (store.index().len() + store.brick().len() + store.pool().len())
  );
  assert!(store.node(store.node_count()).is_none());

  let root = store.node(0).unwrap();
  assert!(root.data && !root.msd && root.child == 1);
  assert_eq!(store.pool_coord(0), Some(PoolCoord::new(0, 0, 0)));
  assert_eq!(store.brick_voxels(0).unwrap(), &store.pool()[..512]);

  for i in 0..store.node_count() {
    let word = store.node(i).unwrap();
    assert_eq!(store.brick_voxels(i).is_some(), word.data);
  }
}

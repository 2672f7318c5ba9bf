//! Little-endian encoding of [`SvoStore`].
//!
//! ```text
//! major i64 | minor i64 | outer u64 | inner u64 | pool_power u64 | levels u64
//! minmax 2×f64 | extent 8×f64
//! pool  (u64 count, f32[])
//! index (u64 count, u32[])
//! brick (u64 count, u32[])
//! orientation 9×f64 | metadata (u64 bytes, UTF-8)
//! -- minor >= 4 --------------------------------------------------------
//! date (string) | reduce 2×f64 | project 2×f64 | angles 3×f64
//! files (u64 count, string[])
//! mode i64 | tf_style i64 | tf_texture i64
//! data_min f64 | data_max f64 | alpha f64 | brightness f64
//! ```

use std::io::{self, Read, Write};

use super::settings::{CreationSettings, ViewSettings};
use super::SvoStore;
use crate::constants::{FORMAT_MAJOR, MAX_BRICK_POOL_POWER, MAX_LEVELS, SETTINGS_MIN_MINOR};
use crate::error::{Result, SvoError};
use crate::octree::Extent;
use crate::types::BrickLayout;

fn write_i64(w: &mut impl Write, v: i64) -> io::Result<()> {
  w.write_all(&v.to_le_bytes())
}

fn write_u64(w: &mut impl Write, v: u64) -> io::Result<()> {
  w.write_all(&v.to_le_bytes())
}

fn write_f64(w: &mut impl Write, v: f64) -> io::Result<()> {
  w.write_all(&v.to_le_bytes())
}

fn write_f64s(w: &mut impl Write, values: &[f64]) -> io::Result<()> {
  values.iter().try_for_each(|&v| write_f64(w, v))
}

fn write_string(w: &mut impl Write, s: &str) -> io::Result<()> {
  write_u64(w, s.len() as u64)?;
  w.write_all(s.as_bytes())
}

fn write_f32_array(w: &mut impl Write, values: &[f32]) -> io::Result<()> {
  write_u64(w, values.len() as u64)?;
  values.iter().try_for_each(|v| w.write_all(&v.to_le_bytes()))
}

fn write_u32_array(w: &mut impl Write, values: &[u32]) -> io::Result<()> {
  write_u64(w, values.len() as u64)?;
  values.iter().try_for_each(|v| w.write_all(&v.to_le_bytes()))
}

/// Truncated streams are corrupt, not I/O failures.
fn map_eof(e: io::Error) -> SvoError {
  if e.kind() == io::ErrorKind::UnexpectedEof {
    SvoError::Corrupt("unexpected end of stream".into())
  } else {
    SvoError::Io(e)
  }
}

fn read_bytes<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
  let mut buf = [0u8; N];
  r.read_exact(&mut buf).map_err(map_eof)?;
  Ok(buf)
}

fn read_i64(r: &mut impl Read) -> Result<i64> {
  Ok(i64::from_le_bytes(read_bytes(r)?))
}

fn read_u64(r: &mut impl Read) -> Result<u64> {
  Ok(u64::from_le_bytes(read_bytes(r)?))
}

fn read_f64(r: &mut impl Read) -> Result<f64> {
  Ok(f64::from_le_bytes(read_bytes(r)?))
}

fn read_f64s<const N: usize>(r: &mut impl Read) -> Result<[f64; N]> {
  let mut values = [0.0; N];
  for v in &mut values {
    *v = read_f64(r)?;
  }
  Ok(values)
}

fn read_usize(r: &mut impl Read, what: &str) -> Result<usize> {
  usize::try_from(read_u64(r)?).map_err(|_| SvoError::Corrupt(format!("{what} does not fit in memory")))
}

/// Read a `u64` count followed by `count * width` bytes.
///
/// Memory grows with the bytes actually present, so a corrupt count cannot
/// force a huge allocation.
fn read_block(r: &mut impl Read, width: usize, what: &str) -> Result<Vec<u8>> {
  let count = read_u64(r)?;
  let len = count
    .checked_mul(width as u64)
    .ok_or_else(|| SvoError::Corrupt(format!("{what} length overflows")))?;
  let mut bytes = Vec::new();
  r.by_ref().take(len).read_to_end(&mut bytes)?;
  if bytes.len() as u64 != len {
    return Err(SvoError::Corrupt(format!(
      "{what} truncated: expected {len} bytes, found {}",
      bytes.len()
    )));
  }
  Ok(bytes)
}

fn read_string(r: &mut impl Read, what: &str) -> Result<String> {
  let bytes = read_block(r, 1, what)?;
  String::from_utf8(bytes).map_err(|_| SvoError::Corrupt(format!("{what} is not valid UTF-8")))
}

fn read_f32_array(r: &mut impl Read, what: &str) -> Result<Vec<f32>> {
  let bytes = read_block(r, 4, what)?;
  Ok(
    bytes
      .chunks_exact(4)
      .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
      .collect(),
  )
}

fn read_u32_array(r: &mut impl Read, what: &str) -> Result<Vec<u32>> {
  let bytes = read_block(r, 4, what)?;
  Ok(
    bytes
      .chunks_exact(4)
      .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
      .collect(),
  )
}

/// Encode `store` as version `FORMAT_MAJOR.minor`.
pub(super) fn write_store(w: &mut impl Write, store: &SvoStore, minor: i64) -> Result<()> {
  write_i64(w, FORMAT_MAJOR)?;
  write_i64(w, minor)?;
  write_u64(w, store.layout.outer as u64)?;
  write_u64(w, store.layout.inner as u64)?;
  write_u64(w, store.pool_power as u64)?;
  write_u64(w, store.levels as u64)?;
  write_f64s(w, &store.minmax)?;
  write_f64s(w, &store.extent.to_array())?;
  write_f32_array(w, &store.pool)?;
  write_u32_array(w, &store.index)?;
  write_u32_array(w, &store.brick)?;
  write_f64s(w, &store.orientation)?;
  write_string(w, &store.metadata)?;

  if minor >= SETTINGS_MIN_MINOR {
    let c = &store.creation;
    write_string(w, &c.date)?;
    write_f64s(w, &c.reduce_cutoff)?;
    write_f64s(w, &c.project_cutoff)?;
    write_f64s(w, &c.correction_angles)?;
    write_u64(w, c.files.len() as u64)?;
    for file in &c.files {
      write_string(w, file)?;
    }

    let v = &store.view;
    write_i64(w, v.mode)?;
    write_i64(w, v.tf_style)?;
    write_i64(w, v.tf_texture)?;
    write_f64s(w, &[v.data_min, v.data_max, v.alpha, v.brightness])?;
  }
  w.flush()?;
  Ok(())
}

/// Decode a store; `fallback_date` fills the creation date of pre-1.4 files.
pub(super) fn read_store(r: &mut impl Read, fallback_date: &str) -> Result<SvoStore> {
  let major = read_i64(r)?;
  let minor = read_i64(r)?;
  if major != FORMAT_MAJOR {
    return Err(SvoError::UnsupportedVersion { major, minor });
  }

  let outer = read_usize(r, "brick outer dimension")?;
  let inner = read_usize(r, "brick inner dimension")?;
  let pool_power = read_u64(r)?;
  let levels = read_usize(r, "level count")?;
  if inner == 0 || outer < inner {
    return Err(SvoError::Corrupt(format!("bad brick dimensions {inner}/{outer}")));
  }
  if pool_power > MAX_BRICK_POOL_POWER as u64 {
    return Err(SvoError::Corrupt(format!("bad brick pool power {pool_power}")));
  }
  if levels == 0 || levels > MAX_LEVELS {
    return Err(SvoError::Corrupt(format!("bad level count {levels}")));
  }
  let layout = BrickLayout::new(inner, outer);

  let minmax = read_f64s::<2>(r)?;
  let extent = Extent::from_array(read_f64s::<8>(r)?);
  let pool = read_f32_array(r, "pool")?;
  let index = read_u32_array(r, "index")?;
  let brick = read_u32_array(r, "brick")?;
  if index.len() != brick.len() {
    return Err(SvoError::Corrupt(format!(
      "index has {} nodes, brick has {}",
      index.len(),
      brick.len()
    )));
  }
  if pool.len() % layout.voxels() != 0 {
    return Err(SvoError::Corrupt(format!(
      "pool length {} is not a whole number of bricks",
      pool.len()
    )));
  }
  let orientation = read_f64s::<9>(r)?;
  let metadata = read_string(r, "metadata")?;

  let (creation, view) = if minor >= SETTINGS_MIN_MINOR {
    let date = read_string(r, "creation date")?;
    let reduce_cutoff = read_f64s::<2>(r)?;
    let project_cutoff = read_f64s::<2>(r)?;
    let correction_angles = read_f64s::<3>(r)?;
    let file_count = read_u64(r)?;
    let mut files = Vec::new();
    for _ in 0..file_count {
      files.push(read_string(r, "file name")?);
    }
    let creation = CreationSettings {
      date,
      reduce_cutoff,
      project_cutoff,
      correction_angles,
      files,
    };

    let mode = read_i64(r)?;
    let tf_style = read_i64(r)?;
    let tf_texture = read_i64(r)?;
    let [data_min, data_max, alpha, brightness] = read_f64s::<4>(r)?;
    let view = ViewSettings {
      mode,
      tf_style,
      tf_texture,
      data_min,
      data_max,
      alpha,
      brightness,
    };
    (creation, view)
  } else {
    (CreationSettings::legacy(fallback_date), ViewSettings::for_range(minmax))
  };

  Ok(SvoStore {
    version: (major, minor),
    levels,
    layout,
    pool_power: pool_power as u32,
    minmax,
    extent,
    pool,
    index,
    brick,
    orientation,
    metadata,
    creation,
    view,
  })
}

//! TOML frame manifest: geometry per frame plus raw pixel files.
//!
//! ```toml
//! [defaults]
//! wavelength = 0.7
//! detector_distance = 0.2
//! beam_center_x = 1231.5
//! beam_center_y = 1263.5
//! pixel_size_x = 172e-6
//! pixel_size_y = 172e-6
//! angle_increment = 0.1
//!
//! [[frames]]
//! path = "frames/scan_00001.f32"
//! width = 2463
//! height = 2527
//! start_angle = 0.0
//! ```
//!
//! Pixel files hold `width * height` little-endian `f32` values, row-major.
//! Relative paths resolve against the manifest's directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use svo_core::{CalibratedFrame, FrameGeometry, FrameSource, SvoError};

/// Geometry fields; a frame's own values override the manifest defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct GeometryEntry {
	pub wavelength: Option<f64>,
	pub detector_distance: Option<f64>,
	pub beam_center_x: Option<f64>,
	pub beam_center_y: Option<f64>,
	pub pixel_size_x: Option<f64>,
	pub pixel_size_y: Option<f64>,
	pub start_angle: Option<f64>,
	pub angle_increment: Option<f64>,
	pub kappa: Option<f64>,
	pub phi: Option<f64>,
	pub omega: Option<f64>,
	pub exposure_time: Option<f64>,
	pub flux: Option<f64>,
}

impl GeometryEntry {
	/// Resolve against `defaults`. Angles, exposure and flux default to 0.
	fn resolve(&self, defaults: &GeometryEntry) -> std::result::Result<FrameGeometry, String> {
		let required = |own: Option<f64>, fallback: Option<f64>, name: &str| {
			own.or(fallback).ok_or_else(|| format!("missing {name}"))
		};
		let optional = |own: Option<f64>, fallback: Option<f64>| own.or(fallback).unwrap_or(0.0);
		let d = defaults;

		Ok(FrameGeometry {
			wavelength: required(self.wavelength, d.wavelength, "wavelength")?,
			detector_distance: required(self.detector_distance, d.detector_distance, "detector_distance")?,
			beam_center_x: required(self.beam_center_x, d.beam_center_x, "beam_center_x")?,
			beam_center_y: required(self.beam_center_y, d.beam_center_y, "beam_center_y")?,
			pixel_size_x: required(self.pixel_size_x, d.pixel_size_x, "pixel_size_x")?,
			pixel_size_y: required(self.pixel_size_y, d.pixel_size_y, "pixel_size_y")?,
			start_angle: optional(self.start_angle, d.start_angle),
			angle_increment: optional(self.angle_increment, d.angle_increment),
			kappa: optional(self.kappa, d.kappa),
			phi: optional(self.phi, d.phi),
			omega: optional(self.omega, d.omega),
			exposure_time: optional(self.exposure_time, d.exposure_time),
			flux: optional(self.flux, d.flux),
		})
	}
}

/// One frame of the manifest.
#[derive(Clone, Debug, Deserialize)]
pub struct FrameEntry {
	/// Raw pixel file.
	pub path: PathBuf,
	/// Display label (default: the path).
	pub label: Option<String>,
	pub width: usize,
	pub height: usize,
	#[serde(flatten)]
	pub geometry: GeometryEntry,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Manifest {
	#[serde(default)]
	pub defaults: GeometryEntry,
	#[serde(default)]
	pub frames: Vec<FrameEntry>,
}

impl Manifest {
	pub fn parse(content: &str) -> Result<Self> {
		toml::from_str(content).context("Failed to parse manifest TOML")
	}
}

/// Frames listed by a manifest, loaded lazily one at a time.
#[derive(Clone, Debug)]
pub struct ManifestFrameSource {
	base_dir: PathBuf,
	manifest: Manifest,
}

impl ManifestFrameSource {
	pub fn new(manifest: Manifest, base_dir: impl Into<PathBuf>) -> Self {
		Self {
			base_dir: base_dir.into(),
			manifest,
		}
	}

	/// Read a manifest file; relative frame paths resolve against its directory.
	pub fn open(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read manifest: {}", path.display()))?;
		let manifest = Manifest::parse(&content).with_context(|| format!("Invalid manifest: {}", path.display()))?;
		if manifest.frames.is_empty() {
			anyhow::bail!("Manifest lists no frames: {}", path.display());
		}
		let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
		Ok(Self::new(manifest, base_dir))
	}

	fn entry_label(entry: &FrameEntry) -> String {
		entry
			.label
			.clone()
			.unwrap_or_else(|| entry.path.display().to_string())
	}
}

impl FrameSource for ManifestFrameSource {
	fn len(&self) -> usize {
		self.manifest.frames.len()
	}

	fn load(&self, index: usize) -> svo_core::Result<CalibratedFrame> {
		let entry = self
			.manifest
			.frames
			.get(index)
			.ok_or_else(|| SvoError::InvalidFrame {
				label: format!("#{index}"),
				reason: "no such frame".into(),
			})?;
		let label = Self::entry_label(entry);
		let invalid = |reason: String| SvoError::InvalidFrame {
			label: label.clone(),
			reason,
		};

		let geometry = entry.geometry.resolve(&self.manifest.defaults).map_err(invalid)?;
		let expected = entry
			.width
			.checked_mul(entry.height)
			.and_then(|n| n.checked_mul(4))
			.ok_or_else(|| invalid(format!("detector {}x{} is too large", entry.width, entry.height)))?;
		let bytes = std::fs::read(self.base_dir.join(&entry.path))?;
		if bytes.len() != expected {
			return Err(invalid(format!(
				"pixel file has {} bytes, expected {expected}",
				bytes.len()
			)));
		}
		let pixels = bytes
			.chunks_exact(4)
			.map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
			.collect();

		Ok(CalibratedFrame::new(label, entry.width, entry.height, pixels, geometry))
	}
}

//! Axis-aligned extent with double precision.

use glam::DVec3;

/// Double-precision axis-aligned box.
///
/// The reconstruction volume is the cube `[-Q, Q]^3`; every octree node's
/// region is an octant of its parent's.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
	/// Minimum corner (inclusive).
	pub min: DVec3,
	/// Maximum corner (inclusive).
	pub max: DVec3,
}

impl Extent {
	/// Create a new extent from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"extent min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Cube centred on the origin: `[-half_side, half_side]^3`.
	pub fn cube(half_side: f64) -> Self {
		Self::from_center_half_extents(DVec3::ZERO, DVec3::splat(half_side))
	}

	/// Box of `half_extents` around `center`.
	pub fn from_center_half_extents(center: DVec3, half_extents: DVec3) -> Self {
		Self {
			min: center - half_extents,
			max: center + half_extents,
		}
	}

	/// Check if this extent contains a point (boundaries count).
	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		point.cmpge(self.min).all() && point.cmple(self.max).all()
	}

	/// Size along each axis.
	#[inline]
	pub fn size(&self) -> DVec3 {
		self.max - self.min
	}

	/// Side length along X (the extent is a cube in practice).
	#[inline]
	pub fn side(&self) -> f64 {
		self.max.x - self.min.x
	}

	#[inline]
	pub fn center(&self) -> DVec3 {
		(self.min + self.max) * 0.5
	}

	/// Grow by `margin` on every side.
	pub fn expanded(&self, margin: f64) -> Self {
		Self {
			min: self.min - DVec3::splat(margin),
			max: self.max + DVec3::splat(margin),
		}
	}

	/// Octant `i` (bit 0 = +X half, bit 1 = +Y half, bit 2 = +Z half).
	pub fn octant(&self, i: u8) -> Self {
		let half = self.size() * 0.5;
		let offset = DVec3::new(
			(i & 1) as f64,
			((i >> 1) & 1) as f64,
			((i >> 2) & 1) as f64,
		) * half;
		let min = self.min + offset;
		Self { min, max: min + half }
	}

	/// Stored form: rows x, y, z, w of `[min, max]`, w fixed at `[1, 1]`.
	pub fn to_array(&self) -> [f64; 8] {
		[
			self.min.x, self.max.x, self.min.y, self.max.y, self.min.z, self.max.z, 1.0, 1.0,
		]
	}

	/// Inverse of [`Self::to_array`]; the w row is ignored.
	pub fn from_array(values: [f64; 8]) -> Self {
		Self {
			min: DVec3::new(values[0], values[2], values[4]),
			max: DVec3::new(values[1], values[3], values[5]),
		}
	}
}

//! Brick pool capacity accounting.
//!
//! The pool is a cube of `2^power` bricks per axis, further capped by a byte
//! ceiling. Slots are handed out in order and never returned.

use super::packing::PoolCoord;
use crate::error::{Result, SvoError};
use crate::types::BrickLayout;

/// Bump allocator over brick pool slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolBudget {
	/// Bricks per pool axis.
	side: usize,
	/// Slots available: `min(side^3, pool_bytes / brick_bytes)`.
	capacity: usize,
	/// Slots handed out so far.
	used: usize,
}

impl PoolBudget {
	/// Budget for a pool of `2^pool_power` bricks per axis under `pool_bytes`.
	pub fn new(pool_power: u32, layout: BrickLayout, pool_bytes: usize) -> Self {
		let side = 1usize << pool_power;
		let by_shape = side * side * side;
		let by_bytes = pool_bytes / layout.bytes().max(1);
		Self {
			side,
			capacity: by_shape.min(by_bytes),
			used: 0,
		}
	}

	#[inline]
	pub fn side(&self) -> usize {
		self.side
	}

	#[inline]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	#[inline]
	pub fn used(&self) -> usize {
		self.used
	}

	#[inline]
	pub fn remaining(&self) -> usize {
		self.capacity - self.used
	}

	/// Hand out the next slot.
	///
	/// Fails with `PoolCapacityExceeded` once every slot is taken; the budget
	/// is left unchanged in that case.
	pub fn claim(&mut self) -> Result<PoolCoord> {
		if self.used >= self.capacity {
			return Err(SvoError::PoolCapacityExceeded {
				needed: self.used + 1,
				capacity: self.capacity,
			});
		}
		let coord = PoolCoord::from_slot(self.used, self.side);
		self.used += 1;
		Ok(coord)
	}
}

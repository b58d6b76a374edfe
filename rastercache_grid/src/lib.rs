//! The region and tile grid geometry for the [`rastercache`](https://docs.rs/rastercache/latest/rastercache/index.html) crate.
//!
//! - [`Region`]: an `offsets`/`shapes` window of a rank-2 (`[row, col]`) or rank-3 (`[layer, row, col]`) variable.
//! - [`Cuboid`]: a signed `{z, y, x, depth, height, width}` box used for bounding-box bookkeeping.
//! - [`TileGrid`]: a regular grid of tiles covering a variable, with boundary tiles clipped to the variable extent.
//! - [`ContiguousRuns`]: the linear offset arithmetic for copying a sub-region between two differently shaped buffers.
//!
//! ## Licence
//! `rastercache_grid` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod contiguous_runs;
mod cuboid;
mod region;
mod tile_grid;

pub use contiguous_runs::{ContiguousRun, ContiguousRuns, ContiguousRunsIterator};
pub use cuboid::Cuboid;
pub use region::{axis_intersects, Region, RegionError, MAX_RANK, MIN_RANK};
pub use tile_grid::{TileGrid, TileGridCreateError};

/// ND indices to an element of a variable, or to a tile of a tile grid.
pub type RegionIndices = Vec<u64>;

/// The shape of a region, variable or tile grid.
pub type RegionShape = Vec<u64>;

/// ND indices stored inline for ranks up to 4.
pub type RegionIndicesTinyVec = tinyvec::TinyVec<[u64; 4]>;

/// Linearise `indices` into a C-ordered array of `shape`.
///
/// Returns [`None`] if `indices` are out-of-bounds of `shape` or the lengths differ.
#[must_use]
pub fn linearised_index(indices: &[u64], shape: &[u64]) -> Option<u64> {
    if indices.len() != shape.len() {
        return None;
    }
    let mut index: u64 = 0;
    let mut count = 1;
    for (i, s) in std::iter::zip(indices, shape).rev() {
        if i >= s {
            return None;
        }
        index += i * count;
        count *= s;
    }
    Some(index)
}

/// Unravel a linearised index into the ND indices of a C-ordered array of `shape`.
///
/// Returns [`None`] if `index` is out-of-bounds.
#[must_use]
pub fn unravel_index(mut index: u64, shape: &[u64]) -> Option<RegionIndicesTinyVec> {
    let total_size: u64 = shape
        .iter()
        .try_fold(1u64, |acc, &dim| acc.checked_mul(dim))?;
    if index >= total_size {
        return None;
    }
    let mut indices: RegionIndicesTinyVec = shape.iter().map(|_| 0).collect();
    for (i, &s) in std::iter::zip(indices.iter_mut(), shape).rev() {
        *i = index % s;
        index /= s;
    }
    Some(indices)
}

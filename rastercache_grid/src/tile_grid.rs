//! A regular tile grid over a variable.

use std::num::NonZeroU64;

use itertools::izip;
use thiserror::Error;

use crate::{
    linearised_index, unravel_index, Region, RegionError, RegionIndices, RegionShape, MAX_RANK,
    MIN_RANK,
};

/// A [`TileGrid`] creation error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TileGridCreateError {
    /// The tile shape and array shape have different ranks, or an unsupported rank.
    #[error("tile shape {tile_shape:?} not compatible with array shape {array_shape:?}")]
    IncompatibleShape {
        /// The array shape.
        array_shape: RegionShape,
        /// The tile shape.
        tile_shape: RegionShape,
    },
    /// A tile extent is zero.
    #[error("tile shape {0:?} has a zero extent")]
    ZeroTileExtent(RegionShape),
}

/// A regular grid of tiles covering a variable.
///
/// The grid has `ceil(extent / tile_extent)` tiles along each axis.
/// Tiles on the last row, column or layer are clipped to the variable extent rather than overhanging it.
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    array_shape: RegionShape,
    tile_shape: Vec<NonZeroU64>,
    grid_shape: RegionShape,
}

impl TileGrid {
    /// Create a new tile grid covering `array_shape` with tiles of `tile_shape`.
    ///
    /// # Errors
    /// Returns a [`TileGridCreateError`] if the shapes have different or unsupported ranks, or a tile extent is zero.
    pub fn new(
        array_shape: RegionShape,
        tile_shape: RegionShape,
    ) -> Result<Self, TileGridCreateError> {
        if array_shape.len() != tile_shape.len()
            || !(MIN_RANK..=MAX_RANK).contains(&array_shape.len())
        {
            return Err(TileGridCreateError::IncompatibleShape {
                array_shape,
                tile_shape,
            });
        }
        let Some(tile_shape_nz) = tile_shape
            .iter()
            .map(|&extent| NonZeroU64::new(extent))
            .collect::<Option<Vec<_>>>()
        else {
            return Err(TileGridCreateError::ZeroTileExtent(tile_shape));
        };
        let grid_shape = std::iter::zip(&array_shape, &tile_shape_nz)
            .map(|(&extent, &tile)| extent.div_ceil(tile.get()))
            .collect();
        Ok(Self {
            array_shape,
            tile_shape: tile_shape_nz,
            grid_shape,
        })
    }

    /// Return the rank of the grid.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.array_shape.len()
    }

    /// Return the shape of the variable covered by the grid.
    #[must_use]
    pub fn array_shape(&self) -> &[u64] {
        &self.array_shape
    }

    /// Return the (unclipped) tile shape.
    #[must_use]
    pub fn tile_shape(&self) -> Vec<u64> {
        self.tile_shape.iter().map(|t| t.get()).collect()
    }

    /// Return the number of tiles along each axis.
    #[must_use]
    pub fn grid_shape(&self) -> &[u64] {
        &self.grid_shape
    }

    /// Return the total number of tiles.
    #[must_use]
    pub fn num_tiles(&self) -> u64 {
        self.grid_shape.iter().product()
    }

    /// Return the region of the tile at `grid_indices`, clipped to the variable extent.
    ///
    /// Returns [`None`] if `grid_indices` are out-of-bounds of the grid.
    #[must_use]
    pub fn tile_region(&self, grid_indices: &[u64]) -> Option<Region> {
        if grid_indices.len() != self.rank()
            || std::iter::zip(grid_indices, &self.grid_shape).any(|(i, g)| i >= g)
        {
            return None;
        }
        let ranges = izip!(grid_indices, &self.tile_shape, &self.array_shape).map(
            |(&index, &tile, &extent)| {
                let start = index * tile.get();
                let end_inc = std::cmp::min(start + tile.get() - 1, extent - 1);
                start..end_inc + 1
            },
        );
        Some(Region::from_ranges_unchecked(ranges))
    }

    /// Return the region of the tile with C-order linear index `linear_index`.
    #[must_use]
    pub fn tile_region_linear(&self, linear_index: u64) -> Option<Region> {
        let grid_indices = unravel_index(linear_index, &self.grid_shape)?;
        self.tile_region(&grid_indices)
    }

    /// Iterate over every tile region in C order (the last axis fastest).
    pub fn iter_tile_regions(&self) -> impl Iterator<Item = Region> + '_ {
        (0..self.num_tiles()).filter_map(|linear_index| self.tile_region_linear(linear_index))
    }

    /// Return the C-order linear index of the tile at `grid_indices`.
    #[must_use]
    pub fn linear_index(&self, grid_indices: &[u64]) -> Option<u64> {
        linearised_index(grid_indices, &self.grid_shape)
    }

    /// Return the grid indices of the tile containing the element at `indices`.
    ///
    /// Returns [`None`] if `indices` are outside of the variable.
    #[must_use]
    pub fn grid_indices_of(&self, indices: &[u64]) -> Option<RegionIndices> {
        if indices.len() != self.rank()
            || std::iter::zip(indices, &self.array_shape).any(|(i, e)| i >= e)
        {
            return None;
        }
        Some(
            std::iter::zip(indices, &self.tile_shape)
                .map(|(&index, &tile)| index / tile.get())
                .collect(),
        )
    }

    /// Return the grid-index region of the tiles that intersect `region`.
    ///
    /// The parts of `region` outside of the variable are ignored, so the result is empty if `region` lies entirely outside.
    ///
    /// # Errors
    /// Returns [`RegionError::IncompatibleDimensionality`] if the region rank does not match the grid rank.
    pub fn tiles_in_region(&self, region: &Region) -> Result<Region, RegionError> {
        let bounded = region.bound(&self.array_shape)?;
        let Some(end_inc) = bounded.end_inc() else {
            return Region::new_with_shape(vec![0; self.rank()]);
        };
        let ranges = izip!(bounded.start(), end_inc, &self.tile_shape)
            .map(|(&start, end_inc, &tile)| start / tile.get()..end_inc / tile.get() + 1);
        Ok(Region::from_ranges_unchecked(ranges))
    }
}

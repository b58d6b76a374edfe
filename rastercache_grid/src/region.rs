//! Regions of a variable index space.
//!
//! A [`Region`] is the `offsets`/`shapes` pair used throughout the cache to address a window of a variable.
//! Axes are always ordered `[row, col]` (rank 2) or `[layer, row, col]` (rank 3).

use std::fmt::Display;
use std::ops::Range;

use itertools::izip;
use thiserror::Error;

use crate::{Cuboid, RegionIndices, RegionShape};

/// The lowest supported region rank.
pub const MIN_RANK: usize = 2;

/// The highest supported region rank.
pub const MAX_RANK: usize = 3;

/// A region error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    /// The region rank is not 2 or 3.
    #[error("unsupported dimensionality {0}, expected 2 or 3")]
    UnsupportedDimensionality(usize),
    /// Two operands have different ranks.
    #[error("incompatible dimensionality {got}, expected {expected}")]
    IncompatibleDimensionality {
        /// The rank of the offending operand.
        got: usize,
        /// The expected rank.
        expected: usize,
    },
    /// The start and shape have different lengths.
    #[error("incompatible start {start:?} with shape {shape:?}")]
    IncompatibleStartShape {
        /// The start.
        start: RegionIndices,
        /// The shape.
        shape: RegionShape,
    },
    /// The start and end are incompatible.
    #[error("incompatible start {start:?} with end {end:?} (inclusive: {inclusive})")]
    IncompatibleStartEnd {
        /// The start.
        start: RegionIndices,
        /// The end.
        end: RegionIndices,
        /// Whether `end` is inclusive.
        inclusive: bool,
    },
    /// The offset is past the start of the region.
    #[error("incompatible offset {offset:?} for region with start {start:?}")]
    IncompatibleOffset {
        /// The region start.
        start: RegionIndices,
        /// The offset.
        offset: RegionIndices,
    },
    /// The end of the region is not representable as a `u64` index.
    #[error("region with start {start:?} and shape {shape:?} overflows the index space")]
    Overflow {
        /// The start.
        start: RegionIndices,
        /// The shape.
        shape: RegionShape,
    },
    /// The region is not inside the bounds of a shape.
    #[error("region {region} is out of bounds of shape {bounds:?}")]
    OutOfBounds {
        /// The region.
        region: Region,
        /// The bounding shape.
        bounds: RegionShape,
    },
}

fn check_rank(rank: usize) -> Result<(), RegionError> {
    if (MIN_RANK..=MAX_RANK).contains(&rank) {
        Ok(())
    } else {
        Err(RegionError::UnsupportedDimensionality(rank))
    }
}

fn check_end(start: &[u64], shape: &[u64]) -> Result<(), RegionError> {
    if std::iter::zip(start, shape).all(|(start, size)| start.checked_add(*size).is_some()) {
        Ok(())
    } else {
        Err(RegionError::Overflow {
            start: start.to_vec(),
            shape: shape.to_vec(),
        })
    }
}

/// Closed-interval overlap test of a query range against an axis range.
///
/// True if the query `[test_min, test_max]` ends inside, starts inside, or fully contains `[axis_min, axis_max]`.
#[must_use]
pub fn axis_intersects(axis_min: u64, axis_max: u64, test_min: u64, test_max: u64) -> bool {
    (test_max >= axis_min && test_max <= axis_max)
        || (test_min >= axis_min && test_min <= axis_max)
        || (test_min <= axis_min && test_max >= axis_max)
}

/// A rank-2 or rank-3 window of a variable.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Region {
    start: RegionIndices,
    shape: RegionShape,
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_ranges())
    }
}

impl Region {
    /// Create a new region.
    ///
    /// # Errors
    /// Returns [`RegionError`] if the lengths of `start` and `shape` differ, the rank is not 2 or 3, or `start + shape` overflows on any axis.
    pub fn new_with_start_shape(
        start: RegionIndices,
        shape: RegionShape,
    ) -> Result<Self, RegionError> {
        if start.len() != shape.len() {
            return Err(RegionError::IncompatibleStartShape { start, shape });
        }
        check_rank(start.len())?;
        check_end(&start, &shape)?;
        Ok(Self { start, shape })
    }

    /// Create a new region from a list of [`Range`]s.
    ///
    /// # Errors
    /// Returns [`RegionError::UnsupportedDimensionality`] if the rank is not 2 or 3.
    pub fn new_with_ranges(ranges: &[Range<u64>]) -> Result<Self, RegionError> {
        check_rank(ranges.len())?;
        Ok(Self::from_ranges_unchecked(ranges.iter().cloned()))
    }

    /// Create a new region of `shape` at the origin.
    ///
    /// # Errors
    /// Returns [`RegionError::UnsupportedDimensionality`] if the rank is not 2 or 3.
    pub fn new_with_shape(shape: RegionShape) -> Result<Self, RegionError> {
        check_rank(shape.len())?;
        Ok(Self {
            start: vec![0; shape.len()],
            shape,
        })
    }

    /// Create a new region from a start and an inclusive end.
    ///
    /// # Errors
    /// Returns [`RegionError`] if any element of `end` is less than `start`, the lengths differ, the rank is unsupported, or `end` is [`u64::MAX`].
    pub fn new_with_start_end_inc(
        start: RegionIndices,
        end: RegionIndices,
    ) -> Result<Self, RegionError> {
        if start.len() != end.len() || std::iter::zip(&start, &end).any(|(start, end)| end < start)
        {
            return Err(RegionError::IncompatibleStartEnd {
                start,
                end,
                inclusive: true,
            });
        }
        check_rank(start.len())?;
        let shape: RegionShape = std::iter::zip(&start, &end)
            .map(|(&start, &end)| (end - start).saturating_add(1))
            .collect();
        check_end(&start, &shape)?;
        Ok(Self { start, shape })
    }

    pub(crate) fn from_ranges_unchecked(ranges: impl IntoIterator<Item = Range<u64>>) -> Self {
        let (start, shape) = ranges
            .into_iter()
            .map(|range| (range.start, range.end.saturating_sub(range.start)))
            .unzip();
        Self { start, shape }
    }

    /// Return the rank (2 or 3).
    #[must_use]
    pub fn rank(&self) -> usize {
        self.start.len()
    }

    /// Return the start (offsets) of the region.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the region.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Returns true if any extent is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.contains(&0)
    }

    /// Return the number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the exclusive end indices.
    #[must_use]
    pub fn end_exc(&self) -> RegionIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(&s, &l)| s + l)
            .collect()
    }

    /// Return the inclusive end indices, or [`None`] if the region is empty.
    #[must_use]
    pub fn end_inc(&self) -> Option<RegionIndices> {
        if self.is_empty() {
            None
        } else {
            Some(
                std::iter::zip(&self.start, &self.shape)
                    .map(|(&s, &l)| s + l - 1)
                    .collect(),
            )
        }
    }

    /// Convert to ranges.
    #[must_use]
    pub fn to_ranges(&self) -> Vec<Range<u64>> {
        std::iter::zip(&self.start, &self.shape)
            .map(|(&start, &size)| start..start + size)
            .collect()
    }

    /// Returns true if the region contains `indices`.
    #[must_use]
    pub fn contains(&self, indices: &[u64]) -> bool {
        indices.len() == self.rank()
            && izip!(indices, &self.start, &self.shape).all(|(&i, &o, &s)| i >= o && i < o + s)
    }

    /// Returns true if the region is within a variable of `shape`.
    #[must_use]
    pub fn inbounds_shape(&self, shape: &[u64]) -> bool {
        shape.len() == self.rank()
            && izip!(&self.start, &self.shape, shape).all(|(&start, &size, &bound)| {
                start + size <= bound
            })
    }

    /// Returns true if the region is within `other`.
    #[must_use]
    pub fn inbounds(&self, other: &Region) -> bool {
        other.rank() == self.rank()
            && izip!(&self.start, &self.shape, &other.start, &other.shape)
                .all(|(&s, &ss, &o, &os)| s >= o && s + ss <= o + os)
    }

    /// Returns true if `query` overlaps this region on every axis.
    ///
    /// Each axis is tested with [`axis_intersects`] against the closed `[min, max]` ranges of both regions.
    /// An empty region never intersects, and regions of different ranks never intersect.
    #[must_use]
    pub fn intersects(&self, query: &Region) -> bool {
        if query.rank() != self.rank() || self.is_empty() || query.is_empty() {
            return false;
        }
        izip!(&self.start, &self.shape, &query.start, &query.shape).all(
            |(&axis_min, &axis_size, &test_min, &test_size)| {
                axis_intersects(
                    axis_min,
                    axis_min + axis_size - 1,
                    test_min,
                    test_min + test_size - 1,
                )
            },
        )
    }

    /// Return the overlap between this region and `other`.
    ///
    /// The result is empty if the regions do not intersect.
    ///
    /// # Errors
    /// Returns [`RegionError::IncompatibleDimensionality`] if the ranks differ.
    pub fn overlap(&self, other: &Region) -> Result<Region, RegionError> {
        if other.rank() != self.rank() {
            return Err(RegionError::IncompatibleDimensionality {
                got: other.rank(),
                expected: self.rank(),
            });
        }
        let ranges = izip!(&self.start, &self.shape, &other.start, &other.shape).map(
            |(&start, &size, &other_start, &other_size)| {
                let overlap_start = std::cmp::max(start, other_start);
                let overlap_end = std::cmp::min(start + size, other_start + other_size);
                overlap_start..std::cmp::max(overlap_start, overlap_end)
            },
        );
        Ok(Self::from_ranges_unchecked(ranges))
    }

    /// Return the region relative to `offset`, i.e. starting at `start - offset`.
    ///
    /// # Errors
    /// Returns [`RegionError`] if the length of `offset` does not match the rank, or `offset` is past `start` on any axis.
    pub fn relative_to(&self, offset: &[u64]) -> Result<Region, RegionError> {
        if offset.len() != self.rank() {
            return Err(RegionError::IncompatibleDimensionality {
                got: offset.len(),
                expected: self.rank(),
            });
        }
        if std::iter::zip(&self.start, offset).any(|(start, offset)| start < offset) {
            return Err(RegionError::IncompatibleOffset {
                start: self.start.clone(),
                offset: offset.to_vec(),
            });
        }
        Ok(Self {
            start: std::iter::zip(&self.start, offset)
                .map(|(start, offset)| start - offset)
                .collect(),
            shape: self.shape.clone(),
        })
    }

    /// Bound the region to the domain within `end` (exclusive).
    ///
    /// # Errors
    /// Returns [`RegionError::IncompatibleDimensionality`] if `end` does not match the rank.
    pub fn bound(&self, end: &[u64]) -> Result<Region, RegionError> {
        if end.len() != self.rank() {
            return Err(RegionError::IncompatibleDimensionality {
                got: end.len(),
                expected: self.rank(),
            });
        }
        let ranges = izip!(&self.start, &self.shape, end).map(|(&start, &size, &end)| {
            let start = std::cmp::min(start, end);
            start..std::cmp::min(start + size, end)
        });
        Ok(Self::from_ranges_unchecked(ranges))
    }

    /// Return the start promoted to `[layer, row, col]`; rank-2 regions get layer 0.
    #[must_use]
    pub fn start_3d(&self) -> [u64; 3] {
        match self.start.as_slice() {
            &[row, col] => [0, row, col],
            &[layer, row, col] => [layer, row, col],
            _ => unreachable!("region rank is validated on construction"),
        }
    }

    /// Return the shape promoted to `[layers, rows, cols]`; rank-2 regions get one layer.
    #[must_use]
    pub fn shape_3d(&self) -> [u64; 3] {
        match self.shape.as_slice() {
            &[rows, cols] => [1, rows, cols],
            &[layers, rows, cols] => [layers, rows, cols],
            _ => unreachable!("region rank is validated on construction"),
        }
    }

    /// Return the bounding [`Cuboid`] of the region.
    #[must_use]
    pub fn to_cuboid(&self) -> Cuboid {
        Cuboid::from(self)
    }
}

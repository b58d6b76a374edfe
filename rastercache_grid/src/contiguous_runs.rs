use std::iter::FusedIterator;

use itertools::izip;

use crate::{unravel_index, Region, RegionError, RegionShape};

/// A contiguous run of elements to copy between two linear buffers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContiguousRun {
    /// The linear element offset in the source buffer.
    pub src: u64,
    /// The linear element offset in the destination buffer.
    pub dst: u64,
    /// The number of contiguous elements.
    pub len: u64,
}

/// The contiguous runs for copying a box between two C-ordered buffers of different shapes.
///
/// A box of `copy_shape` elements starting at `src_offsets` within a buffer of `src_shape` is copied to `dst_offsets` within a buffer of `dst_shape`.
/// Each run is one row of the box (the last axis), except that trailing axes which are fully covered on both sides are merged into a single longer run.
///
/// For example, copying the lower right 2x2 corner of a 4x3 buffer to the origin of a 2x2 buffer produces
/// ```rust,ignore
/// [ContiguousRun { src: 7, dst: 0, len: 2 }, ContiguousRun { src: 10, dst: 2, len: 2 }]
/// ```
#[derive(Clone, Debug)]
pub struct ContiguousRuns {
    src_start: u64,
    dst_start: u64,
    src_strides: RegionShape,
    dst_strides: RegionShape,
    outer_shape: RegionShape,
    run_len: u64,
}

fn strides(shape: &[u64]) -> RegionShape {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

fn dot(a: &[u64], b: &[u64]) -> u64 {
    std::iter::zip(a, b).map(|(a, b)| a * b).sum()
}

impl ContiguousRuns {
    /// Create the contiguous runs for a copy.
    ///
    /// # Errors
    /// Returns a [`RegionError`] if the ranks are inconsistent or unsupported, or the copied box is out-of-bounds of either buffer.
    pub fn new(
        src_shape: &[u64],
        src_offsets: &[u64],
        dst_shape: &[u64],
        dst_offsets: &[u64],
        copy_shape: &[u64],
    ) -> Result<Self, RegionError> {
        let rank = copy_shape.len();
        for len in [src_shape.len(), src_offsets.len(), dst_shape.len(), dst_offsets.len()] {
            if len != rank {
                return Err(RegionError::IncompatibleDimensionality {
                    got: len,
                    expected: rank,
                });
            }
        }
        let src_region = Region::new_with_start_shape(src_offsets.to_vec(), copy_shape.to_vec())?;
        if !src_region.inbounds_shape(src_shape) {
            return Err(RegionError::OutOfBounds {
                region: src_region,
                bounds: src_shape.to_vec(),
            });
        }
        let dst_region = Region::new_with_start_shape(dst_offsets.to_vec(), copy_shape.to_vec())?;
        if !dst_region.inbounds_shape(dst_shape) {
            return Err(RegionError::OutOfBounds {
                region: dst_region,
                bounds: dst_shape.to_vec(),
            });
        }

        let src_strides = strides(src_shape);
        let dst_strides = strides(dst_shape);
        if src_region.is_empty() {
            return Ok(Self {
                src_start: 0,
                dst_start: 0,
                src_strides,
                dst_strides,
                outer_shape: vec![0],
                run_len: 0,
            });
        }

        let mut split = rank - 1;
        let mut run_len = copy_shape[split];
        while split > 0 {
            let full = |offsets: &[u64], shape: &[u64]| {
                offsets[split] == 0 && copy_shape[split] == shape[split]
            };
            if !(full(src_offsets, src_shape) && full(dst_offsets, dst_shape)) {
                break;
            }
            split -= 1;
            run_len *= copy_shape[split];
        }

        Ok(Self {
            src_start: dot(src_offsets, &src_strides),
            dst_start: dot(dst_offsets, &dst_strides),
            src_strides,
            dst_strides,
            outer_shape: copy_shape[..split].to_vec(),
            run_len,
        })
    }

    /// Return the number of runs.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from(self.num_runs()).unwrap_or(usize::MAX)
    }

    fn num_runs(&self) -> u64 {
        self.outer_shape.iter().product()
    }

    /// Returns true if there are no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the number of elements in each run.
    #[must_use]
    pub fn run_len(&self) -> u64 {
        self.run_len
    }

    /// Return the number of elements in each run as a [`usize`].
    ///
    /// # Panics
    /// Panics if the run length exceeds [`usize::MAX`].
    #[must_use]
    pub fn run_len_usize(&self) -> usize {
        usize::try_from(self.run_len).unwrap()
    }

    /// Create a serial iterator over the runs.
    #[must_use]
    pub fn iter(&self) -> ContiguousRunsIterator<'_> {
        <&Self as IntoIterator>::into_iter(self)
    }

    fn run(&self, index: u64) -> Option<ContiguousRun> {
        let outer = unravel_index(index, &self.outer_shape)?;
        let (src, dst) = izip!(outer.iter(), &self.src_strides, &self.dst_strides).fold(
            (self.src_start, self.dst_start),
            |(src, dst), (&i, &src_stride, &dst_stride)| {
                (src + i * src_stride, dst + i * dst_stride)
            },
        );
        Some(ContiguousRun {
            src,
            dst,
            len: self.run_len,
        })
    }
}

impl<'a> IntoIterator for &'a ContiguousRuns {
    type Item = ContiguousRun;
    type IntoIter = ContiguousRunsIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        ContiguousRunsIterator {
            runs: self,
            index: 0,
            len: self.num_runs(),
        }
    }
}

/// Serial iterator over [`ContiguousRuns`].
pub struct ContiguousRunsIterator<'a> {
    runs: &'a ContiguousRuns,
    index: u64,
    len: u64,
}

impl Iterator for ContiguousRunsIterator<'_> {
    type Item = ContiguousRun;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let run = self.runs.run(self.index);
        self.index += 1;
        run
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.len - self.index).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ContiguousRunsIterator<'_> {}

impl FusedIterator for ContiguousRunsIterator<'_> {}

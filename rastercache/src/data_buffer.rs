//! Typed sample buffers with a location in a variable.

use rastercache_grid::{ContiguousRuns, Region, RegionError};
use thiserror::Error;

use crate::{DataType, Element};

/// A [`DataBuffer`] error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DataBufferError {
    /// The number of bytes does not match the shape and data type.
    #[error("buffer of {got} bytes does not match the {expected} bytes required by its shape")]
    SizeMismatch {
        /// The expected number of bytes.
        expected: u64,
        /// The actual number of bytes.
        got: u64,
    },
    /// The data type does not match.
    #[error("data type {got} does not match {expected}")]
    DataTypeMismatch {
        /// The expected data type.
        expected: DataType,
        /// The actual data type.
        got: DataType,
    },
    /// The buffer does not contain a region it should receive.
    #[error("buffer at {buffer} does not contain {region}")]
    RegionNotContained {
        /// The region to receive, in variable coordinates.
        region: Region,
        /// The region of the buffer, in variable coordinates.
        buffer: Region,
    },
    /// The buffer cannot be addressed on this platform.
    #[error("buffer of {0} bytes is too large")]
    TooLarge(u64),
    /// A region error.
    #[error(transparent)]
    Region(#[from] RegionError),
}

/// An owned block of typed samples located at `offsets` within a variable.
///
/// The offsets and shapes are always available as three components `[layer, row, col]`.
/// A rank-2 buffer reports layer offset 0 and a layer shape of 1, and keeps [`rank`](DataBuffer::rank) 2 so that its layer origin can follow the layer of a rank-3 request.
#[derive(Clone, Debug, PartialEq)]
pub struct DataBuffer {
    data_type: DataType,
    region: Region,
    bytes: Vec<u8>,
}

fn num_bytes(data_type: DataType, region: &Region) -> Result<usize, DataBufferError> {
    let num_bytes = region
        .shape()
        .iter()
        .try_fold(data_type.size() as u64, |acc, &size| acc.checked_mul(size))
        .ok_or(DataBufferError::TooLarge(u64::MAX))?;
    usize::try_from(num_bytes).map_err(|_| DataBufferError::TooLarge(num_bytes))
}

fn promote(values: &[u64], fill: u64) -> Result<[u64; 3], RegionError> {
    match *values {
        [row, col] => Ok([fill, row, col]),
        [layer, row, col] => Ok([layer, row, col]),
        _ => Err(RegionError::UnsupportedDimensionality(values.len())),
    }
}

impl DataBuffer {
    /// Create a new data buffer from raw native-endian bytes.
    ///
    /// # Errors
    /// Returns a [`DataBufferError`] if `offsets` and `shapes` are not a valid rank-2 or rank-3 region, or the length of `bytes` does not match.
    pub fn new(
        data_type: DataType,
        offsets: &[u64],
        shapes: &[u64],
        bytes: Vec<u8>,
    ) -> Result<Self, DataBufferError> {
        let region = Region::new_with_start_shape(offsets.to_vec(), shapes.to_vec())?;
        let expected = num_bytes(data_type, &region)?;
        if expected != bytes.len() {
            return Err(DataBufferError::SizeMismatch {
                expected: expected as u64,
                got: bytes.len() as u64,
            });
        }
        Ok(Self {
            data_type,
            region,
            bytes,
        })
    }

    /// Create a new data buffer from elements.
    ///
    /// # Errors
    /// Returns a [`DataBufferError`] if the number of elements does not match `shapes`.
    pub fn from_elements<T: Element>(
        offsets: &[u64],
        shapes: &[u64],
        elements: &[T],
    ) -> Result<Self, DataBufferError> {
        Self::new(
            T::DATA_TYPE,
            offsets,
            shapes,
            bytemuck::cast_slice(elements).to_vec(),
        )
    }

    /// Create a new zero-filled data buffer.
    ///
    /// # Errors
    /// Returns a [`DataBufferError`] if `offsets` and `shapes` are not a valid region.
    pub fn zeroed(
        data_type: DataType,
        offsets: &[u64],
        shapes: &[u64],
    ) -> Result<Self, DataBufferError> {
        let region = Region::new_with_start_shape(offsets.to_vec(), shapes.to_vec())?;
        let bytes = vec![0; num_bytes(data_type, &region)?];
        Ok(Self {
            data_type,
            region,
            bytes,
        })
    }

    /// Create a new zero-filled data buffer covering `region`.
    ///
    /// # Errors
    /// Returns [`DataBufferError::TooLarge`] if the buffer cannot be allocated on this platform.
    pub fn zeroed_region(data_type: DataType, region: &Region) -> Result<Self, DataBufferError> {
        let bytes = vec![0; num_bytes(data_type, region)?];
        Ok(Self {
            data_type,
            region: region.clone(),
            bytes,
        })
    }

    /// Return the data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the rank the buffer was created with (2 or 3).
    #[must_use]
    pub fn rank(&self) -> usize {
        self.region.rank()
    }

    /// Return the offsets as `[layer, row, col]`.
    #[must_use]
    pub fn offsets(&self) -> [u64; 3] {
        self.region.start_3d()
    }

    /// Return the shapes as `[layers, rows, cols]`.
    #[must_use]
    pub fn shapes(&self) -> [u64; 3] {
        self.region.shape_3d()
    }

    /// Return the region of the variable covered by the buffer, at its original rank.
    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Return the number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.region.num_elements()
    }

    /// Return the size of the samples in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Return the underlying native-endian bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the buffer and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Return the elements as a [`Vec<T>`].
    ///
    /// # Errors
    /// Returns [`DataBufferError::DataTypeMismatch`] if `T` does not match the data type.
    pub fn elements<T: Element>(&self) -> Result<Vec<T>, DataBufferError> {
        if T::DATA_TYPE != self.data_type {
            return Err(DataBufferError::DataTypeMismatch {
                expected: self.data_type,
                got: T::DATA_TYPE,
            });
        }
        Ok(bytemuck::pod_collect_to_vec(&self.bytes))
    }

    /// Return the element at linear index `index` as an [`f64`].
    ///
    /// Returns [`None`] if `index` is out-of-bounds.
    #[must_use]
    pub fn element_f64_at(&self, index: usize) -> Option<f64> {
        let size = self.data_type.size();
        let start = index.checked_mul(size)?;
        self.data_type.read_f64(self.bytes.get(start..)?)
    }

    /// Copy a box of `copy_shape` elements at `src_offsets` in `src` to `dst_offsets` in `dst`.
    ///
    /// Offsets are positions within each buffer, not within the variable.
    /// Two-component offsets and shapes address the single layer of the buffer.
    ///
    /// # Errors
    /// Returns a [`DataBufferError`] if the data types differ, the ranks are unsupported, or the box is out-of-bounds of either buffer.
    pub fn copy_region(
        src: &DataBuffer,
        src_offsets: &[u64],
        dst: &mut DataBuffer,
        dst_offsets: &[u64],
        copy_shape: &[u64],
    ) -> Result<(), DataBufferError> {
        if src.data_type != dst.data_type {
            return Err(DataBufferError::DataTypeMismatch {
                expected: dst.data_type,
                got: src.data_type,
            });
        }
        let runs = ContiguousRuns::new(
            &src.shapes(),
            &promote(src_offsets, 0)?,
            &dst.shapes(),
            &promote(dst_offsets, 0)?,
            &promote(copy_shape, 1)?,
        )?;
        let size = src.data_type.size();
        let run_bytes = runs.run_len_usize() * size;
        for run in &runs {
            // in bounds as validated by ContiguousRuns
            let src_start = usize::try_from(run.src).unwrap_or(usize::MAX) * size;
            let dst_start = usize::try_from(run.dst).unwrap_or(usize::MAX) * size;
            dst.bytes[dst_start..dst_start + run_bytes]
                .copy_from_slice(&src.bytes[src_start..src_start + run_bytes]);
        }
        Ok(())
    }

    /// Extract the samples of `region` (in variable coordinates) into a new buffer.
    ///
    /// # Errors
    /// Returns a [`DataBufferError`] if `region` is not inside the buffer.
    pub fn extract(&self, region: &Region) -> Result<DataBuffer, DataBufferError> {
        let region_3d =
            Region::new_with_start_shape(region.start_3d().to_vec(), region.shape_3d().to_vec())?;
        let local = region_3d.relative_to(&self.offsets())?;
        let mut out = DataBuffer::zeroed_region(self.data_type, region)?;
        DataBuffer::copy_region(self, local.start(), &mut out, &[0, 0, 0], local.shape())?;
        Ok(out)
    }
}

//! Cache tiles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::OnceCell;
use rastercache_grid::{axis_intersects, Cuboid, Region};

use crate::{CacheContext, CacheError, DataBuffer};

/// The fixed bookkeeping size reported for a rank-2 tile.
pub const TILE_HEADER_SIZE_2D: usize = 192;

/// The fixed bookkeeping size reported for a rank-3 tile.
pub const TILE_HEADER_SIZE_3D: usize = 384;

/// The representation of a cache tile.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileFamily {
    /// The tile retains its whole block in memory after the first read.
    #[default]
    Memory,
    /// The tile retains nothing and reads the requested part of its block from the provider on every copy.
    Direct,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// One fixed-location tile of a variable cache.
///
/// The bounds of a tile never change.
/// Its data is fetched from the provider at most once, on the first copy that overlaps it.
/// A failed fetch leaves the tile unpopulated, so a later read retries.
#[derive(Debug)]
pub struct CacheTile {
    region: Region,
    family: TileFamily,
    data: OnceCell<DataBuffer>,
    last_access: AtomicU64,
}

impl CacheTile {
    /// Create a new, unpopulated tile covering `region`.
    #[must_use]
    pub fn new(region: Region, family: TileFamily) -> Self {
        Self {
            region,
            family,
            data: OnceCell::new(),
            last_access: AtomicU64::new(0),
        }
    }

    /// Return the region of the variable covered by the tile.
    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Return the rank of the tile (2 or 3).
    #[must_use]
    pub fn rank(&self) -> usize {
        self.region.rank()
    }

    /// Return the tile family.
    #[must_use]
    pub fn family(&self) -> TileFamily {
        self.family
    }

    /// Return the bounding box of the tile.
    #[must_use]
    pub fn bounding_cuboid(&self) -> Cuboid {
        self.region.to_cuboid()
    }

    /// Returns true if `query` overlaps the tile.
    #[must_use]
    pub fn intersects(&self, query: &Region) -> bool {
        self.region.intersects(query)
    }

    /// Returns true if the closed range `[min, max]` overlaps the tile along `axis`.
    #[must_use]
    pub fn intersects_axis(&self, axis: usize, min: u64, max: u64) -> bool {
        let start = self.region.start().get(axis).copied();
        if let (Some(start), Some(end_inc)) = (start, self.region.end_inc()) {
            axis_intersects(start, end_inc[axis], min, max)
        } else {
            false
        }
    }

    /// Return the data of the tile if it is populated.
    #[must_use]
    pub fn data(&self) -> Option<&DataBuffer> {
        self.data.get()
    }

    /// Returns true if the tile holds its data.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.data.get().is_some()
    }

    /// Return the time of the last successful population or copy, in milliseconds since the UNIX epoch.
    ///
    /// Returns 0 if the tile has never been accessed.
    #[must_use]
    pub fn last_access(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        self.last_access.fetch_max(now_millis(), Ordering::Relaxed);
    }

    /// Return the size of the tile in bytes: a fixed header plus the size of its data if populated.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        let header = if self.rank() == 3 {
            TILE_HEADER_SIZE_3D
        } else {
            TILE_HEADER_SIZE_2D
        };
        header + self.data.get().map_or(0, DataBuffer::size_in_bytes)
    }

    fn populate(&self, context: &CacheContext) -> Result<&DataBuffer, CacheError> {
        let data = self.data.get_or_try_init(|| {
            let block = context.read_block(&self.region, None)?;
            log::debug!(
                "populated tile {} of `{}` ({} bytes)",
                self.region,
                context.descriptor().name(),
                block.size_in_bytes()
            );
            Ok::<_, CacheError>(block)
        })?;
        self.touch();
        Ok(data)
    }

    /// Populate the tile from the provider of `context` if it is not yet populated.
    ///
    /// Concurrent callers block until the single fetch completes.
    /// [`TileFamily::Direct`] tiles are never populated.
    ///
    /// # Errors
    /// Returns a [`CacheError`] if the provider fails or returns a mismatched block.
    pub fn ensure_data(&self, context: &CacheContext) -> Result<(), CacheError> {
        match self.family {
            TileFamily::Memory => self.populate(context).map(|_| ()),
            TileFamily::Direct => Ok(()),
        }
    }

    /// Copy the part of `request` covered by the tile into `target`.
    ///
    /// `target` is located in variable coordinates by its offsets.
    /// A rank-2 target receiving part of a rank-3 request takes the layer of the request as its layer origin.
    /// Returns the number of elements copied, which is zero if the tile does not overlap `request`.
    ///
    /// # Errors
    /// Returns a [`CacheError`] if the tile cannot be populated, the data types differ, or the overlap falls outside of `target`.
    pub fn copy_data(
        &self,
        context: &CacheContext,
        request: &Region,
        target: &mut DataBuffer,
    ) -> Result<u64, CacheError> {
        let overlap = self.region.overlap(request)?;
        if overlap.is_empty() {
            return Ok(0);
        }

        let mut origin = target.offsets();
        if target.rank() == 2 {
            origin[0] = request.start_3d()[0];
        }
        let overlap_3d =
            Region::new_with_start_shape(overlap.start_3d().to_vec(), overlap.shape_3d().to_vec())?;
        let dst = overlap_3d.relative_to(&origin)?;

        match self.family {
            TileFamily::Memory => {
                let data = self.populate(context)?;
                let src = overlap_3d.relative_to(&self.region.start_3d())?;
                DataBuffer::copy_region(data, src.start(), target, dst.start(), dst.shape())?;
            }
            TileFamily::Direct => {
                let block = context.read_block(&overlap, None)?;
                DataBuffer::copy_region(&block, &[0, 0, 0], target, dst.start(), dst.shape())?;
                self.touch();
            }
        }
        log::trace!(
            "copied {overlap} of tile {} of `{}`",
            self.region,
            context.descriptor().name()
        );
        Ok(overlap.num_elements())
    }
}

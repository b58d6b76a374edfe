use rastercache_grid::{Region, RegionError, TileGrid};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    CacheContext, CacheError, CacheTile, CacheTileFactory, DataBuffer, DataBufferError,
    TileFamily, VariableDescriptor,
};

/// The tile grid of one variable.
///
/// Every tile of the grid is created when the cache is constructed, so tiles are addressable by grid index before any data is read.
/// Tile data is fetched from the provider on the first read that overlaps a tile.
#[derive(Debug)]
pub struct VariableCache {
    context: CacheContext,
    grid: TileGrid,
    tiles: Vec<CacheTile>,
    parallel_population: bool,
}

impl VariableCache {
    /// Create a new variable cache and its tile grid.
    ///
    /// The rank of the cache follows the descriptor: rank 3 if the variable has more than one layer, otherwise rank 2.
    ///
    /// # Errors
    /// Returns [`CacheError::TileGrid`] if the tile grid cannot be created from the descriptor.
    pub fn new(context: CacheContext, factory: &CacheTileFactory) -> Result<Self, CacheError> {
        let descriptor = context.descriptor();
        let tile_shape = descriptor.tile_shape(&factory.default_tile_shape());
        if !descriptor.has_tile_shape() {
            log::warn!(
                "variable `{}` has no tile shape, using {tile_shape:?}",
                descriptor.name()
            );
        }
        let grid = TileGrid::new(descriptor.array_shape(), tile_shape)?;
        let tiles: Vec<CacheTile> = grid
            .iter_tile_regions()
            .map(|region| factory.create_tile(region))
            .collect();
        log::debug!(
            "built {:?} cache of `{}` with {} tiles of {:?} in a {:?} grid",
            factory.family(),
            descriptor.name(),
            tiles.len(),
            grid.tile_shape(),
            grid.grid_shape()
        );
        Ok(Self {
            context,
            grid,
            tiles,
            parallel_population: factory.parallel_population(),
        })
    }

    /// Return the variable descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &VariableDescriptor {
        self.context.descriptor()
    }

    /// Return the context lent to the tiles.
    #[must_use]
    pub fn context(&self) -> &CacheContext {
        &self.context
    }

    /// Return the rank of the cache (2 or 3).
    #[must_use]
    pub fn rank(&self) -> usize {
        self.grid.rank()
    }

    /// Return the tile grid.
    #[must_use]
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Return the number of tiles along each axis.
    #[must_use]
    pub fn grid_shape(&self) -> &[u64] {
        self.grid.grid_shape()
    }

    /// Return the tiles in C order of their grid indices.
    #[must_use]
    pub fn tiles(&self) -> &[CacheTile] {
        &self.tiles
    }

    /// Return the number of tiles.
    #[must_use]
    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Return the number of populated tiles.
    #[must_use]
    pub fn num_populated(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_populated()).count()
    }

    /// Return the tile at `grid_indices`.
    #[must_use]
    pub fn tile(&self, grid_indices: &[u64]) -> Option<&CacheTile> {
        let index = self.grid.linear_index(grid_indices)?;
        self.tiles.get(usize::try_from(index).ok()?)
    }

    /// Return the position in [`tiles`](VariableCache::tiles) of the tile containing the element at `indices`.
    #[must_use]
    pub fn tile_index_containing(&self, indices: &[u64]) -> Option<usize> {
        let grid_indices = self.grid.grid_indices_of(indices)?;
        let index = self.grid.linear_index(&grid_indices)?;
        usize::try_from(index).ok()
    }

    /// Return the tile containing the element at `indices`.
    #[must_use]
    pub fn tile_containing(&self, indices: &[u64]) -> Option<&CacheTile> {
        self.tiles.get(self.tile_index_containing(indices)?)
    }

    /// Return the tiles intersecting `region`.
    ///
    /// The grid is scanned exhaustively.
    #[must_use]
    pub fn intersecting_tiles(&self, region: &Region) -> Vec<&CacheTile> {
        self.tiles
            .iter()
            .filter(|tile| tile.intersects(region))
            .collect()
    }

    /// Return the total size of the tiles in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        self.tiles
            .iter()
            .map(|tile| tile.size_in_bytes() as u64)
            .sum()
    }

    fn populate(&self, tiles: &[&CacheTile]) -> Result<(), CacheError> {
        let pending: Vec<&CacheTile> = tiles
            .iter()
            .copied()
            .filter(|tile| tile.family() == TileFamily::Memory && !tile.is_populated())
            .collect();
        if self.parallel_population && pending.len() > 1 {
            pending
                .par_iter()
                .try_for_each(|tile| tile.ensure_data(&self.context))
        } else {
            pending
                .iter()
                .try_for_each(|tile| tile.ensure_data(&self.context))
        }
    }

    /// Check that `target` can receive `bounded`, the part of a request inside the variable.
    fn check_target(bounded: &Region, target: &DataBuffer) -> Result<(), DataBufferError> {
        let mut origin = target.offsets();
        if target.rank() == 2 {
            origin[0] = bounded.start_3d()[0];
        }
        let destination = Region::new_with_start_shape(origin.to_vec(), target.shapes().to_vec())?;
        let bounded_3d =
            Region::new_with_start_shape(bounded.start_3d().to_vec(), bounded.shape_3d().to_vec())?;
        if bounded_3d.inbounds(&destination) {
            Ok(())
        } else {
            Err(DataBufferError::RegionNotContained {
                region: bounded.clone(),
                buffer: target.region().clone(),
            })
        }
    }

    /// Read `region` of the variable into `target`.
    ///
    /// `target` is located in variable coordinates by its offsets and must contain the part of `region` inside the variable.
    /// A rank-2 `target` may receive a single layer of a rank-3 region.
    /// The parts of `region` outside of the variable are not copied, so a region entirely outside leaves `target` unmodified.
    ///
    /// # Errors
    /// Returns a [`CacheError`] if
    ///  - the rank of `region` does not match the rank of the variable,
    ///  - the data type of `target` does not match the variable,
    ///  - a tile cannot be populated, or
    ///  - `target` does not contain the requested part of the variable.
    pub fn read(&self, region: &Region, target: &mut DataBuffer) -> Result<(), CacheError> {
        if region.rank() != self.rank() {
            return Err(RegionError::IncompatibleDimensionality {
                got: region.rank(),
                expected: self.rank(),
            }
            .into());
        }
        let data_type = self.descriptor().data_type();
        if target.data_type() != data_type {
            return Err(DataBufferError::DataTypeMismatch {
                expected: data_type,
                got: target.data_type(),
            }
            .into());
        }

        let tiles = self.intersecting_tiles(region);
        if tiles.is_empty() {
            log::trace!(
                "region {region} is outside of `{}`",
                self.descriptor().name()
            );
            return Ok(());
        }
        Self::check_target(&region.bound(self.grid.array_shape())?, target)?;
        self.populate(&tiles)?;
        for tile in tiles {
            tile.copy_data(&self.context, region, target)?;
        }
        Ok(())
    }

    /// Read `region` of the variable into a new buffer located at `region`.
    ///
    /// Elements of `region` outside of the variable are zero.
    ///
    /// # Errors
    /// See [`read`](VariableCache::read).
    pub fn read_region(&self, region: &Region) -> Result<DataBuffer, CacheError> {
        let mut target = DataBuffer::zeroed_region(self.descriptor().data_type(), region)?;
        self.read(region, &mut target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::provider::{MemoryDataProvider, PerformanceMetricsProvider};
    use crate::DataType;

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn variable_cache(
        descriptor: VariableDescriptor,
        factory: &CacheTileFactory,
    ) -> (Arc<PerformanceMetricsProvider<MemoryDataProvider>>, VariableCache) {
        let shape = descriptor.array_shape();
        let num_elements: u64 = shape.iter().product();
        let elements: Vec<i32> = (0..num_elements).map(|i| i as i32).collect();
        let data = DataBuffer::from_elements(&vec![0; shape.len()], &shape, &elements).unwrap();
        let memory = Arc::new(MemoryDataProvider::new());
        memory.add_variable(descriptor.clone(), data).unwrap();
        let provider = Arc::new(PerformanceMetricsProvider::new(memory));
        let context = factory.create_context(Arc::new(descriptor), provider.clone());
        (provider, VariableCache::new(context, factory).unwrap())
    }

    fn region(start: &[u64], shape: &[u64]) -> Region {
        Region::new_with_start_shape(start.to_vec(), shape.to_vec()).unwrap()
    }

    #[test]
    fn variable_cache_grid_coverage() {
        let descriptor =
            VariableDescriptor::new_3d("cube", [7, 11, 13], [3, 4, 5], DataType::Int32);
        let (provider, cache) = variable_cache(descriptor, &CacheTileFactory::default());
        assert_eq!(cache.rank(), 3);
        assert_eq!(cache.grid_shape(), &[3, 3, 3]);
        assert_eq!(cache.num_tiles(), 27);
        assert_eq!(cache.num_populated(), 0);
        assert_eq!(provider.block_reads(), 0);

        let total: u64 = cache.tiles().iter().map(|t| t.region().num_elements()).sum();
        assert_eq!(total, 7 * 11 * 13);
        for (i, a) in cache.tiles().iter().enumerate() {
            assert!(a.region().inbounds_shape(&[7, 11, 13]));
            for b in &cache.tiles()[i + 1..] {
                assert!(!a.intersects(b.region()));
            }
        }
        assert_eq!(
            cache.tile(&[2, 2, 2]).unwrap().region(),
            &region(&[6, 8, 10], &[1, 3, 3])
        );
        assert_eq!(
            cache.tile_containing(&[6, 10, 12]).unwrap().region(),
            &region(&[6, 8, 10], &[1, 3, 3])
        );
        assert_eq!(cache.tile_index_containing(&[0, 0, 5]), Some(1));
        assert!(cache.tile_containing(&[7, 0, 0]).is_none());
        assert_eq!(cache.size_in_bytes(), 27 * 384);
    }

    #[test]
    fn variable_cache_corner_read() {
        let descriptor = VariableDescriptor::new_2d("plane", [10, 10], [4, 4], DataType::Int32);
        let (provider, cache) = variable_cache(descriptor, &CacheTileFactory::default());
        assert_eq!(cache.grid_shape(), &[3, 3]);

        let request = region(&[3, 3], &[4, 4]);
        assert_eq!(cache.intersecting_tiles(&request).len(), 4);
        let out = cache.read_region(&request).unwrap();
        for grid_indices in [[0, 0], [0, 1], [1, 0], [1, 1]] {
            assert!(cache.tile(&grid_indices).unwrap().is_populated());
        }
        assert!(!cache.tile(&[2, 2]).unwrap().is_populated());
        assert_eq!(cache.num_populated(), 4);
        assert_eq!(provider.block_reads(), 4);

        let out = out.elements::<i32>().unwrap();
        assert_eq!(out[0], 33);
        assert_eq!(out[15], 66);
        assert_eq!(
            out,
            (3..7).flat_map(|r| (3..7).map(move |c| r * 10 + c)).collect::<Vec<_>>()
        );
        assert_eq!(cache.size_in_bytes(), 9 * 192 + 4 * 16 * 4);
    }

    #[test]
    fn variable_cache_read_outside() {
        let descriptor = VariableDescriptor::new_2d("plane", [10, 10], [4, 4], DataType::Int32);
        let (provider, cache) = variable_cache(descriptor, &CacheTileFactory::default());
        let request = region(&[20, 20], &[2, 2]);
        let mut target = DataBuffer::from_elements(&[20, 20], &[2, 2], &[7i32; 4]).unwrap();
        cache.read(&request, &mut target).unwrap();
        assert_eq!(target.elements::<i32>().unwrap(), vec![7; 4]);
        assert_eq!(provider.block_reads(), 0);

        // partially outside
        let out = cache.read_region(&region(&[9, 8], &[2, 4])).unwrap();
        assert_eq!(
            out.elements::<i32>().unwrap(),
            vec![98, 99, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn variable_cache_read_errors() {
        let descriptor = VariableDescriptor::new_2d("plane", [10, 10], [4, 4], DataType::Int32);
        let (_provider, cache) = variable_cache(descriptor, &CacheTileFactory::default());

        let mut target = DataBuffer::zeroed(DataType::Int32, &[0, 0, 0], &[1, 2, 2]).unwrap();
        assert!(matches!(
            cache.read(&region(&[0, 0, 0], &[1, 2, 2]), &mut target),
            Err(CacheError::Region(
                RegionError::IncompatibleDimensionality { .. }
            ))
        ));

        let mut target = DataBuffer::zeroed(DataType::Float32, &[0, 0], &[2, 2]).unwrap();
        assert!(matches!(
            cache.read(&region(&[0, 0], &[2, 2]), &mut target),
            Err(CacheError::DataBuffer(
                DataBufferError::DataTypeMismatch { .. }
            ))
        ));

        // the target does not contain the request
        let mut target = DataBuffer::zeroed(DataType::Int32, &[0, 0], &[2, 2]).unwrap();
        assert!(cache.read(&region(&[1, 1], &[2, 2]), &mut target).is_err());
    }

    #[test]
    fn variable_cache_small_target_is_untouched() {
        let descriptor = VariableDescriptor::new_2d("plane", [10, 10], [4, 4], DataType::Int32);
        let (provider, cache) = variable_cache(descriptor, &CacheTileFactory::default());
        let mut target = DataBuffer::from_elements(&[2, 2], &[4, 4], &[-1i32; 16]).unwrap();
        let err = cache
            .read(&region(&[2, 2], &[6, 6]), &mut target)
            .unwrap_err();
        assert!(matches!(err, CacheError::DataBuffer(DataBufferError::RegionNotContained { .. })));
        assert_eq!(target.elements::<i32>().unwrap(), vec![-1; 16]);
        assert_eq!(provider.block_reads(), 0);
        assert_eq!(cache.num_populated(), 0);

        // only the part inside the variable must fit
        let mut target = DataBuffer::zeroed(DataType::Int32, &[8, 8], &[2, 2]).unwrap();
        cache.read(&region(&[8, 8], &[6, 6]), &mut target).unwrap();
        assert_eq!(target.elements::<i32>().unwrap(), vec![88, 89, 98, 99]);
    }

    #[test]
    fn variable_cache_single_layer() {
        let descriptor = VariableDescriptor::new_3d("cube", [4, 6, 6], [2, 4, 4], DataType::Int32);
        let (_provider, cache) = variable_cache(descriptor, &CacheTileFactory::default());
        let mut target = DataBuffer::zeroed(DataType::Int32, &[2, 3], &[3, 3]).unwrap();
        cache
            .read(&region(&[3, 2, 3], &[1, 3, 3]), &mut target)
            .unwrap();
        assert_eq!(
            target.elements::<i32>().unwrap(),
            vec![123, 124, 125, 129, 130, 131, 135, 136, 137]
        );
    }

    #[test]
    fn variable_cache_default_tile_shape() {
        testing_logger::setup();
        let descriptor = VariableDescriptor::new_2d("untiled", [300, 20], [0, 0], DataType::Int32);
        let factory = CacheTileFactory::default().with_default_tile_shape([1, 128, 128]);
        let (_provider, cache) = variable_cache(descriptor, &factory);
        assert_eq!(cache.grid().tile_shape(), vec![128, 20]);
        assert_eq!(cache.grid_shape(), &[3, 1]);
        testing_logger::validate(|captured_logs| {
            assert!(captured_logs.iter().any(|log| log.level == log::Level::Warn
                && log.body.contains("`untiled` has no tile shape")));
        });
    }

    #[test]
    fn variable_cache_serial_population() {
        let descriptor = VariableDescriptor::new_2d("plane", [10, 10], [2, 2], DataType::Int32);
        let factory = CacheTileFactory::default().with_parallel_population(false);
        let (provider, cache) = variable_cache(descriptor, &factory);
        let out = cache.read_region(&region(&[0, 0], &[10, 10])).unwrap();
        assert_eq!(out.elements::<i32>().unwrap(), (0..100).collect::<Vec<_>>());
        assert_eq!(cache.num_populated(), 25);
        assert_eq!(provider.block_reads(), 25);

        cache.read_region(&region(&[0, 0], &[10, 10])).unwrap();
        assert_eq!(provider.block_reads(), 25);
    }
}

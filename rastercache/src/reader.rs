//! Cache-aware product readers.
//!
//! A product reader exposes the variables of a product as bands.
//! A rank-2 variable is one band named after the variable.
//! A rank-3 variable is one band per layer named `<variable>_<n>`, where `n` counts layers from 1.
//!
//! [`CachingProductReader`] serves band reads from a [`ProductCache`] registered with a [`CacheManager`].

use std::{ops::Deref, sync::Arc};

use rastercache_grid::{Region, RegionError};

use crate::{
    provider::CacheDataProvider, CacheError, CacheManager, CacheTile, CacheTileFactory,
    DataBuffer, ProductCache, StorageDimensions, VariableCache, VariableDescriptor,
};

/// The interface of a product reader serving reads through a cache.
pub trait CachedProductReader {
    /// Return the populated tile of `band` containing the window origin `(x, y)`.
    ///
    /// # Errors
    /// Returns a [`CacheError`] if the band is unknown, the window is outside of the band, or the tile cannot be populated.
    fn read_cache_tile(
        &self,
        band: &str,
        x: u64,
        y: u64,
        width: u64,
        height: u64,
    ) -> Result<CacheTileRef, CacheError>;

    /// Return the storage layout of `band`.
    ///
    /// Every value is `-1` if the band is unknown.
    fn storage_dimensions(&self, band: &str) -> StorageDimensions;
}

/// A shared handle to a tile of a [`VariableCache`].
///
/// The handle keeps the variable cache alive and dereferences to the [`CacheTile`].
#[derive(Debug, Clone)]
pub struct CacheTileRef {
    cache: Arc<VariableCache>,
    index: usize,
}

impl CacheTileRef {
    /// Create a handle to the tile at `index` of `cache`.
    ///
    /// Returns [`None`] if `index` is not a tile of `cache`.
    #[must_use]
    pub fn new(cache: Arc<VariableCache>, index: usize) -> Option<Self> {
        (index < cache.num_tiles()).then_some(Self { cache, index })
    }

    /// Return the variable cache owning the tile.
    #[must_use]
    pub fn variable_cache(&self) -> &Arc<VariableCache> {
        &self.cache
    }

    /// Return the position of the tile in [`VariableCache::tiles`].
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Deref for CacheTileRef {
    type Target = CacheTile;

    fn deref(&self) -> &CacheTile {
        &self.cache.tiles()[self.index]
    }
}

/// Return the band names of a variable.
///
/// Layer numbers of a rank-3 variable are zero padded to two digits above 10 layers and to three digits above 100 layers.
#[must_use]
pub fn layer_band_names(descriptor: &VariableDescriptor) -> Vec<String> {
    if !descriptor.is_3d() {
        return vec![descriptor.name().to_string()];
    }
    let layers = descriptor.layers();
    let digits = if layers > 100 {
        3
    } else if layers > 10 {
        2
    } else {
        1
    };
    (1..=layers)
        .map(|layer| format!("{}_{layer:0digits$}", descriptor.name()))
        .collect()
}

/// Split a layer band name `<variable>_<n>` into the variable and the layer number `n`.
fn split_layer_band(band: &str) -> Option<(&str, u64)> {
    let (variable, suffix) = band.rsplit_once('_')?;
    if variable.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let layer = suffix.parse::<u64>().ok().filter(|&layer| layer >= 1)?;
    Some((variable, layer))
}

/// Select layer `layer` (counted from 1) of a rank-3 variable cache.
fn select_layer(
    variable_cache: Arc<VariableCache>,
    layer: u64,
) -> Option<(Arc<VariableCache>, Option<u64>)> {
    let descriptor = variable_cache.descriptor();
    (descriptor.is_3d() && layer <= descriptor.layers()).then(|| (variable_cache, Some(layer - 1)))
}

/// A product reader serving band reads through a [`ProductCache`].
///
/// The product cache is registered with a [`CacheManager`] on creation and removed from it on [`close`](CachingProductReader::close) or drop.
pub struct CachingProductReader<P> {
    provider: Arc<P>,
    manager: CacheManager,
    cache: Option<Arc<ProductCache>>,
}

impl<P> std::fmt::Debug for CachingProductReader<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingProductReader")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<P: CacheDataProvider + 'static> CachingProductReader<P> {
    /// Create a new reader over `provider` with a tile factory from the [global configuration](crate::config::global_config).
    #[must_use]
    pub fn new(provider: Arc<P>, manager: &CacheManager) -> Self {
        Self::with_factory(provider, manager, CacheTileFactory::from_global())
    }

    /// Create a new reader over `provider` with an explicit tile factory.
    #[must_use]
    pub fn with_factory(
        provider: Arc<P>,
        manager: &CacheManager,
        factory: CacheTileFactory,
    ) -> Self {
        let cache = Arc::new(ProductCache::with_factory(provider.clone(), factory));
        manager.register(cache.clone());
        Self {
            provider,
            manager: manager.clone(),
            cache: Some(cache),
        }
    }
}

impl<P> CachingProductReader<P> {
    /// Return the data provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Return the product cache, or [`None`] if the reader is closed.
    #[must_use]
    pub fn product_cache(&self) -> Option<&Arc<ProductCache>> {
        self.cache.as_ref()
    }

    /// Returns true if the reader is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cache.is_none()
    }

    fn open_cache(&self) -> Result<&Arc<ProductCache>, CacheError> {
        self.cache.as_ref().ok_or(CacheError::ReaderClosed)
    }

    /// Resolve `band` to its variable cache and, for a layer band, its layer.
    ///
    /// Cached variables are consulted first, then a variable named `band`, then the variable of a layer band.
    fn resolve_band(&self, band: &str) -> Result<(Arc<VariableCache>, Option<u64>), CacheError> {
        let cache = self.open_cache()?;
        if let Some(variable_cache) = cache.cached_variable(band) {
            return Ok((variable_cache, None));
        }
        let layer_band = split_layer_band(band);
        if let Some(resolved) = layer_band.and_then(|(variable, layer)| {
            select_layer(cache.cached_variable(variable)?, layer)
        }) {
            return Ok(resolved);
        }
        let err = match cache.variable_cache(band) {
            Ok(variable_cache) => return Ok((variable_cache, None)),
            Err(err) => err,
        };
        layer_band
            .and_then(|(variable, layer)| select_layer(cache.variable_cache(variable).ok()?, layer))
            .ok_or(err)
    }

    fn band_region(
        cache: &VariableCache,
        layer: Option<u64>,
        [x, y, width, height]: [u64; 4],
    ) -> Result<Region, RegionError> {
        match (layer, cache.rank()) {
            (Some(layer), _) => {
                Region::new_with_start_shape(vec![layer, y, x], vec![1, height, width])
            }
            (None, 2) => Region::new_with_start_shape(vec![y, x], vec![height, width]),
            (None, rank) => Err(RegionError::IncompatibleDimensionality {
                got: 2,
                expected: rank,
            }),
        }
    }

    /// Return the band names of `variable`.
    ///
    /// # Errors
    /// Returns a [`CacheError`] if the reader is closed or the variable is unknown.
    pub fn band_names(&self, variable: &str) -> Result<Vec<String>, CacheError> {
        let cache = self.open_cache()?.variable_cache(variable)?;
        Ok(layer_band_names(cache.descriptor()))
    }

    /// Read the window at `(x, y)` of `width` by `height` pixels of `band` into `target`.
    ///
    /// `target` is a rank-2 buffer located in pixel coordinates by its offsets.
    ///
    /// # Errors
    /// Returns [`CacheError::ReaderClosed`] if the reader is closed, or a [`CacheError`] if the band is unknown or the read fails.
    pub fn read_band_raster_data(
        &self,
        band: &str,
        x: u64,
        y: u64,
        width: u64,
        height: u64,
        target: &mut DataBuffer,
    ) -> Result<(), CacheError> {
        let (cache, layer) = self.resolve_band(band)?;
        let region = Self::band_region(&cache, layer, [x, y, width, height])?;
        cache.read(&region, target)
    }

    /// Deregister and dispose the product cache.
    ///
    /// Later reads fail with [`CacheError::ReaderClosed`]. Closing a closed reader does nothing.
    pub fn close(&mut self) {
        if let Some(cache) = self.cache.take() {
            self.manager.remove(&cache);
        }
    }
}

impl<P> Drop for CachingProductReader<P> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<P> CachedProductReader for CachingProductReader<P> {
    fn read_cache_tile(
        &self,
        band: &str,
        x: u64,
        y: u64,
        width: u64,
        height: u64,
    ) -> Result<CacheTileRef, CacheError> {
        let (cache, layer) = self.resolve_band(band)?;
        let region = Self::band_region(&cache, layer, [x, y, width, height])?;
        let tile = cache
            .tile_index_containing(region.start())
            .and_then(|index| CacheTileRef::new(cache.clone(), index))
            .ok_or_else(|| RegionError::OutOfBounds {
                region: region.clone(),
                bounds: cache.descriptor().array_shape(),
            })?;
        tile.ensure_data(cache.context())?;
        Ok(tile)
    }

    fn storage_dimensions(&self, band: &str) -> StorageDimensions {
        let Ok((cache, _layer)) = self.resolve_band(band) else {
            return StorageDimensions::default();
        };
        let to_i64 = |value: u64| i64::try_from(value).unwrap_or(i64::MAX);
        let descriptor = cache.descriptor();
        let tile_shape = cache.grid().tile_shape();
        let (raster_layers, tile_layers) = match tile_shape.as_slice() {
            &[tile_layers, _, _] => (to_i64(descriptor.layers()), to_i64(tile_layers)),
            _ => (-1, -1),
        };
        StorageDimensions {
            raster_width: to_i64(descriptor.width()),
            raster_height: to_i64(descriptor.height()),
            raster_layers,
            tile_width: tile_shape.last().copied().map_or(-1, to_i64),
            tile_height: tile_shape.iter().rev().nth(1).copied().map_or(-1, to_i64),
            tile_layers,
        }
    }
}

use std::sync::Arc;

use rastercache_grid::Region;

use crate::{
    config::{global_config, Config},
    provider::CacheDataProviderHandle,
    CacheContext, CacheTile, TileFamily, VariableDescriptor,
};

/// Creates the tiles of variable caches.
///
/// A factory selects the [`TileFamily`] of new tiles and carries the remaining options that shape a variable cache.
/// It is usually created once per product cache with [`from_global`](CacheTileFactory::from_global).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTileFactory {
    family: TileFamily,
    default_tile_shape: [u64; 3],
    parallel_population: bool,
    validate_blocks: bool,
}

impl Default for CacheTileFactory {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CacheTileFactory {
    /// Create a tile factory for `family` with otherwise default options.
    #[must_use]
    pub fn new(family: TileFamily) -> Self {
        Self::default().with_family(family)
    }

    /// Create a tile factory from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            family: config.tile_family(),
            default_tile_shape: config.default_tile_shape(),
            parallel_population: config.parallel_population(),
            validate_blocks: config.validate_blocks(),
        }
    }

    /// Create a tile factory from a snapshot of the [global configuration](crate::config::global_config).
    #[must_use]
    pub fn from_global() -> Self {
        Self::from_config(&global_config())
    }

    /// Set the tile family.
    #[must_use]
    pub fn with_family(mut self, family: TileFamily) -> Self {
        self.family = family;
        self
    }

    /// Set the default tile shape `[layers, rows, cols]`. Zero extents are treated as 1.
    #[must_use]
    pub fn with_default_tile_shape(mut self, default_tile_shape: [u64; 3]) -> Self {
        self.default_tile_shape = default_tile_shape.map(|extent| extent.max(1));
        self
    }

    /// Set whether tiles are populated in parallel.
    #[must_use]
    pub fn with_parallel_population(mut self, parallel_population: bool) -> Self {
        self.parallel_population = parallel_population;
        self
    }

    /// Set whether provider blocks are validated.
    #[must_use]
    pub fn with_validate_blocks(mut self, validate_blocks: bool) -> Self {
        self.validate_blocks = validate_blocks;
        self
    }

    /// Return the tile family.
    #[must_use]
    pub fn family(&self) -> TileFamily {
        self.family
    }

    /// Return the default tile shape `[layers, rows, cols]`.
    #[must_use]
    pub fn default_tile_shape(&self) -> [u64; 3] {
        self.default_tile_shape
    }

    /// Returns true if tiles are populated in parallel.
    #[must_use]
    pub fn parallel_population(&self) -> bool {
        self.parallel_population
    }

    /// Returns true if provider blocks are validated.
    #[must_use]
    pub fn validate_blocks(&self) -> bool {
        self.validate_blocks
    }

    /// Create an unpopulated tile covering `region`.
    #[must_use]
    pub fn create_tile(&self, region: Region) -> CacheTile {
        CacheTile::new(region, self.family)
    }

    /// Create the context a variable cache lends to its tiles.
    #[must_use]
    pub fn create_context(
        &self,
        descriptor: Arc<VariableDescriptor>,
        provider: CacheDataProviderHandle,
    ) -> CacheContext {
        CacheContext::new(descriptor, provider).with_validate_blocks(self.validate_blocks)
    }
}

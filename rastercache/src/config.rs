//! `rastercache` global runtime configuration.
//!
//! See [`Config`] for the list of options.

use std::sync::OnceLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::TileFamily;

/// Global configuration options for the `rastercache` crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// The configuration is read when a [`CacheTileFactory`](crate::CacheTileFactory) is created with [`from_global`](crate::CacheTileFactory::from_global),
/// so changes only affect product caches created afterwards.
///
/// ## Tile Family
/// > default: [`TileFamily::Memory`]
///
/// The representation of newly created tiles.
/// [`TileFamily::Direct`] tiles do not retain data and read every request straight from the provider.
///
/// ## Default Tile Shape
/// > default: `[1, 256, 256]`
///
/// The tile shape `[layers, rows, cols]` used for a variable whose descriptor does not carry a tile extent.
///
/// ## Parallel Population
/// > default: [`true`]
///
/// If true, a read touching several unpopulated tiles populates them concurrently on the rayon thread pool.
///
/// ## Validate Blocks
/// > default: [`true`]
///
/// If true, blocks returned by a provider are checked against the requested shape and the variable data type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    tile_family: TileFamily,
    default_tile_shape: [u64; 3],
    parallel_population: bool,
    validate_blocks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tile_family: TileFamily::Memory,
            default_tile_shape: [1, 256, 256],
            parallel_population: true,
            validate_blocks: true,
        }
    }
}

impl Config {
    /// Get the [tile family](#tile-family) configuration.
    #[must_use]
    pub fn tile_family(&self) -> TileFamily {
        self.tile_family
    }

    /// Set the [tile family](#tile-family) configuration.
    pub fn set_tile_family(&mut self, tile_family: TileFamily) -> &mut Self {
        self.tile_family = tile_family;
        self
    }

    /// Get the [default tile shape](#default-tile-shape) configuration.
    #[must_use]
    pub fn default_tile_shape(&self) -> [u64; 3] {
        self.default_tile_shape
    }

    /// Set the [default tile shape](#default-tile-shape) configuration.
    ///
    /// Zero extents are treated as 1.
    pub fn set_default_tile_shape(&mut self, default_tile_shape: [u64; 3]) -> &mut Self {
        self.default_tile_shape = default_tile_shape.map(|extent| extent.max(1));
        self
    }

    /// Get the [parallel population](#parallel-population) configuration.
    #[must_use]
    pub fn parallel_population(&self) -> bool {
        self.parallel_population
    }

    /// Set the [parallel population](#parallel-population) configuration.
    pub fn set_parallel_population(&mut self, parallel_population: bool) -> &mut Self {
        self.parallel_population = parallel_population;
        self
    }

    /// Get the [validate blocks](#validate-blocks) configuration.
    #[must_use]
    pub fn validate_blocks(&self) -> bool {
        self.validate_blocks
    }

    /// Set the [validate blocks](#validate-blocks) configuration.
    pub fn set_validate_blocks(&mut self, validate_blocks: bool) -> &mut Self {
        self.validate_blocks = validate_blocks;
        self
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global `rastercache` configuration.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global `rastercache` configuration.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).write()
}

//! `rastercache` is a tiled, demand-paged cache for rank-2 and rank-3 raster variables.
//!
//! Scientific image products store their bands as named variables (`rows × cols` or `layers × rows × cols`) in file formats that are slow to read.
//! Readers request the same or neighbouring windows of a variable over and over.
//! `rastercache` partitions each variable into a regular grid of tiles, reads a tile from the backing store on the first request that touches it, and serves every later overlapping request from memory.
//!
//! ## Overview
//! - A [`CacheDataProvider`](provider::CacheDataProvider) describes variables and performs bounded reads from the backing store.
//! - A [`ProductCache`] holds one [`VariableCache`] per variable of an open product, created on first read.
//! - A [`VariableCache`] owns the [`CacheTile`]s of one variable, created eagerly with clipped boundary tiles.
//! - A [`CacheTile`] fetches its block from the provider at most once, even under concurrent reads.
//! - A [`CacheManager`] tracks the product caches of a process and reports their memory use.
//! - A [`CachingProductReader`](reader::CachingProductReader) serves band reads through a product cache.
//!
//! Tile behaviour is selected by a [`CacheTileFactory`], usually built from the [global configuration](config::global_config).
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! use rastercache::{
//!     provider::MemoryDataProvider, CacheManager, DataBuffer, DataType, ProductCache,
//!     VariableDescriptor,
//! };
//!
//! let provider = Arc::new(MemoryDataProvider::new());
//! let elements: Vec<u16> = (0..100).collect();
//! provider.add_variable(
//!     VariableDescriptor::new_2d("radiance", [10, 10], [4, 4], DataType::UInt16),
//!     DataBuffer::from_elements(&[0, 0], &[10, 10], &elements)?,
//! )?;
//!
//! let manager = CacheManager::new();
//! let cache = Arc::new(ProductCache::new(provider));
//! manager.register(cache.clone());
//!
//! // rows 3-6, cols 3-6 touch the four tiles meeting at (4, 4)
//! let mut target = DataBuffer::zeroed(DataType::UInt16, &[3, 3], &[4, 4])?;
//! cache.read("radiance", &[3, 3], &[4, 4], &mut target)?;
//! assert_eq!(target.elements::<u16>()?[0], 33);
//! assert_eq!(cache.variable_cache("radiance")?.num_populated(), 4);
//! assert_eq!(manager.size_in_bytes(), 9 * 192 + 4 * 16 * 2);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Logging
//! `rastercache` logs through the [`log`](https://docs.rs/log) facade and installs no logger.
//! Tile population and variable cache construction are logged at `debug` level, and copies at `trace` level.
//!
//! ## Licence
//! `rastercache` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.
#![warn(clippy::wildcard_enum_match_arm)]

pub mod config;
pub mod provider;
pub mod reader;

mod cache_context;
mod cache_error;
mod cache_tile;
mod data_buffer;
mod data_type;
mod descriptor;
mod manager;
mod product_cache;
mod tile_factory;
mod variable_cache;

pub use cache_context::CacheContext;
pub use cache_error::CacheError;
pub use cache_tile::{CacheTile, TileFamily, TILE_HEADER_SIZE_2D, TILE_HEADER_SIZE_3D};
pub use data_buffer::{DataBuffer, DataBufferError};
pub use data_type::{DataType, Element};
pub use descriptor::{StorageDimensions, VariableDescriptor};
pub use manager::CacheManager;
pub use product_cache::ProductCache;
pub use tile_factory::CacheTileFactory;
pub use variable_cache::VariableCache;

pub use rastercache_grid as grid;
pub use rastercache_grid::{Cuboid, Region};

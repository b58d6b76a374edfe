use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use rastercache_grid::Region;

use crate::{
    provider::CacheDataProviderHandle, CacheError, CacheTileFactory, DataBuffer, VariableCache,
};

static NEXT_PRODUCT_CACHE_ID: AtomicU64 = AtomicU64::new(0);

/// The variable caches of one open product.
///
/// A [`VariableCache`] is created for a variable on its first read.
/// Concurrent first reads of the same variable construct at most one cache.
pub struct ProductCache {
    id: u64,
    provider: CacheDataProviderHandle,
    factory: CacheTileFactory,
    variables: moka::sync::Cache<String, Arc<VariableCache>>,
}

impl std::fmt::Debug for ProductCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductCache")
            .field("id", &self.id)
            .field("factory", &self.factory)
            .field("variables", &self.variable_names())
            .finish_non_exhaustive()
    }
}

impl ProductCache {
    /// Create a new product cache with a tile factory from the [global configuration](crate::config::global_config).
    #[must_use]
    pub fn new(provider: CacheDataProviderHandle) -> Self {
        Self::with_factory(provider, CacheTileFactory::from_global())
    }

    /// Create a new product cache with an explicit tile factory.
    #[must_use]
    pub fn with_factory(provider: CacheDataProviderHandle, factory: CacheTileFactory) -> Self {
        Self {
            id: NEXT_PRODUCT_CACHE_ID.fetch_add(1, Ordering::Relaxed),
            provider,
            factory,
            variables: moka::sync::Cache::builder().build(),
        }
    }

    /// Return the process-unique identifier of the cache.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Return the data provider.
    #[must_use]
    pub fn provider(&self) -> &CacheDataProviderHandle {
        &self.provider
    }

    /// Return the tile factory.
    #[must_use]
    pub fn factory(&self) -> &CacheTileFactory {
        &self.factory
    }

    /// Return the cache of variable `name`, creating it if absent.
    ///
    /// A failed creation is not cached, so a later call asks the provider again.
    ///
    /// # Errors
    /// Returns [`CacheError::DescriptorUnavailable`] if the provider cannot describe the variable or the descriptor is invalid,
    /// or [`CacheError::TileGrid`] if the tile grid cannot be created.
    pub fn variable_cache(&self, name: &str) -> Result<Arc<VariableCache>, CacheError> {
        self.variables
            .try_get_with(name.to_string(), || {
                let descriptor = self
                    .provider
                    .variable_descriptor(name)
                    .and_then(|descriptor| descriptor.validate().map(|()| descriptor))
                    .map_err(|source| CacheError::DescriptorUnavailable {
                        variable: name.to_string(),
                        source,
                    })?;
                let context = self
                    .factory
                    .create_context(Arc::new(descriptor), self.provider.clone());
                VariableCache::new(context, &self.factory).map(Arc::new)
            })
            .map_err(|err| Arc::try_unwrap(err).unwrap_or_else(|err| (*err).clone()))
    }

    /// Return the cache of variable `name` if it has been created.
    #[must_use]
    pub fn cached_variable(&self, name: &str) -> Option<Arc<VariableCache>> {
        self.variables.get(name)
    }

    /// Read the region of variable `name` at `offsets` with `shapes` into `target`.
    ///
    /// `offsets` and `shapes` are `[row, col]` for rank-2 variables and `[layer, row, col]` for rank-3 variables.
    ///
    /// # Errors
    /// Returns a [`CacheError`] if the region is invalid, the variable cache cannot be created, or the read fails.
    /// See [`VariableCache::read`].
    pub fn read(
        &self,
        name: &str,
        offsets: &[u64],
        shapes: &[u64],
        target: &mut DataBuffer,
    ) -> Result<(), CacheError> {
        let region = Region::new_with_start_shape(offsets.to_vec(), shapes.to_vec())?;
        self.variable_cache(name)?.read(&region, target)
    }

    /// Read `region` of variable `name` into a new buffer.
    ///
    /// # Errors
    /// See [`read`](ProductCache::read).
    pub fn read_region(&self, name: &str, region: &Region) -> Result<DataBuffer, CacheError> {
        self.variable_cache(name)?.read_region(region)
    }

    /// Return the names of the cached variables in lexicographical order.
    #[must_use]
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .variables
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        names.sort();
        names
    }

    /// Return the total size of the cached variables in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        self.variables
            .iter()
            .map(|(_, cache)| cache.size_in_bytes())
            .sum()
    }

    /// Drop every variable cache and its tiles.
    ///
    /// The product cache stays usable: later reads rebuild variable caches on demand.
    pub fn dispose(&self) {
        self.variables.invalidate_all();
        self.variables.run_pending_tasks();
        log::info!("disposed product cache {}", self.id);
    }
}

use std::sync::Arc;

use parking_lot::Mutex;

use crate::ProductCache;

/// A registry of live product caches.
///
/// The manager aggregates the memory used by every registered [`ProductCache`] and disposes them on demand.
/// It is a cheaply cloneable handle: clones share the same registry.
/// Applications conventionally create one manager per process and pass it to every product reader.
#[derive(Debug, Clone, Default)]
pub struct CacheManager {
    caches: Arc<Mutex<Vec<Arc<ProductCache>>>>,
}

impl CacheManager {
    /// Create a new, empty cache manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `cache`.
    ///
    /// A cache that is already registered is not added twice.
    pub fn register(&self, cache: Arc<ProductCache>) {
        let mut caches = self.caches.lock();
        if !caches.iter().any(|registered| Arc::ptr_eq(registered, &cache)) {
            log::info!("registered product cache {}", cache.id());
            caches.push(cache);
        }
    }

    /// Deregister and dispose `cache`.
    ///
    /// Returns true if `cache` was registered.
    pub fn remove(&self, cache: &Arc<ProductCache>) -> bool {
        let removed = {
            let mut caches = self.caches.lock();
            let len = caches.len();
            caches.retain(|registered| !Arc::ptr_eq(registered, cache));
            caches.len() != len
        };
        if removed {
            cache.dispose();
            log::info!("removed product cache {}", cache.id());
        }
        removed
    }

    /// Return the total size of the registered caches in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        self.caches.lock().iter().map(|cache| cache.size_in_bytes()).sum()
    }

    /// Dispose every registered cache without deregistering it.
    pub fn dispose(&self) {
        let caches = self.caches.lock();
        for cache in caches.iter() {
            cache.dispose();
        }
        log::info!("disposed {} product caches", caches.len());
    }

    /// Dispose and deregister every cache.
    pub fn clear(&self) {
        let caches = std::mem::take(&mut *self.caches.lock());
        for cache in &caches {
            cache.dispose();
        }
    }

    /// Return the number of registered caches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.lock().len()
    }

    /// Returns true if no cache is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.lock().is_empty()
    }
}

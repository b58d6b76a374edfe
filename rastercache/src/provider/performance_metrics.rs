//! A provider adapter which records performance metrics.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;

use super::{CacheDataProvider, ProviderError};
use crate::{DataBuffer, VariableDescriptor};

type BlockKey = (String, Vec<u64>, Vec<u64>);

/// The performance metrics provider adapter. Accumulates metrics, such as the number of block reads and bytes read.
///
/// It is intended to aid in testing by allowing the application to validate that metrics (e.g., block reads of a tile) match expected values for specific operations.
///
/// ### Example
/// ```rust
/// # use std::sync::Arc;
/// # use rastercache::provider::{MemoryDataProvider, PerformanceMetricsProvider};
/// let provider = Arc::new(MemoryDataProvider::new());
/// let provider = Arc::new(PerformanceMetricsProvider::new(provider));
/// // do some reads...
/// // assert_eq!(provider.block_reads(), ...);
/// // assert_eq!(provider.block_reads_of("var", &[0, 0], &[256, 256]), ...);
/// ```
#[derive(Debug)]
pub struct PerformanceMetricsProvider<TProvider: ?Sized> {
    provider: Arc<TProvider>,
    descriptor_requests: AtomicUsize,
    block_reads: AtomicUsize,
    elements_read: AtomicUsize,
    bytes_read: AtomicUsize,
    block_reads_by_region: Mutex<HashMap<BlockKey, usize>>,
}

impl<TProvider: ?Sized> PerformanceMetricsProvider<TProvider> {
    /// Create a new performance metrics provider adapter.
    #[must_use]
    pub fn new(provider: Arc<TProvider>) -> Self {
        Self {
            provider,
            descriptor_requests: AtomicUsize::default(),
            block_reads: AtomicUsize::default(),
            elements_read: AtomicUsize::default(),
            bytes_read: AtomicUsize::default(),
            block_reads_by_region: Mutex::default(),
        }
    }

    /// Return the wrapped provider.
    #[must_use]
    pub fn inner(&self) -> &Arc<TProvider> {
        &self.provider
    }

    /// Reset the performance metrics.
    pub fn reset(&self) {
        self.descriptor_requests.store(0, Ordering::Relaxed);
        self.block_reads.store(0, Ordering::Relaxed);
        self.elements_read.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.block_reads_by_region.lock().clear();
    }

    /// Returns the number of descriptor requests.
    pub fn descriptor_requests(&self) -> usize {
        self.descriptor_requests.load(Ordering::Relaxed)
    }

    /// Returns the number of successful block reads.
    pub fn block_reads(&self) -> usize {
        self.block_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of elements read.
    pub fn elements_read(&self) -> usize {
        self.elements_read.load(Ordering::Relaxed)
    }

    /// Returns the number of bytes read.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Returns the number of successful block reads of variable `name` with exactly `offsets` and `shapes`.
    pub fn block_reads_of(&self, name: &str, offsets: &[u64], shapes: &[u64]) -> usize {
        self.block_reads_by_region
            .lock()
            .get(&(name.to_string(), offsets.to_vec(), shapes.to_vec()))
            .copied()
            .unwrap_or_default()
    }
}

impl<TProvider: ?Sized + CacheDataProvider> CacheDataProvider
    for PerformanceMetricsProvider<TProvider>
{
    fn variable_descriptor(&self, name: &str) -> Result<VariableDescriptor, ProviderError> {
        self.descriptor_requests.fetch_add(1, Ordering::Relaxed);
        self.provider.variable_descriptor(name)
    }

    fn read_cache_block(
        &self,
        name: &str,
        offsets: &[u64],
        shapes: &[u64],
        reusable: Option<DataBuffer>,
    ) -> Result<DataBuffer, ProviderError> {
        let block = self
            .provider
            .read_cache_block(name, offsets, shapes, reusable)?;
        self.block_reads.fetch_add(1, Ordering::Relaxed);
        self.elements_read.fetch_add(
            usize::try_from(block.num_elements()).unwrap_or(usize::MAX),
            Ordering::Relaxed,
        );
        self.bytes_read
            .fetch_add(block.size_in_bytes(), Ordering::Relaxed);
        *self
            .block_reads_by_region
            .lock()
            .entry((name.to_string(), offsets.to_vec(), shapes.to_vec()))
            .or_default() += 1;
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryDataProvider;
    use crate::DataType;

    #[test]
    fn performance_metrics() {
        let memory = Arc::new(MemoryDataProvider::new());
        let descriptor =
            VariableDescriptor::new_3d("cube", [2, 4, 4], [1, 2, 2], DataType::Float64);
        let data = DataBuffer::zeroed(DataType::Float64, &[0, 0, 0], &[2, 4, 4]).unwrap();
        memory.add_variable(descriptor, data).unwrap();
        let provider = PerformanceMetricsProvider::new(memory);

        provider.variable_descriptor("cube").unwrap();
        provider
            .read_cache_block("cube", &[0, 0, 0], &[1, 2, 2], None)
            .unwrap();
        provider
            .read_cache_block("cube", &[0, 0, 0], &[1, 2, 2], None)
            .unwrap();
        provider
            .read_cache_block("cube", &[1, 2, 2], &[1, 2, 2], None)
            .unwrap();
        assert!(provider
            .read_cache_block("cube", &[2, 0, 0], &[1, 2, 2], None)
            .is_err());

        assert_eq!(provider.descriptor_requests(), 1);
        assert_eq!(provider.block_reads(), 3);
        assert_eq!(provider.elements_read(), 12);
        assert_eq!(provider.bytes_read(), 96);
        assert_eq!(provider.block_reads_of("cube", &[0, 0, 0], &[1, 2, 2]), 2);
        assert_eq!(provider.block_reads_of("cube", &[1, 2, 2], &[1, 2, 2]), 1);
        assert_eq!(provider.block_reads_of("cube", &[2, 0, 0], &[1, 2, 2]), 0);

        provider.reset();
        assert_eq!(provider.block_reads(), 0);
        assert_eq!(provider.block_reads_of("cube", &[0, 0, 0], &[1, 2, 2]), 0);
    }
}

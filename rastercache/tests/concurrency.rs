#![allow(missing_docs)]

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rastercache::grid::Region;
use rastercache::provider::{
    CacheDataProvider, MemoryDataProvider, PerformanceMetricsProvider, ProviderError,
};
use rastercache::{
    CacheManager, CacheTileFactory, DataBuffer, DataType, ProductCache, VariableDescriptor,
};

/// Delays every call to widen the window for racing readers.
struct SlowProvider {
    inner: MemoryDataProvider,
    delay: Duration,
}

impl CacheDataProvider for SlowProvider {
    fn variable_descriptor(&self, name: &str) -> Result<VariableDescriptor, ProviderError> {
        thread::sleep(self.delay);
        self.inner.variable_descriptor(name)
    }

    fn read_cache_block(
        &self,
        name: &str,
        offsets: &[u64],
        shapes: &[u64],
        reusable: Option<DataBuffer>,
    ) -> Result<DataBuffer, ProviderError> {
        thread::sleep(self.delay);
        self.inner.read_cache_block(name, offsets, shapes, reusable)
    }
}

fn slow_provider() -> Arc<PerformanceMetricsProvider<SlowProvider>> {
    let inner = MemoryDataProvider::new();
    let elements: Vec<u32> = (0..64 * 64).collect();
    inner
        .add_variable(
            VariableDescriptor::new_2d("var", [64, 64], [16, 16], DataType::UInt32),
            DataBuffer::from_elements(&[0, 0], &[64, 64], &elements).unwrap(),
        )
        .unwrap();
    let cube: Vec<u32> = (0..4 * 32 * 32).collect();
    inner
        .add_variable(
            VariableDescriptor::new_3d("cube", [4, 32, 32], [2, 16, 16], DataType::UInt32),
            DataBuffer::from_elements(&[0, 0, 0], &[4, 32, 32], &cube).unwrap(),
        )
        .unwrap();
    Arc::new(PerformanceMetricsProvider::new(Arc::new(SlowProvider {
        inner,
        delay: Duration::from_millis(20),
    })))
}

#[test]
fn concurrent_population_at_most_once() {
    const THREADS: usize = 16;
    let provider = slow_provider();
    let cache = ProductCache::with_factory(provider.clone(), CacheTileFactory::default());
    let barrier = Barrier::new(THREADS);

    // every thread touches tile (1, 1) and some of its neighbours
    thread::scope(|s| {
        for i in 0..THREADS as u64 {
            let (cache, barrier) = (&cache, &barrier);
            s.spawn(move || {
                barrier.wait();
                let start = 12 + i % 4;
                let region = Region::new_with_start_shape(vec![start, 20], vec![8, 8]).unwrap();
                let out = cache.read_region("var", &region).unwrap();
                let out = out.elements::<u32>().unwrap();
                #[allow(clippy::cast_possible_truncation)]
                let expected = (start * 64 + 20) as u32;
                assert_eq!(out[0], expected);
            });
        }
    });

    assert_eq!(provider.descriptor_requests(), 1);
    assert_eq!(provider.block_reads_of("var", &[16, 16], &[16, 16]), 1);
    assert_eq!(provider.block_reads_of("var", &[0, 16], &[16, 16]), 1);
    assert_eq!(provider.block_reads_of("var", &[16, 0], &[16, 16]), 0);
    let variable = cache.variable_cache("var").unwrap();
    assert_eq!(provider.block_reads(), variable.num_populated());
    assert_eq!(variable.num_populated(), 2);
}

#[test]
fn concurrent_variables_and_products() {
    let provider = slow_provider();
    let manager = CacheManager::new();
    let caches: Vec<Arc<ProductCache>> = (0..2)
        .map(|_| {
            let cache = Arc::new(ProductCache::with_factory(
                provider.clone(),
                CacheTileFactory::default(),
            ));
            manager.register(cache.clone());
            cache
        })
        .collect();

    thread::scope(|s| {
        for cache in &caches {
            for name in ["var", "cube"] {
                s.spawn(move || {
                    let shape = if name == "var" {
                        vec![64, 64]
                    } else {
                        vec![4, 32, 32]
                    };
                    let region = Region::new_with_shape(shape).unwrap();
                    let out = cache.read_region(name, &region).unwrap();
                    let out = out.elements::<u32>().unwrap();
                    assert!(out.iter().enumerate().all(|(i, &v)| v as usize == i));
                });
            }
        }
    });

    // each product cache populates each tile once
    assert_eq!(provider.descriptor_requests(), 4);
    assert_eq!(provider.block_reads(), 2 * (16 + 8));
    assert_eq!(
        manager.size_in_bytes(),
        2 * (16 * 192 + 64 * 64 * 4 + 8 * 384 + 4 * 32 * 32 * 4)
    );
}

#[test]
fn concurrent_reads_of_populated_tiles() {
    let provider = slow_provider();
    let cache = ProductCache::with_factory(provider.clone(), CacheTileFactory::default());
    let all = Region::new_with_shape(vec![64, 64]).unwrap();
    let expected = cache.read_region("var", &all).unwrap();
    let block_reads = provider.block_reads();

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                assert_eq!(cache.read_region("var", &all).unwrap(), expected);
            });
        }
    });
    assert_eq!(provider.block_reads(), block_reads);
}

//! Benchmark cold and warm reads through a product cache.
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rastercache::grid::Region;
use rastercache::provider::MemoryDataProvider;
use rastercache::{CacheTileFactory, DataBuffer, DataType, ProductCache, VariableDescriptor};

fn provider(size: u64) -> Arc<MemoryDataProvider> {
    let provider = MemoryDataProvider::new();
    let num_elements = usize::try_from(size * size * 8).unwrap();
    provider
        .add_variable(
            VariableDescriptor::new_3d("cube", [8, size, size], [2, 64, 64], DataType::UInt16),
            DataBuffer::from_elements(&[0, 0, 0], &[8, size, size], &vec![1u16; num_elements])
                .unwrap(),
        )
        .unwrap();
    Arc::new(provider)
}

fn variable_cache_read_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("variable_cache_read_cold");
    for size in [256u64, 512u64, 1024u64].iter() {
        group.throughput(Throughput::Bytes(size * size * 8 * 2));
        let provider = provider(*size);
        let region = Region::new_with_shape(vec![8, *size, *size]).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let cache =
                    ProductCache::with_factory(provider.clone(), CacheTileFactory::default());
                cache.read_region("cube", &region).unwrap();
            });
        });
    }
    group.finish();
}

fn variable_cache_read_warm(c: &mut Criterion) {
    let mut group = c.benchmark_group("variable_cache_read_warm");
    for size in [256u64, 512u64, 1024u64].iter() {
        group.throughput(Throughput::Bytes(size * size * 8 * 2));
        let cache = ProductCache::with_factory(provider(*size), CacheTileFactory::default());
        let region = Region::new_with_shape(vec![8, *size, *size]).unwrap();
        cache.read_region("cube", &region).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                cache.read_region("cube", &region).unwrap();
            });
        });
    }
    group.finish();
}

fn variable_cache_read_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("variable_cache_read_window");
    let cache = ProductCache::with_factory(provider(1024), CacheTileFactory::default());
    cache
        .read_region("cube", &Region::new_with_shape(vec![8, 1024, 1024]).unwrap())
        .unwrap();
    for window in [16u64, 100u64, 300u64].iter() {
        group.throughput(Throughput::Bytes(window * window * 2));
        let region = Region::new_with_start_shape(vec![3, 37, 101], vec![1, *window, *window])
            .unwrap();
        let mut target = DataBuffer::zeroed(DataType::UInt16, &[37, 101], &[*window, *window])
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(window), window, |b, _| {
            b.iter(|| {
                cache
                    .variable_cache("cube")
                    .unwrap()
                    .read(&region, &mut target)
                    .unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    variable_cache_read_cold,
    variable_cache_read_warm,
    variable_cache_read_window
);
criterion_main!(benches);

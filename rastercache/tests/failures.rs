#![allow(missing_docs)]

use std::sync::Arc;

use rastercache::grid::{Region, RegionError};
use rastercache::provider::{
    CacheDataProvider, MemoryDataProvider, PerformanceMetricsProvider, ProviderError,
};
use rastercache::{
    CacheError, CacheTileFactory, DataBuffer, DataBufferError, DataType, ProductCache,
    VariableDescriptor,
};

fn memory() -> Arc<MemoryDataProvider> {
    let memory = Arc::new(MemoryDataProvider::new());
    let elements: Vec<i16> = (0..12 * 12).collect();
    memory
        .add_variable(
            VariableDescriptor::new_2d("var", [12, 12], [6, 6], DataType::Int16),
            DataBuffer::from_elements(&[0, 0], &[12, 12], &elements).unwrap(),
        )
        .unwrap();
    memory
}

#[test]
fn block_read_failure_then_retry() {
    let memory = memory();
    let provider = Arc::new(PerformanceMetricsProvider::new(memory.clone()));
    let cache = ProductCache::with_factory(provider.clone(), CacheTileFactory::default());
    let region = Region::new_with_ranges(&[4..8, 4..8]).unwrap();

    memory.set_block_read_failure("var", true);
    let err = cache.read_region("var", &region).unwrap_err();
    let CacheError::BlockRead {
        variable, source, ..
    } = err
    else {
        panic!("expected a block read error");
    };
    assert_eq!(variable, "var");
    assert!(matches!(source, ProviderError::IOError(_)));

    // the failure is not cached
    let variable = cache.variable_cache("var").unwrap();
    assert_eq!(variable.num_populated(), 0);
    assert_eq!(provider.block_reads(), 0);

    memory.set_block_read_failure("var", false);
    let out = cache.read_region("var", &region).unwrap();
    assert_eq!(out.elements::<i16>().unwrap()[0], 4 * 12 + 4);
    assert_eq!(variable.num_populated(), 4);
    assert_eq!(provider.block_reads(), 4);
}

#[test]
fn descriptor_failure() {
    let memory = memory();
    let cache = ProductCache::with_factory(memory.clone(), CacheTileFactory::default());
    let mut target = DataBuffer::zeroed(DataType::Int16, &[0, 0], &[1, 1]).unwrap();
    let err = cache
        .read("missing", &[0, 0], &[1, 1], &mut target)
        .unwrap_err();
    assert!(matches!(
        err,
        CacheError::DescriptorUnavailable {
            source: ProviderError::UnknownVariable(_),
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "descriptor of variable `missing` is unavailable: variable not known: missing"
    );
}

/// Returns blocks one element short.
struct TruncatingProvider(Arc<MemoryDataProvider>);

impl CacheDataProvider for TruncatingProvider {
    fn variable_descriptor(&self, name: &str) -> Result<VariableDescriptor, ProviderError> {
        self.0.variable_descriptor(name)
    }

    fn read_cache_block(
        &self,
        name: &str,
        offsets: &[u64],
        shapes: &[u64],
        reusable: Option<DataBuffer>,
    ) -> Result<DataBuffer, ProviderError> {
        let block = self.0.read_cache_block(name, offsets, shapes, reusable)?;
        let mut bytes = block.into_bytes();
        bytes.truncate(bytes.len() - 2);
        DataBuffer::new(DataType::Int16, &[0, 0], &[1, bytes.len() as u64 / 2], bytes)
            .map_err(|err| ProviderError::Other(err.to_string()))
    }
}

#[test]
fn block_size_mismatch() {
    let cache = ProductCache::with_factory(
        Arc::new(TruncatingProvider(memory())),
        CacheTileFactory::default(),
    );
    let err = cache
        .read_region("var", &Region::new_with_ranges(&[0..2, 0..2]).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        CacheError::DataBuffer(DataBufferError::SizeMismatch {
            expected: 72,
            got: 70
        })
    ));
    assert_eq!(cache.variable_cache("var").unwrap().num_populated(), 0);
}

#[test]
fn unsupported_dimensionality() {
    let cache = ProductCache::with_factory(memory(), CacheTileFactory::default());
    let mut target = DataBuffer::zeroed(DataType::Int16, &[0, 0], &[1, 1]).unwrap();
    for (offsets, shapes) in [
        (&[0u64][..], &[1u64][..]),
        (&[0, 0, 0, 0][..], &[1, 1, 1, 1][..]),
    ] {
        assert!(matches!(
            cache.read("var", offsets, shapes, &mut target),
            Err(CacheError::Region(RegionError::UnsupportedDimensionality(_)))
        ));
    }
    assert!(DataBuffer::zeroed(DataType::Int16, &[0], &[1]).is_err());
}

#[test]
fn read_outside_is_not_an_error() {
    let memory = memory();
    let provider = Arc::new(PerformanceMetricsProvider::new(memory));
    let cache = ProductCache::with_factory(provider.clone(), CacheTileFactory::default());
    let mut target = DataBuffer::from_elements(&[100, 100], &[2, 2], &[-1i16; 4]).unwrap();
    cache
        .read("var", &[100, 100], &[2, 2], &mut target)
        .unwrap();
    assert_eq!(target.elements::<i16>().unwrap(), vec![-1; 4]);
    assert_eq!(provider.block_reads(), 0);

    // far from the variable, at the end of the index space
    let offsets = [u64::MAX - 4, 0];
    let mut target = DataBuffer::from_elements(&offsets, &[4, 4], &[-1i16; 16]).unwrap();
    cache.read("var", &offsets, &[4, 4], &mut target).unwrap();
    assert_eq!(target.elements::<i16>().unwrap(), vec![-1; 16]);
    assert_eq!(provider.block_reads(), 0);
}

#[test]
fn read_past_end_of_index_space() {
    let cache = ProductCache::with_factory(memory(), CacheTileFactory::default());
    let mut target = DataBuffer::from_elements(&[0, 0], &[4, 4], &[-1i16; 16]).unwrap();
    let err = cache
        .read("var", &[u64::MAX - 1, 0], &[4, 4], &mut target)
        .unwrap_err();
    assert!(matches!(err, CacheError::Region(RegionError::Overflow { .. })));
    assert_eq!(target.elements::<i16>().unwrap(), vec![-1; 16]);
}

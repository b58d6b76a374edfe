use std::sync::Arc;

use rastercache_grid::Region;

use crate::{
    provider::CacheDataProviderHandle, CacheError, DataBuffer, DataBufferError,
    VariableDescriptor,
};

/// Everything a tile needs to populate itself: the variable descriptor and the data provider.
///
/// A context is owned by a [`VariableCache`](crate::VariableCache) and lent to its tiles on each call, so tiles never hold the provider.
#[derive(Clone)]
pub struct CacheContext {
    descriptor: Arc<VariableDescriptor>,
    provider: CacheDataProviderHandle,
    validate_blocks: bool,
}

impl std::fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheContext")
            .field("descriptor", &self.descriptor)
            .field("validate_blocks", &self.validate_blocks)
            .finish_non_exhaustive()
    }
}

impl CacheContext {
    /// Create a new cache context.
    #[must_use]
    pub fn new(descriptor: Arc<VariableDescriptor>, provider: CacheDataProviderHandle) -> Self {
        Self {
            descriptor,
            provider,
            validate_blocks: true,
        }
    }

    /// Set whether blocks returned by the provider are validated.
    #[must_use]
    pub fn with_validate_blocks(mut self, validate_blocks: bool) -> Self {
        self.validate_blocks = validate_blocks;
        self
    }

    /// Return the variable descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<VariableDescriptor> {
        &self.descriptor
    }

    /// Return the data provider.
    #[must_use]
    pub fn provider(&self) -> &CacheDataProviderHandle {
        &self.provider
    }

    /// Read the block of the variable covering `region` from the provider.
    ///
    /// The returned buffer is located at `region`.
    ///
    /// # Errors
    /// Returns [`CacheError::BlockRead`] if the provider fails, or a [`CacheError::DataBuffer`] error if the returned block does not match `region` and the variable data type.
    pub fn read_block(
        &self,
        region: &Region,
        reusable: Option<DataBuffer>,
    ) -> Result<DataBuffer, CacheError> {
        let name = self.descriptor.name();
        let block = self
            .provider
            .read_cache_block(name, region.start(), region.shape(), reusable)
            .map_err(|source| CacheError::BlockRead {
                variable: name.to_string(),
                region: region.clone(),
                source,
            })?;

        if self.validate_blocks {
            if block.data_type() != self.descriptor.data_type() {
                log::warn!(
                    "block {region} of `{name}` has data type {}, expected {}",
                    block.data_type(),
                    self.descriptor.data_type()
                );
                return Err(DataBufferError::DataTypeMismatch {
                    expected: self.descriptor.data_type(),
                    got: block.data_type(),
                }
                .into());
            }
            if block.num_elements() != region.num_elements() {
                log::warn!(
                    "block {region} of `{name}` has {} elements, expected {}",
                    block.num_elements(),
                    region.num_elements()
                );
                return Err(DataBufferError::SizeMismatch {
                    expected: region.num_elements() * block.data_type().size() as u64,
                    got: block.size_in_bytes() as u64,
                }
                .into());
            }
        }

        if block.region() == region {
            Ok(block)
        } else {
            Ok(DataBuffer::new(
                block.data_type(),
                region.start(),
                region.shape(),
                block.into_bytes(),
            )?)
        }
    }
}

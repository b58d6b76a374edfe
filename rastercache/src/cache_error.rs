use rastercache_grid::{Region, RegionError, TileGridCreateError};
use thiserror::Error;

use crate::{provider::ProviderError, DataBufferError};

/// Cache errors.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// The provider could not describe a variable.
    #[error("descriptor of variable `{variable}` is unavailable: {source}")]
    DescriptorUnavailable {
        /// The variable name.
        variable: String,
        /// The provider error.
        source: ProviderError,
    },
    /// A provider block read failed while populating a tile.
    #[error("failed to read block {region} of variable `{variable}`: {source}")]
    BlockRead {
        /// The variable name.
        variable: String,
        /// The region of the block.
        region: Region,
        /// The provider error.
        source: ProviderError,
    },
    /// A data buffer error, such as a buffer size or data type mismatch.
    #[error(transparent)]
    DataBuffer(#[from] DataBufferError),
    /// A region error, such as an unsupported dimensionality.
    #[error(transparent)]
    Region(#[from] RegionError),
    /// The tile grid of a variable could not be created.
    #[error(transparent)]
    TileGrid(#[from] TileGridCreateError),
    /// The product reader has been closed.
    #[error("the product reader is closed")]
    ReaderClosed,
}

//! The data source interface consumed by the cache.
//!
//! A [`CacheDataProvider`] describes variables and performs bounded reads from the backing store.
//! The cache calls [`read_cache_block`](CacheDataProvider::read_cache_block) once per tile, on first touch.
//!
//! This module also includes:
//! - [`MemoryDataProvider`]: an in-memory provider holding whole variables.
//! - [`PerformanceMetricsProvider`]: a provider adapter which counts requests.

mod memory_provider;
mod performance_metrics;

use std::sync::Arc;

use auto_impl::auto_impl;
use thiserror::Error;

use crate::{DataBuffer, VariableDescriptor};

pub use memory_provider::MemoryDataProvider;
pub use performance_metrics::PerformanceMetricsProvider;

/// A shared, type-erased [`CacheDataProvider`].
pub type CacheDataProviderHandle = Arc<dyn CacheDataProvider>;

/// Supplies variable metadata and bounded reads of variable data.
#[auto_impl(&, Arc)]
pub trait CacheDataProvider: Send + Sync {
    /// Describe the variable `name`.
    ///
    /// # Errors
    /// Returns a [`ProviderError`] if the variable is unknown or its metadata cannot be determined.
    fn variable_descriptor(&self, name: &str) -> Result<VariableDescriptor, ProviderError>;

    /// Read the block of variable `name` at `offsets` with `shapes`.
    ///
    /// `offsets` and `shapes` are `[row, col]` for rank-2 variables and `[layer, row, col]` for rank-3 variables.
    /// The returned buffer must hold exactly `product(shapes)` elements.
    /// `reusable` is a buffer of the same size that the provider may fill instead of allocating.
    ///
    /// # Errors
    /// Returns a [`ProviderError`] if the read fails.
    fn read_cache_block(
        &self,
        name: &str,
        offsets: &[u64],
        shapes: &[u64],
        reusable: Option<DataBuffer>,
    ) -> Result<DataBuffer, ProviderError>;
}

/// A provider error.
#[derive(Clone, Debug, Error)]
pub enum ProviderError {
    /// The variable is not known to the provider.
    #[error("variable not known: {0}")]
    UnknownVariable(String),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// The metadata of a variable is invalid.
    #[error("invalid metadata for variable {0}: {1}")]
    InvalidMetadata(String, String),
    /// The requested block is not within the variable.
    #[error("invalid range offsets {offsets:?} shapes {shapes:?} for variable {variable}")]
    InvalidRange {
        /// The variable name.
        variable: String,
        /// The requested offsets.
        offsets: Vec<u64>,
        /// The requested shapes.
        shapes: Vec<u64>,
    },
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}

impl From<&str> for ProviderError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for ProviderError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

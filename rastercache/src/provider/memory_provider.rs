//! An in-memory data provider.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use rastercache_grid::Region;

use super::{CacheDataProvider, ProviderError};
use crate::{DataBuffer, VariableDescriptor};

#[derive(Debug)]
struct MemoryVariable {
    descriptor: VariableDescriptor,
    data: DataBuffer,
}

/// An in-memory data provider holding whole variables.
///
/// Block read failures can be injected per variable with [`set_block_read_failure`](MemoryDataProvider::set_block_read_failure).
#[derive(Debug, Default)]
pub struct MemoryDataProvider {
    variables: RwLock<HashMap<String, MemoryVariable>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryDataProvider {
    /// Create a new, empty, in-memory provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a variable.
    ///
    /// `data` must cover the whole variable.
    ///
    /// # Errors
    /// Returns [`ProviderError::InvalidMetadata`] if the descriptor is invalid or `data` does not match it.
    pub fn add_variable(
        &self,
        descriptor: VariableDescriptor,
        data: DataBuffer,
    ) -> Result<(), ProviderError> {
        descriptor.validate()?;
        let expected = Region::new_with_shape(descriptor.array_shape()).map_err(|err| {
            ProviderError::InvalidMetadata(descriptor.name().to_string(), err.to_string())
        })?;
        if data.region() != &expected || data.data_type() != descriptor.data_type() {
            return Err(ProviderError::InvalidMetadata(
                descriptor.name().to_string(),
                format!(
                    "data {} of {} does not match variable {} of {}",
                    data.region(),
                    data.data_type(),
                    expected,
                    descriptor.data_type()
                ),
            ));
        }
        self.variables.write().insert(
            descriptor.name().to_string(),
            MemoryVariable { descriptor, data },
        );
        Ok(())
    }

    /// Remove a variable, returning true if it existed.
    pub fn remove_variable(&self, name: &str) -> bool {
        self.variables.write().remove(name).is_some()
    }

    /// Make every block read of variable `name` fail with an IO error while `fail` is true.
    pub fn set_block_read_failure(&self, name: &str, fail: bool) {
        let mut failing = self.failing.write();
        if fail {
            failing.insert(name.to_string());
        } else {
            failing.remove(name);
        }
    }

    /// Return the names of all variables, sorted.
    #[must_use]
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.variables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl CacheDataProvider for MemoryDataProvider {
    fn variable_descriptor(&self, name: &str) -> Result<VariableDescriptor, ProviderError> {
        self.variables
            .read()
            .get(name)
            .map(|variable| variable.descriptor.clone())
            .ok_or_else(|| ProviderError::UnknownVariable(name.to_string()))
    }

    fn read_cache_block(
        &self,
        name: &str,
        offsets: &[u64],
        shapes: &[u64],
        _reusable: Option<DataBuffer>,
    ) -> Result<DataBuffer, ProviderError> {
        if self.failing.read().contains(name) {
            let message = format!("injected block read failure for {name}");
            return Err(std::io::Error::other(message).into());
        }
        let variables = self.variables.read();
        let variable = variables
            .get(name)
            .ok_or_else(|| ProviderError::UnknownVariable(name.to_string()))?;
        let invalid_range = || ProviderError::InvalidRange {
            variable: name.to_string(),
            offsets: offsets.to_vec(),
            shapes: shapes.to_vec(),
        };
        let region = Region::new_with_start_shape(offsets.to_vec(), shapes.to_vec())
            .map_err(|_| invalid_range())?;
        if !region.inbounds(variable.data.region()) {
            return Err(invalid_range());
        }
        variable.data.extract(&region).map_err(|_| invalid_range())
    }
}

use crate::{provider::ProviderError, DataType};

/// Static metadata of a cached variable.
///
/// Extents are ordered `[layers, rows, cols]` in constructors, matching the axis order of regions.
/// A variable with more than one layer is rank 3, otherwise it is rank 2.
/// A tile extent of zero means the tile extent is unknown, see [`tile_shape`](VariableDescriptor::tile_shape).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableDescriptor {
    name: String,
    width: u64,
    height: u64,
    layers: u64,
    tile_width: u64,
    tile_height: u64,
    tile_layers: u64,
    data_type: DataType,
    scaled: bool,
}

impl VariableDescriptor {
    /// Create a descriptor of a rank-2 variable with shape `[rows, cols]` and tile shape `[tile_rows, tile_cols]`.
    #[must_use]
    pub fn new_2d(
        name: impl Into<String>,
        [height, width]: [u64; 2],
        [tile_height, tile_width]: [u64; 2],
        data_type: DataType,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            layers: 1,
            tile_width,
            tile_height,
            tile_layers: 1,
            data_type,
            scaled: false,
        }
    }

    /// Create a descriptor of a layered variable with shape `[layers, rows, cols]` and tile shape `[tile_layers, tile_rows, tile_cols]`.
    #[must_use]
    pub fn new_3d(
        name: impl Into<String>,
        [layers, height, width]: [u64; 3],
        [tile_layers, tile_height, tile_width]: [u64; 3],
        data_type: DataType,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            layers,
            tile_width,
            tile_height,
            tile_layers,
            data_type,
            scaled: false,
        }
    }

    /// Set whether the raw samples require a scale/offset transform by the consumer.
    #[must_use]
    pub fn with_scaled(mut self, scaled: bool) -> Self {
        self.scaled = scaled;
        self
    }

    /// Return the variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the number of columns.
    #[must_use]
    pub const fn width(&self) -> u64 {
        self.width
    }

    /// Return the number of rows.
    #[must_use]
    pub const fn height(&self) -> u64 {
        self.height
    }

    /// Return the number of layers (1 for rank-2 variables).
    #[must_use]
    pub const fn layers(&self) -> u64 {
        self.layers
    }

    /// Return the tile extent along columns (0 if unknown).
    #[must_use]
    pub const fn tile_width(&self) -> u64 {
        self.tile_width
    }

    /// Return the tile extent along rows (0 if unknown).
    #[must_use]
    pub const fn tile_height(&self) -> u64 {
        self.tile_height
    }

    /// Return the tile extent along layers (0 if unknown).
    #[must_use]
    pub const fn tile_layers(&self) -> u64 {
        self.tile_layers
    }

    /// Return the data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns true if the raw samples require a scale/offset transform by the consumer.
    #[must_use]
    pub const fn is_scaled(&self) -> bool {
        self.scaled
    }

    /// Returns true if the variable has more than one layer.
    #[must_use]
    pub const fn is_3d(&self) -> bool {
        self.layers > 1
    }

    /// Return the rank of the variable (2 or 3).
    #[must_use]
    pub const fn rank(&self) -> usize {
        if self.is_3d() {
            3
        } else {
            2
        }
    }

    /// Return the variable shape, `[rows, cols]` or `[layers, rows, cols]`.
    #[must_use]
    pub fn array_shape(&self) -> Vec<u64> {
        if self.is_3d() {
            vec![self.layers, self.height, self.width]
        } else {
            vec![self.height, self.width]
        }
    }

    /// Returns true if every tile extent used by the variable rank is known.
    #[must_use]
    pub fn has_tile_shape(&self) -> bool {
        self.tile_height > 0 && self.tile_width > 0 && (!self.is_3d() || self.tile_layers > 0)
    }

    /// Return the tile shape at the variable rank.
    ///
    /// An unknown (zero) tile extent falls back to the matching extent of `default` (`[layers, rows, cols]`), clipped to the variable extent.
    #[must_use]
    pub fn tile_shape(&self, default: &[u64; 3]) -> Vec<u64> {
        let resolve = |tile: u64, default: u64, extent: u64| {
            if tile > 0 {
                tile
            } else {
                default.min(extent).max(1)
            }
        };
        let rows = resolve(self.tile_height, default[1], self.height);
        let cols = resolve(self.tile_width, default[2], self.width);
        if self.is_3d() {
            vec![resolve(self.tile_layers, default[0], self.layers), rows, cols]
        } else {
            vec![rows, cols]
        }
    }

    /// Validate the descriptor.
    ///
    /// # Errors
    /// Returns [`ProviderError::InvalidMetadata`] if the name is empty or the variable has no layers.
    pub fn validate(&self) -> Result<(), ProviderError> {
        let invalid = |reason: &str| {
            Err(ProviderError::InvalidMetadata(
                self.name.clone(),
                reason.to_string(),
            ))
        };
        if self.name.is_empty() {
            invalid("the variable name is empty")
        } else if self.layers == 0 {
            invalid("the variable has no layers")
        } else {
            Ok(())
        }
    }
}

/// The storage layout of a band as reported by a [`CachedProductReader`](crate::reader::CachedProductReader).
///
/// Unknown or unset values are `-1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StorageDimensions {
    /// The number of columns.
    pub raster_width: i64,
    /// The number of rows.
    pub raster_height: i64,
    /// The number of layers, `-1` for rank-2 variables.
    pub raster_layers: i64,
    /// The tile extent along columns.
    pub tile_width: i64,
    /// The tile extent along rows.
    pub tile_height: i64,
    /// The tile extent along layers, `-1` for rank-2 variables.
    pub tile_layers: i64,
}

impl Default for StorageDimensions {
    fn default() -> Self {
        Self {
            raster_width: -1,
            raster_height: -1,
            raster_layers: -1,
            tile_width: -1,
            tile_height: -1,
            tile_layers: -1,
        }
    }
}

use crate::Region;

/// A signed `{z, y, x, depth, height, width}` box.
///
/// Rank-2 regions map to a cuboid with `z = 0` and `depth = 1`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cuboid {
    /// Layer origin.
    pub z: i64,
    /// Row origin.
    pub y: i64,
    /// Column origin.
    pub x: i64,
    /// Number of layers.
    pub depth: i64,
    /// Number of rows.
    pub height: i64,
    /// Number of columns.
    pub width: i64,
}

impl Cuboid {
    /// Create a new cuboid.
    #[must_use]
    pub const fn new(z: i64, y: i64, x: i64, depth: i64, height: i64, width: i64) -> Self {
        Self {
            z,
            y,
            x,
            depth,
            height,
            width,
        }
    }

    /// Returns true if any extent is zero or negative.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.depth <= 0 || self.height <= 0 || self.width <= 0
    }

    /// Return the intersection of two cuboids.
    ///
    /// Disjoint cuboids produce a cuboid with a zero extent on the first non-overlapping axis.
    #[must_use]
    pub fn intersection(&self, other: &Cuboid) -> Cuboid {
        let axis = |a0: i64, a_len: i64, b0: i64, b_len: i64| {
            let start = a0.max(b0);
            let end = a0.saturating_add(a_len).min(b0.saturating_add(b_len));
            (start, end.saturating_sub(start).max(0))
        };
        let (z, depth) = axis(self.z, self.depth, other.z, other.depth);
        let (y, height) = axis(self.y, self.height, other.y, other.height);
        let (x, width) = axis(self.x, self.width, other.x, other.width);
        Cuboid {
            z,
            y,
            x,
            depth,
            height,
            width,
        }
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl From<&Region> for Cuboid {
    fn from(region: &Region) -> Self {
        let [z, y, x] = region.start_3d().map(to_i64);
        let [depth, height, width] = region.shape_3d().map(to_i64);
        Cuboid {
            z,
            y,
            x,
            depth,
            height,
            width,
        }
    }
}

//! Element data types.

use derive_more::Display;

/// The data type of the elements of a variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum DataType {
    /// `i8`
    #[display("int8")]
    Int8,
    /// `u8`
    #[display("uint8")]
    UInt8,
    /// `i16`
    #[display("int16")]
    Int16,
    /// `u16`
    #[display("uint16")]
    UInt16,
    /// `i32`
    #[display("int32")]
    Int32,
    /// `u32`
    #[display("uint32")]
    UInt32,
    /// `i64`
    #[display("int64")]
    Int64,
    /// `u64`
    #[display("uint64")]
    UInt64,
    /// `f32`
    #[display("float32")]
    Float32,
    /// `f64`
    #[display("float64")]
    Float64,
}

impl DataType {
    /// Return the size of an element in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Decode the element at the start of `bytes` as an [`f64`].
    ///
    /// Returns [`None`] if `bytes` is shorter than [`size`](Self::size).
    #[must_use]
    pub fn read_f64(self, bytes: &[u8]) -> Option<f64> {
        let bytes = bytes.get(..self.size())?;
        Some(match self {
            Self::Int8 => bytemuck::pod_read_unaligned::<i8>(bytes).to_f64(),
            Self::UInt8 => bytemuck::pod_read_unaligned::<u8>(bytes).to_f64(),
            Self::Int16 => bytemuck::pod_read_unaligned::<i16>(bytes).to_f64(),
            Self::UInt16 => bytemuck::pod_read_unaligned::<u16>(bytes).to_f64(),
            Self::Int32 => bytemuck::pod_read_unaligned::<i32>(bytes).to_f64(),
            Self::UInt32 => bytemuck::pod_read_unaligned::<u32>(bytes).to_f64(),
            Self::Int64 => bytemuck::pod_read_unaligned::<i64>(bytes).to_f64(),
            Self::UInt64 => bytemuck::pod_read_unaligned::<u64>(bytes).to_f64(),
            Self::Float32 => bytemuck::pod_read_unaligned::<f32>(bytes).to_f64(),
            Self::Float64 => bytemuck::pod_read_unaligned::<f64>(bytes),
        })
    }
}

/// A primitive element type with a corresponding [`DataType`].
pub trait Element: bytemuck::Pod + Send + Sync + 'static {
    /// The data type of the element.
    const DATA_TYPE: DataType;

    /// Convert the element to an [`f64`], possibly losing precision.
    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    ($t:ty, $data_type:ident) => {
        impl Element for $t {
            const DATA_TYPE: DataType = DataType::$data_type;

            #[allow(
                clippy::cast_precision_loss,
                clippy::cast_lossless,
                clippy::unnecessary_cast
            )]
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_element!(i8, Int8);
impl_element!(u8, UInt8);
impl_element!(i16, Int16);
impl_element!(u16, UInt16);
impl_element!(i32, Int32);
impl_element!(u32, UInt32);
impl_element!(i64, Int64);
impl_element!(u64, UInt64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);

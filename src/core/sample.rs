//! Sample trait for the six supported raster representations.
//!
//! Every kernel in the crate is generic over [`Sample`]; the concrete
//! representation is picked once per region from the destination's
//! [`DataType`] and never branched on inside the pixel loops.

use crate::core::raster::SampleData;
use crate::core::types::DataType;
use std::fmt::Debug;

/// Trait for types that can be stored in a raster sample.
pub trait Sample: Copy + Debug + PartialEq + PartialOrd + Send + Sync + 'static {
    /// Representation tag of this storage type.
    const DATA_TYPE: DataType;

    /// Minimum value representable by this type
    fn min_value() -> Self;

    /// Maximum value representable by this type
    fn max_value() -> Self;

    /// Widen to f64. Exact for every supported representation.
    fn to_f64(self) -> f64;

    /// Narrow from f64, rounding integers and clamping into range.
    ///
    /// NaN maps to zero for integer types.
    fn from_f64(value: f64) -> Self;

    /// Pick this type's entry out of a per-representation table.
    fn pick(scalars: &TypedScalars) -> Self;

    /// Borrow the typed buffer if `data` holds this representation.
    fn slice(data: &SampleData) -> Option<&[Self]>;

    /// Mutably borrow the typed buffer if `data` holds this representation.
    fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]>;

    /// Wrap an owned buffer.
    fn wrap(samples: Vec<Self>) -> SampleData;
}

/// One scalar precomputed for each representation.
///
/// Built once at engine construction so kernels only index a field.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub struct TypedScalars {
    pub byte: u8,
    pub ushort: u16,
    pub short: i16,
    pub int: i32,
    pub float: f32,
    pub double: f64,
}

impl TypedScalars {
    /// Clamp/round `value` independently into every representation.
    pub fn new(value: f64) -> Self {
        Self {
            byte: u8::from_f64(value),
            ushort: u16::from_f64(value),
            short: i16::from_f64(value),
            int: i32::from_f64(value),
            float: f32::from_f64(value),
            double: value,
        }
    }

    /// The entry for representation `T`.
    pub fn get<T: Sample>(&self) -> T {
        T::pick(self)
    }
}

/// Run `$body` with `$t` bound to the storage type of a [`DataType`].
///
/// ```ignore
/// with_sample_type!(data_type, T => image.fill_region::<T>(rect, &values))
/// ```
macro_rules! with_sample_type {
    ($data_type:expr, $t:ident => $body:expr) => {
        match $data_type {
            $crate::core::types::DataType::Byte => {
                type $t = u8;
                $body
            }
            $crate::core::types::DataType::UShort => {
                type $t = u16;
                $body
            }
            $crate::core::types::DataType::Short => {
                type $t = i16;
                $body
            }
            $crate::core::types::DataType::Int => {
                type $t = i32;
                $body
            }
            $crate::core::types::DataType::Float => {
                type $t = f32;
                $body
            }
            $crate::core::types::DataType::Double => {
                type $t = f64;
                $body
            }
        }
    };
}

pub(crate) use with_sample_type;

macro_rules! impl_sample_int {
    ($t:ty, $variant:ident, $field:ident) => {
        impl Sample for $t {
            const DATA_TYPE: DataType = DataType::$variant;

            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                value.round().clamp(<$t>::MIN as f64, <$t>::MAX as f64) as $t
            }

            fn pick(scalars: &TypedScalars) -> Self {
                scalars.$field
            }

            fn slice(data: &SampleData) -> Option<&[Self]> {
                match data {
                    SampleData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]> {
                match data {
                    SampleData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn wrap(samples: Vec<Self>) -> SampleData {
                SampleData::$variant(samples)
            }
        }
    };
}

impl_sample_int!(u8, Byte, byte);
impl_sample_int!(u16, UShort, ushort);
impl_sample_int!(i16, Short, short);
impl_sample_int!(i32, Int, int);

impl Sample for f32 {
    const DATA_TYPE: DataType = DataType::Float;

    fn min_value() -> Self {
        f32::MIN
    }

    fn max_value() -> Self {
        f32::MAX
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            value.clamp(f32::MIN as f64, f32::MAX as f64) as f32
        } else {
            value as f32
        }
    }

    fn pick(scalars: &TypedScalars) -> Self {
        scalars.float
    }

    fn slice(data: &SampleData) -> Option<&[Self]> {
        match data {
            SampleData::Float(v) => Some(v),
            _ => None,
        }
    }

    fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]> {
        match data {
            SampleData::Float(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(samples: Vec<Self>) -> SampleData {
        SampleData::Float(samples)
    }
}

impl Sample for f64 {
    const DATA_TYPE: DataType = DataType::Double;

    fn min_value() -> Self {
        f64::MIN
    }

    fn max_value() -> Self {
        f64::MAX
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn pick(scalars: &TypedScalars) -> Self {
        scalars.double
    }

    fn slice(data: &SampleData) -> Option<&[Self]> {
        match data {
            SampleData::Double(v) => Some(v),
            _ => None,
        }
    }

    fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]> {
        match data {
            SampleData::Double(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(samples: Vec<Self>) -> SampleData {
        SampleData::Double(samples)
    }
}

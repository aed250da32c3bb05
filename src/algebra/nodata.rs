//! No-data ranges and the per-sample screening used by the kernels.
//!
//! A [`NoDataRange`] is a numeric interval with explicit bound inclusivity
//! plus a flag deciding whether NaN counts as no-data. The [`NoDataMask`]
//! built from it at construction precomputes two 256-entry tables so that
//! byte samples are screened and substituted by indexing alone; wider
//! representations test the range directly.

use crate::core::sample::{Sample, TypedScalars};
use serde::{Deserialize, Serialize};

/// Interval of sample values treated as absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoDataRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
    /// Whether `min` itself is no-data
    #[serde(default = "default_true")]
    pub min_included: bool,
    /// Whether `max` itself is no-data
    #[serde(default = "default_true")]
    pub max_included: bool,
    /// Whether NaN samples are no-data (floating point only)
    #[serde(default)]
    pub nan_included: bool,
}

fn default_true() -> bool {
    true
}

impl NoDataRange {
    /// Closed interval `[min, max]`.
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            min_included: true,
            max_included: true,
            nan_included: false,
        }
    }

    /// A single value.
    pub fn exact(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Matches NaN and nothing else.
    pub fn nan() -> Self {
        Self {
            min: f64::NAN,
            max: f64::NAN,
            min_included: false,
            max_included: false,
            nan_included: true,
        }
    }

    /// Set whether the bounds belong to the range.
    pub fn with_bounds_included(mut self, min_included: bool, max_included: bool) -> Self {
        self.min_included = min_included;
        self.max_included = max_included;
        self
    }

    /// Set whether NaN belongs to the range.
    pub fn with_nan(mut self, nan_included: bool) -> Self {
        self.nan_included = nan_included;
        self
    }

    /// Whether `value` lies inside the range.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        if value.is_nan() {
            return self.nan_included;
        }
        let above_min = if self.min_included {
            value >= self.min
        } else {
            value > self.min
        };
        let below_max = if self.max_included {
            value <= self.max
        } else {
            value < self.max
        };
        above_min && below_max
    }
}

/// Construction-time no-data state shared by every region invocation.
#[derive(Debug, Clone)]
pub struct NoDataMask {
    range: NoDataRange,
    byte_valid: [bool; 256],
    byte_substitute: [u8; 256],
}

impl NoDataMask {
    /// Build the mask, precomputing the byte tables for `null`.
    pub fn new(range: NoDataRange, null: &TypedScalars) -> Self {
        let mut byte_valid = [false; 256];
        let mut byte_substitute = [0u8; 256];
        for i in 0..256usize {
            let valid = !range.contains(i as f64);
            byte_valid[i] = valid;
            byte_substitute[i] = if valid { i as u8 } else { null.byte };
        }
        Self {
            range,
            byte_valid,
            byte_substitute,
        }
    }

    /// The range this mask was built from.
    pub fn range(&self) -> &NoDataRange {
        &self.range
    }

    /// Whether `value` is no-data.
    pub fn is_nodata<T: NoDataScreen>(&self, value: T) -> bool {
        !value.is_valid(self)
    }
}

/// Per-representation no-data test and substitution.
pub trait NoDataScreen: Sample {
    /// Whether the sample carries data.
    fn is_valid(self, mask: &NoDataMask) -> bool;

    /// The sample itself if valid, otherwise `null`; plus the validity flag.
    fn screen(self, mask: &NoDataMask, null: Self) -> (Self, bool);
}

impl NoDataScreen for u8 {
    #[inline]
    fn is_valid(self, mask: &NoDataMask) -> bool {
        mask.byte_valid[self as usize]
    }

    #[inline]
    fn screen(self, mask: &NoDataMask, _null: Self) -> (Self, bool) {
        let i = self as usize;
        (mask.byte_substitute[i], mask.byte_valid[i])
    }
}

macro_rules! impl_screen_by_range {
    ($($t:ty),*) => {
        $(
            impl NoDataScreen for $t {
                #[inline]
                fn is_valid(self, mask: &NoDataMask) -> bool {
                    !mask.range.contains(self.to_f64())
                }

                #[inline]
                fn screen(self, mask: &NoDataMask, null: Self) -> (Self, bool) {
                    if mask.range.contains(self.to_f64()) {
                        (null, false)
                    } else {
                        (self, true)
                    }
                }
            }
        )*
    };
}

impl_screen_by_range!(u16, i16, i32, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_bounds() {
        let closed = NoDataRange::new(10.0, 20.0);
        assert!(closed.contains(10.0));
        assert!(closed.contains(20.0));
        assert!(!closed.contains(20.5));

        let open = closed.with_bounds_included(false, false);
        assert!(!open.contains(10.0));
        assert!(!open.contains(20.0));
        assert!(open.contains(15.0));

        let half = closed.with_bounds_included(true, false);
        assert!(half.contains(10.0));
        assert!(!half.contains(20.0));
    }

    #[test]
    fn test_range_nan() {
        let range = NoDataRange::exact(-9999.0);
        assert!(!range.contains(f64::NAN));
        assert!(range.with_nan(true).contains(f64::NAN));
        assert!(NoDataRange::nan().contains(f64::NAN));
        assert!(!NoDataRange::nan().contains(0.0));
    }

    #[test]
    fn test_byte_tables() {
        let mask = NoDataMask::new(NoDataRange::new(0.0, 2.0), &TypedScalars::new(1.0));
        assert!(mask.is_nodata(0u8));
        assert!(mask.is_nodata(2u8));
        assert!(!mask.is_nodata(3u8));
        assert_eq!(1u8.screen(&mask, 1), (1, false));
        assert_eq!(200u8.screen(&mask, 1), (200, true));
    }

    #[test]
    fn test_byte_tables_agree_with_range() {
        let range = NoDataRange::new(100.0, 150.0).with_bounds_included(false, true);
        let mask = NoDataMask::new(range, &TypedScalars::new(0.0));
        for i in 0..=255u8 {
            assert_eq!(mask.is_nodata(i), range.contains(i as f64), "sample {}", i);
        }
    }

    #[test]
    fn test_wide_screen() {
        let mask = NoDataMask::new(
            NoDataRange::exact(-1.0).with_nan(true),
            &TypedScalars::new(0.0),
        );
        assert_eq!((-1i32).screen(&mask, 0), (0, false));
        assert_eq!(5i32.screen(&mask, 0), (5, true));
        assert_eq!(f32::NAN.screen(&mask, 7.0).0, 7.0);
        assert!(!mask.is_nodata(2.5f64));
        assert!(mask.is_nodata(-1i16));
    }

    #[test]
    fn test_range_deserialize_defaults() {
        let range: NoDataRange = serde_json::from_str(r#"{"min": 0, "max": 5}"#).unwrap();
        assert!(range.min_included && range.max_included);
        assert!(!range.nan_included);
    }
}

//! The four algebraic operators and their per-representation folds.
//!
//! Integer representations accumulate in `i64` (saturating) and clamp once
//! at the end of the fold; `float` accumulates in `f64` for sums and
//! products. Both floating point types clamp finite overflow to their
//! largest magnitude and keep NaN. Division never fails: integer division by zero saturates
//! toward the sign of the running result, floating point division follows
//! IEEE unmodified.

use crate::core::error::AlgebraError;
use crate::core::sample::Sample;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An N-ary fold over the samples of one pixel.
pub type FoldFn<T> = fn(&[T]) -> T;

/// Algebraic operator applied across sources.
///
/// Every operator is defined for all six representations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// `s0 + s1 + ... + sn`
    Sum,
    /// `s0 - s1 - ... - sn`
    Subtract,
    /// `s0 * s1 * ... * sn`
    Multiply,
    /// `((s0 / s1) / ...) / sn`
    Divide,
}

impl Operator {
    /// All operators.
    pub const ALL: [Operator; 4] = [
        Operator::Sum,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    /// Lowercase operator name.
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Sum => "sum",
            Operator::Subtract => "subtract",
            Operator::Multiply => "multiply",
            Operator::Divide => "divide",
        }
    }

    /// Value substituted for a no-data operand before folding.
    ///
    /// The additive identity for sum/subtract, the multiplicative one for
    /// multiply/divide.
    pub fn null_value(&self) -> f64 {
        match self {
            Operator::Sum | Operator::Subtract => 0.0,
            Operator::Multiply | Operator::Divide => 1.0,
        }
    }

    /// Resolve the N-ary fold for representation `T`.
    pub fn fold_fn<T: Reduce>(&self) -> FoldFn<T> {
        match self {
            Operator::Sum => T::sum,
            Operator::Subtract => T::subtract,
            Operator::Multiply => T::multiply,
            Operator::Divide => T::divide,
        }
    }

    /// Fold all `values` with this operator.
    pub fn reduce_n<T: Reduce>(&self, values: &[T]) -> T {
        (self.fold_fn::<T>())(values)
    }

    /// Apply the operator to two operands.
    pub fn reduce2<T: Reduce>(&self, a: T, b: T) -> T {
        self.reduce_n(&[a, b])
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = AlgebraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" | "add" => Ok(Operator::Sum),
            "subtract" | "sub" => Ok(Operator::Subtract),
            "multiply" | "mul" => Ok(Operator::Multiply),
            "divide" | "div" => Ok(Operator::Divide),
            other => Err(AlgebraError::InvalidOperator(other.to_string())),
        }
    }
}

/// Per-representation arithmetic behind [`Operator`].
///
/// Each fold clamps exactly once, after the last operand, so intermediate
/// overflow in a multi-source product or quotient is never clamped away.
pub trait Reduce: Sample {
    /// Saturating sum of all operands.
    fn sum(values: &[Self]) -> Self;
    /// First operand minus every following operand.
    fn subtract(values: &[Self]) -> Self;
    /// Saturating product of all operands.
    fn multiply(values: &[Self]) -> Self;
    /// First operand divided by every following operand, left to right.
    fn divide(values: &[Self]) -> Self;
}

/// Clamp an `i64` accumulator into the range of `$t`.
macro_rules! narrow {
    ($t:ty, $acc:expr) => {
        $acc.clamp(<$t>::MIN as i64, <$t>::MAX as i64) as $t
    };
}

macro_rules! impl_reduce_int {
    ($t:ty) => {
        impl Reduce for $t {
            #[inline]
            fn sum(values: &[Self]) -> Self {
                let acc = values
                    .iter()
                    .fold(0i64, |acc, &v| acc.saturating_add(v as i64));
                narrow!($t, acc)
            }

            #[inline]
            fn subtract(values: &[Self]) -> Self {
                let Some((&first, rest)) = values.split_first() else {
                    return 0;
                };
                let acc = rest
                    .iter()
                    .fold(first as i64, |acc, &v| acc.saturating_sub(v as i64));
                narrow!($t, acc)
            }

            #[inline]
            fn multiply(values: &[Self]) -> Self {
                let acc = values
                    .iter()
                    .fold(1i64, |acc, &v| acc.saturating_mul(v as i64));
                narrow!($t, acc)
            }

            #[inline]
            fn divide(values: &[Self]) -> Self {
                let Some((&first, rest)) = values.split_first() else {
                    return 1;
                };
                let acc = rest.iter().fold(first as i64, |acc, &v| {
                    if v == 0 {
                        if acc >= 0 {
                            <$t>::MAX as i64
                        } else {
                            <$t>::MIN as i64
                        }
                    } else {
                        acc / v as i64
                    }
                });
                narrow!($t, acc)
            }
        }
    };
}

impl_reduce_int!(u8);
impl_reduce_int!(u16);
impl_reduce_int!(i16);
impl_reduce_int!(i32);

#[inline]
fn clamp_float(acc: f64) -> f32 {
    if acc.is_nan() {
        f32::NAN
    } else {
        acc.clamp(f32::MIN as f64, f32::MAX as f64) as f32
    }
}

#[inline]
fn clamp_double(acc: f64) -> f64 {
    if acc.is_nan() {
        acc
    } else {
        acc.clamp(f64::MIN, f64::MAX)
    }
}

impl Reduce for f32 {
    #[inline]
    fn sum(values: &[Self]) -> Self {
        clamp_float(values.iter().map(|&v| v as f64).sum())
    }

    #[inline]
    fn subtract(values: &[Self]) -> Self {
        let Some((&first, rest)) = values.split_first() else {
            return 0.0;
        };
        clamp_float(rest.iter().fold(first as f64, |acc, &v| acc - v as f64))
    }

    #[inline]
    fn multiply(values: &[Self]) -> Self {
        clamp_float(values.iter().fold(1.0f64, |acc, &v| acc * v as f64))
    }

    #[inline]
    fn divide(values: &[Self]) -> Self {
        let Some((&first, rest)) = values.split_first() else {
            return 1.0;
        };
        rest.iter().fold(first, |acc, &v| acc / v)
    }
}

impl Reduce for f64 {
    #[inline]
    fn sum(values: &[Self]) -> Self {
        clamp_double(values.iter().sum())
    }

    #[inline]
    fn subtract(values: &[Self]) -> Self {
        let Some((&first, rest)) = values.split_first() else {
            return 0.0;
        };
        clamp_double(rest.iter().fold(first, |acc, &v| acc - v))
    }

    #[inline]
    fn multiply(values: &[Self]) -> Self {
        clamp_double(values.iter().fold(1.0f64, |acc, &v| acc * v))
    }

    #[inline]
    fn divide(values: &[Self]) -> Self {
        let Some((&first, rest)) = values.split_first() else {
            return 1.0;
        };
        rest.iter().fold(first, |acc, &v| acc / v)
    }
}

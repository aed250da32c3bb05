//! Per-pixel raster kernel.
//!
//! One generic loop serves every representation, operator and execution
//! path. The fold, the ROI test and the no-data screen are strategy types
//! chosen once per invocation in [`run`]; the always-true strategies compile
//! down to nothing, so the plain path carries no per-pixel flag checks.

use crate::algebra::nodata::{NoDataMask, NoDataScreen};
use crate::algebra::operator::{Operator, Reduce};
use crate::algebra::roi::Roi;
use crate::core::raster::{RegionBuffer, Window};

/// Everything the kernel needs besides its inputs and output.
#[derive(Debug, Clone, Copy)]
pub struct PixelRule<T> {
    /// Operator folded over the operands of each pixel
    pub operator: Operator,
    /// Written where no result exists
    pub destination_nodata: T,
    /// Substituted for no-data operands
    pub null: T,
}

/// Folds the screened operands of one pixel.
pub(crate) trait PixelFold<T>: Copy {
    fn fold(&self, operands: &[T]) -> T;
}

macro_rules! pixel_fold {
    ($name:ident, $method:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub(crate) struct $name;

        impl<T: Reduce> PixelFold<T> for $name {
            #[inline(always)]
            fn fold(&self, operands: &[T]) -> T {
                T::$method(operands)
            }
        }
    };
}

pixel_fold!(SumFold, sum);
pixel_fold!(SubtractFold, subtract);
pixel_fold!(MultiplyFold, multiply);
pixel_fold!(DivideFold, divide);

/// Decides whether a pixel is computed at all.
pub(crate) trait PixelFilter: Copy {
    fn keeps(&self, x: u32, y: u32) -> bool;
}

/// Every pixel is computed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EveryPixel;

impl PixelFilter for EveryPixel {
    #[inline(always)]
    fn keeps(&self, _x: u32, _y: u32) -> bool {
        true
    }
}

impl PixelFilter for &dyn Roi {
    #[inline]
    fn keeps(&self, x: u32, y: u32) -> bool {
        self.contains(x, y)
    }
}

/// Screens one operand, returning the value to fold and whether it was valid.
pub(crate) trait SampleFilter<T>: Copy {
    fn screen(&self, value: T, null: T) -> (T, bool);
}

/// No sample is no-data.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KeepAll;

impl<T: NoDataScreen> SampleFilter<T> for KeepAll {
    #[inline(always)]
    fn screen(&self, value: T, _null: T) -> (T, bool) {
        (value, true)
    }
}

impl<T: NoDataScreen> SampleFilter<T> for &NoDataMask {
    #[inline]
    fn screen(&self, value: T, null: T) -> (T, bool) {
        value.screen(self, null)
    }
}

/// Compute `out` from `windows`, picking the execution path from which of
/// `roi` and `mask` are present.
pub fn run<T>(
    rule: &PixelRule<T>,
    windows: &[Window<'_, T>],
    out: &mut RegionBuffer<T>,
    roi: Option<&dyn Roi>,
    mask: Option<&NoDataMask>,
) where
    T: Reduce + NoDataScreen,
{
    match rule.operator {
        Operator::Sum => run_path(rule, windows, out, roi, mask, SumFold),
        Operator::Subtract => run_path(rule, windows, out, roi, mask, SubtractFold),
        Operator::Multiply => run_path(rule, windows, out, roi, mask, MultiplyFold),
        Operator::Divide => run_path(rule, windows, out, roi, mask, DivideFold),
    }
}

fn run_path<T, F>(
    rule: &PixelRule<T>,
    windows: &[Window<'_, T>],
    out: &mut RegionBuffer<T>,
    roi: Option<&dyn Roi>,
    mask: Option<&NoDataMask>,
    fold: F,
) where
    T: Reduce + NoDataScreen,
    F: PixelFold<T>,
{
    match (roi, mask) {
        (None, None) => compute(rule, windows, out, fold, EveryPixel, KeepAll),
        (Some(roi), None) => compute(rule, windows, out, fold, roi, KeepAll),
        (None, Some(mask)) => compute(rule, windows, out, fold, EveryPixel, mask),
        (Some(roi), Some(mask)) => compute(rule, windows, out, fold, roi, mask),
    }
}

/// Band-major, then row, then column.
///
/// Bands beyond a window's own band count read its last band.
fn compute<T, F, P, S>(
    rule: &PixelRule<T>,
    windows: &[Window<'_, T>],
    out: &mut RegionBuffer<T>,
    fold: F,
    pixels: P,
    samples: S,
) where
    T: Reduce + NoDataScreen,
    F: PixelFold<T>,
    P: PixelFilter,
    S: SampleFilter<T>,
{
    let rect = out.rect();
    let mut operands: Vec<T> = Vec::with_capacity(windows.len());
    let mut starts = vec![0usize; windows.len()];

    for band in 0..out.num_bands() {
        for row in 0..rect.height as usize {
            for (start, window) in starts.iter_mut().zip(windows) {
                let source_band = band.min(window.num_bands().saturating_sub(1));
                *start = window.row_start(row, source_band);
            }
            let y = rect.y + row as u32;

            for (col, dst) in out.row_mut(row, band).iter_mut().enumerate() {
                if !pixels.keeps(rect.x + col as u32, y) {
                    *dst = rule.destination_nodata;
                    continue;
                }

                operands.clear();
                let mut any_valid = false;
                for (window, &start) in windows.iter().zip(&starts) {
                    let raw = window.samples()[start + col * window.pixel_stride()];
                    let (value, valid) = samples.screen(raw, rule.null);
                    any_valid |= valid;
                    operands.push(value);
                }

                *dst = if any_valid {
                    fold.fold(&operands)
                } else {
                    rule.destination_nodata
                };
            }
        }
    }
}

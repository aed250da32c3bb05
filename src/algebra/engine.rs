//! The region dispatcher.
//!
//! An [`AlgebraEngine`] is built once, validating the configuration
//! against the sources, and then asked to compute any number of
//! rectangles. It holds no mutable state, so disjoint rectangles can be
//! computed concurrently from several threads.
//!
//! # Example
//!
//! ```ignore
//! let config = AlgebraConfig::new().with_operator(Operator::Sum);
//! let engine = AlgebraEngine::new(&config, &[&a, &b], None)?;
//! let mut dest = engine.create_destination(a.bounds());
//! engine.compute_region(&[&a, &b], &mut dest, a.bounds())?;
//! ```

use crate::algebra::config::AlgebraConfig;
use crate::algebra::kernel::{self, PixelRule};
use crate::algebra::nodata::NoDataScreen;
use crate::algebra::operator::Reduce;
use crate::algebra::reconcile::{EngineState, SourceInfo};
use crate::algebra::roi::Roi;
use crate::core::error::{AlgebraError, AlgebraResult};
use crate::core::raster::{RasterImage, RasterSource, RegionBuffer};
use crate::core::sample::{with_sample_type, Sample};
use crate::core::types::{DataType, Rect};
use log::trace;
use std::sync::Arc;

/// How a region was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOutcome {
    /// The kernel ran over the region
    Computed,
    /// The region lies outside the ROI and was filled with destination no-data
    OutsideRoi,
    /// The region was empty; nothing was written
    Empty,
}

/// Multi-source per-pixel algebra over rectangular regions.
#[derive(Debug, Clone)]
pub struct AlgebraEngine {
    state: EngineState,
    roi: Option<Arc<dyn Roi>>,
}

impl AlgebraEngine {
    /// Validate `config` against `sources` and build the engine.
    pub fn new(
        config: &AlgebraConfig,
        sources: &[&dyn RasterSource],
        roi: Option<Arc<dyn Roi>>,
    ) -> AlgebraResult<Self> {
        let infos: Vec<SourceInfo> = sources.iter().map(|s| SourceInfo::of(*s)).collect();
        Self::from_info(config, &infos, roi)
    }

    /// Build the engine from source descriptions alone.
    pub fn from_info(
        config: &AlgebraConfig,
        sources: &[SourceInfo],
        roi: Option<Arc<dyn Roi>>,
    ) -> AlgebraResult<Self> {
        let state = EngineState::resolve(config, sources, roi.is_some())?;
        Ok(Self { state, roi })
    }

    /// The resolved construction-time state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Number of output bands.
    pub fn num_bands(&self) -> usize {
        self.state.num_bands
    }

    /// Output representation.
    pub fn data_type(&self) -> DataType {
        self.state.data_type
    }

    /// The configured region of interest.
    pub fn roi(&self) -> Option<&dyn Roi> {
        self.roi.as_deref()
    }

    /// A zeroed destination raster matching the engine's output layout.
    pub fn create_destination(&self, bounds: Rect) -> RasterImage {
        RasterImage::new(bounds, self.state.num_bands, self.state.data_type)
    }

    /// The destination no-data vector, one value per output band, as `T`.
    pub fn nodata_vector<T: Sample>(&self) -> Vec<T> {
        vec![self.state.destination_nodata.get::<T>(); self.state.num_bands]
    }

    /// Compute `rect` of `dest` from `sources`.
    ///
    /// `sources` must be given in the same order and number as at
    /// construction. `rect` must lie inside `dest` and every source.
    pub fn compute_region(
        &self,
        sources: &[&dyn RasterSource],
        dest: &mut RasterImage,
        rect: Rect,
    ) -> AlgebraResult<RegionOutcome> {
        if sources.len() != self.state.num_sources {
            return Err(AlgebraError::GeometryMismatch {
                what: "sources",
                expected: self.state.num_sources,
                actual: sources.len(),
            });
        }
        if dest.data_type() != self.state.data_type {
            return Err(AlgebraError::UnsupportedRepresentation(format!(
                "destination holds {} samples, engine produces {}",
                dest.data_type(),
                self.state.data_type
            )));
        }
        if dest.num_bands() < self.state.num_bands {
            return Err(AlgebraError::GeometryMismatch {
                what: "destination bands",
                expected: self.state.num_bands,
                actual: dest.num_bands(),
            });
        }
        if !dest.bounds().contains_rect(&rect) {
            return Err(AlgebraError::RegionOutOfBounds {
                what: "destination",
                region: rect,
                bounds: dest.bounds(),
            });
        }
        if rect.is_empty() {
            return Ok(RegionOutcome::Empty);
        }

        if let Some(roi) = &self.roi {
            if !roi.intersects(&rect) {
                trace!("Region {} outside ROI, filling with no-data", rect);
                with_sample_type!(self.state.data_type, T => {
                    dest.fill_region::<T>(rect, &self.nodata_vector::<T>())
                })?;
                return Ok(RegionOutcome::OutsideRoi);
            }
        }

        trace!(
            "Computing region {} ({} over {} sources, {:?})",
            rect,
            self.state.operator,
            sources.len(),
            self.state.path
        );
        with_sample_type!(self.state.data_type, T => self.compute_typed::<T>(sources, dest, rect))?;
        Ok(RegionOutcome::Computed)
    }

    fn compute_typed<T>(
        &self,
        sources: &[&dyn RasterSource],
        dest: &mut RasterImage,
        rect: Rect,
    ) -> AlgebraResult<()>
    where
        T: Reduce + NoDataScreen,
    {
        let tiles = sources
            .iter()
            .map(|source| {
                if source.num_bands() == 0 {
                    return Err(AlgebraError::InvalidLayout("source has no bands".to_string()));
                }
                source.tile(rect)
            })
            .collect::<AlgebraResult<Vec<_>>>()?;
        let windows: Vec<_> = tiles.iter().map(|tile| tile.window::<T>()).collect();

        let rule = PixelRule {
            operator: self.state.operator,
            destination_nodata: self.state.destination_nodata.get::<T>(),
            null: self.state.operator_null.get::<T>(),
        };
        let mut out = RegionBuffer::new(rect, self.state.num_bands, rule.destination_nodata);
        kernel::run(
            &rule,
            &windows,
            &mut out,
            self.roi.as_deref(),
            self.state.nodata.as_ref(),
        );
        dest.write_region(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::nodata::NoDataRange;
    use crate::algebra::operator::Operator;
    use crate::algebra::roi::{MaskRoi, RectRoi};
    use crate::core::raster::{SampleData, SampleLayout};

    fn bounds() -> Rect {
        Rect::new(0, 0, 8, 8)
    }

    fn constant(data_type: DataType, values: &[f64]) -> RasterImage {
        RasterImage::constant(bounds(), data_type, values)
    }

    fn compute(engine: &AlgebraEngine, sources: &[&dyn RasterSource]) -> RasterImage {
        let mut dest = engine.create_destination(bounds());
        engine.compute_region(sources, &mut dest, bounds()).unwrap();
        dest
    }

    fn all_equal(image: &RasterImage, band: usize, expected: f64) -> bool {
        let b = image.bounds();
        (b.y..b.bottom()).all(|y| (b.x..b.right()).all(|x| image.get_f64(x, y, band) == Some(expected)))
    }

    #[test]
    fn test_byte_sum_scenario() {
        let a = constant(DataType::Byte, &[50.0]);
        let b = constant(DataType::Byte, &[100.0]);
        let config = AlgebraConfig::new().with_operator(Operator::Sum);
        let engine = AlgebraEngine::new(&config, &[&a, &b], None).unwrap();

        let dest = compute(&engine, &[&a, &b]);
        assert_eq!(dest.data_type(), DataType::Byte);
        assert!(all_equal(&dest, 0, 150.0));
    }

    #[test]
    fn test_byte_sum_all_nodata_scenario() {
        let a = constant(DataType::Byte, &[50.0]);
        let b = constant(DataType::Byte, &[50.0]);
        let config = AlgebraConfig::new()
            .with_operator(Operator::Sum)
            .with_nodata(NoDataRange::new(50.0, 50.0))
            .with_destination_nodata(100.0);
        let engine = AlgebraEngine::new(&config, &[&a, &b], None).unwrap();

        let dest = compute(&engine, &[&a, &b]);
        assert!(all_equal(&dest, 0, 100.0));
    }

    #[test]
    fn test_one_valid_operand_survives() {
        let a = constant(DataType::Short, &[-9999.0]);
        let b = constant(DataType::Short, &[5.0]);
        let config = AlgebraConfig::new()
            .with_operator(Operator::Sum)
            .with_nodata(NoDataRange::exact(-9999.0))
            .with_destination_nodata(-1.0);
        let engine = AlgebraEngine::new(&config, &[&a, &b], None).unwrap();

        let dest = compute(&engine, &[&a, &b]);
        assert!(all_equal(&dest, 0, 5.0));
    }

    #[test]
    fn test_byte_multiply_and_subtract_saturate() {
        let a = constant(DataType::Byte, &[200.0]);
        let b = constant(DataType::Byte, &[200.0]);
        let c = constant(DataType::Byte, &[10.0]);

        let multiply = AlgebraConfig::new().with_operator(Operator::Multiply);
        let engine = AlgebraEngine::new(&multiply, &[&a, &b], None).unwrap();
        assert!(all_equal(&compute(&engine, &[&a, &b]), 0, 255.0));

        let subtract = AlgebraConfig::new().with_operator(Operator::Subtract);
        let engine = AlgebraEngine::new(&subtract, &[&c, &a], None).unwrap();
        assert!(all_equal(&compute(&engine, &[&c, &a]), 0, 0.0));
    }

    #[test]
    fn test_integer_and_float_divide_by_zero() {
        let num = constant(DataType::Int, &[-42.0]);
        let zero = constant(DataType::Int, &[0.0]);
        let config = AlgebraConfig::new().with_operator(Operator::Divide);
        let engine = AlgebraEngine::new(&config, &[&num, &zero], None).unwrap();
        assert!(all_equal(&compute(&engine, &[&num, &zero]), 0, i32::MIN as f64));

        let num = constant(DataType::Double, &[1.0]);
        let zero = constant(DataType::Double, &[0.0]);
        let engine = AlgebraEngine::new(&config, &[&num, &zero], None).unwrap();
        assert!(all_equal(&compute(&engine, &[&num, &zero]), 0, f64::INFINITY));
    }

    #[test]
    fn test_band_reconciliation() {
        let mono = constant(DataType::UShort, &[7.0]);
        let rgb = constant(DataType::UShort, &[1.0, 2.0, 3.0]);
        let config = AlgebraConfig::new().with_operator(Operator::Sum);
        let engine = AlgebraEngine::new(&config, &[&mono, &rgb], None).unwrap();
        assert_eq!(engine.num_bands(), 1);

        let dest = compute(&engine, &[&mono, &rgb]);
        assert_eq!(dest.num_bands(), 1);
        assert!(all_equal(&dest, 0, 8.0));
    }

    #[test]
    fn test_layout_hint_broadcasts_single_band() {
        let mono = constant(DataType::Float, &[0.5]);
        let rgb = constant(DataType::Float, &[1.0, 2.0, 3.0]);
        let config = AlgebraConfig::new()
            .with_operator(Operator::Multiply)
            .with_num_bands(3);
        let engine = AlgebraEngine::new(&config, &[&mono, &rgb], None).unwrap();

        let dest = compute(&engine, &[&mono, &rgb]);
        assert!(all_equal(&dest, 0, 0.5));
        assert!(all_equal(&dest, 1, 1.0));
        assert!(all_equal(&dest, 2, 1.5));
    }

    #[test]
    fn test_roi_outside_pixels_get_nodata() {
        let a = constant(DataType::Int, &[3.0, 4.0]);
        let b = constant(DataType::Int, &[10.0, 20.0]);
        let roi_rect = Rect::new(2, 2, 3, 3);
        let roi: Arc<dyn Roi> = Arc::new(RectRoi::new(roi_rect));

        for nodata in [None, Some(NoDataRange::exact(-5.0))] {
            let mut config = AlgebraConfig::new()
                .with_operator(Operator::Sum)
                .with_destination_nodata(-77.0);
            if let Some(range) = nodata {
                config = config.with_nodata(range);
            }
            let engine = AlgebraEngine::new(&config, &[&a, &b], Some(roi.clone())).unwrap();
            assert!(engine.state().path().uses_roi());

            let dest = compute(&engine, &[&a, &b]);
            for y in 0..8 {
                for x in 0..8 {
                    let inside = roi_rect.contains_point(x, y);
                    assert_eq!(dest.get::<i32>(x, y, 0), Some(if inside { 13 } else { -77 }));
                    assert_eq!(dest.get::<i32>(x, y, 1), Some(if inside { 24 } else { -77 }));
                }
            }
        }
    }

    #[test]
    fn test_roi_fast_reject() {
        let a = constant(DataType::Byte, &[1.0]);
        let roi: Arc<dyn Roi> = Arc::new(MaskRoi::from_fn(bounds(), |x, y| x >= 6 && y >= 6));
        let config = AlgebraConfig::new()
            .with_operator(Operator::Sum)
            .with_destination_nodata(9.0);
        let engine = AlgebraEngine::new(&config, &[&a], Some(roi)).unwrap();

        let mut dest = engine.create_destination(bounds());
        let outcome = engine
            .compute_region(&[&a], &mut dest, Rect::new(0, 0, 4, 4))
            .unwrap();
        assert_eq!(outcome, RegionOutcome::OutsideRoi);
        assert_eq!(dest.get::<u8>(3, 3, 0), Some(9));
        assert_eq!(dest.get::<u8>(4, 4, 0), Some(0));

        let outcome = engine
            .compute_region(&[&a], &mut dest, Rect::new(4, 4, 4, 4))
            .unwrap();
        assert_eq!(outcome, RegionOutcome::Computed);
        assert_eq!(dest.get::<u8>(7, 7, 0), Some(1));
        assert_eq!(dest.get::<u8>(5, 5, 0), Some(9));
    }

    #[test]
    fn test_idempotent() {
        let a = RasterImage::from_vec(bounds(), 1, (0..64).map(|v| v as f32 * 1.5).collect()).unwrap();
        let b = RasterImage::from_vec(bounds(), 1, (0..64).map(|v| 64.0 - v as f32).collect()).unwrap();
        let config = AlgebraConfig::new()
            .with_operator(Operator::Divide)
            .with_nodata(NoDataRange::exact(0.0));
        let engine = AlgebraEngine::new(&config, &[&a, &b], None).unwrap();

        let first = compute(&engine, &[&a, &b]);
        let second = compute(&engine, &[&a, &b]);
        let (SampleData::Float(x), SampleData::Float(y)) = (first.data(), second.data()) else {
            panic!("expected float output");
        };
        let bits = |v: &Vec<f32>| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(x), bits(y));
    }

    #[test]
    fn test_mixed_layouts_and_types() {
        let banded = RasterImage::from_data(
            bounds(),
            SampleLayout::banded(8, 8, 2),
            SampleData::Short(vec![-3; 128]),
        )
        .unwrap();
        let interleaved = constant(DataType::Byte, &[10.0, 20.0]);
        let config = AlgebraConfig::new().with_operator(Operator::Sum);
        let engine = AlgebraEngine::new(&config, &[&banded, &interleaved], None).unwrap();
        assert_eq!(engine.data_type(), DataType::Short);

        let dest = compute(&engine, &[&banded, &interleaved]);
        assert!(all_equal(&dest, 0, 7.0));
        assert!(all_equal(&dest, 1, 17.0));
    }

    #[test]
    fn test_source_count_mismatch() {
        let a = constant(DataType::Byte, &[1.0]);
        let config = AlgebraConfig::new().with_operator(Operator::Sum);
        let engine = AlgebraEngine::new(&config, &[&a, &a], None).unwrap();

        let mut dest = engine.create_destination(bounds());
        let result = engine.compute_region(&[&a], &mut dest, bounds());
        assert!(matches!(
            result,
            Err(AlgebraError::GeometryMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_destination_checks() {
        let a = constant(DataType::Int, &[1.0]);
        let config = AlgebraConfig::new().with_operator(Operator::Sum);
        let engine = AlgebraEngine::new(&config, &[&a], None).unwrap();

        let mut wrong_type = RasterImage::new(bounds(), 1, DataType::Float);
        assert!(matches!(
            engine.compute_region(&[&a], &mut wrong_type, bounds()),
            Err(AlgebraError::UnsupportedRepresentation(_))
        ));

        let mut small = RasterImage::new(Rect::new(0, 0, 4, 4), 1, DataType::Int);
        assert!(matches!(
            engine.compute_region(&[&a], &mut small, bounds()),
            Err(AlgebraError::RegionOutOfBounds { .. })
        ));

        let mut dest = engine.create_destination(bounds());
        assert_eq!(
            engine.compute_region(&[&a], &mut dest, Rect::new(2, 2, 0, 3)).unwrap(),
            RegionOutcome::Empty
        );

        for huge in [Rect::new(4, 0, u32::MAX, 1), Rect::new(0, u32::MAX, 1, u32::MAX)] {
            assert!(matches!(
                engine.compute_region(&[&a], &mut dest, huge),
                Err(AlgebraError::RegionOutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn test_construction_fails_fast() {
        let a = constant(DataType::Byte, &[1.0]);
        let result = AlgebraEngine::new(&AlgebraConfig::new(), &[&a], None);
        assert!(matches!(result, Err(AlgebraError::InvalidOperator(_))));

        let config = AlgebraConfig::new().with_operator(Operator::Sum);
        let result = AlgebraEngine::new(&config, &[], None);
        assert!(matches!(result, Err(AlgebraError::NoSources)));
    }

    #[test]
    fn test_concurrent_disjoint_regions() {
        use rayon::prelude::*;

        let a = RasterImage::from_vec(bounds(), 1, (0..64).map(|v| v as i32).collect()).unwrap();
        let config = AlgebraConfig::new().with_operator(Operator::Multiply);
        let engine = AlgebraEngine::new(&config, &[&a, &a], None).unwrap();

        let rows: Vec<RasterImage> = (0..8u32)
            .into_par_iter()
            .map(|y| {
                let rect = Rect::new(0, y, 8, 1);
                let mut tile = engine.create_destination(rect);
                engine.compute_region(&[&a, &a], &mut tile, rect).unwrap();
                tile
            })
            .collect();

        for (y, row) in rows.iter().enumerate() {
            for x in 0..8u32 {
                let v = y as i32 * 8 + x as i32;
                assert_eq!(row.get::<i32>(x, y as u32, 0), Some(v * v));
            }
        }
    }
}

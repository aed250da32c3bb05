//! Construction-time resolution of the engine state.
//!
//! Everything that does not depend on the region being computed is decided
//! here exactly once: output band count and representation, the
//! destination no-data and operator-null sentinels for every
//! representation, the byte no-data tables, and which of the four
//! execution paths the kernels take.

use crate::algebra::config::AlgebraConfig;
use crate::algebra::nodata::NoDataMask;
use crate::algebra::operator::Operator;
use crate::core::error::{AlgebraError, AlgebraResult};
use crate::core::raster::RasterSource;
use crate::core::sample::TypedScalars;
use crate::core::types::{DataType, Rect};
use log::{debug, warn};

/// Sample model of one source, as seen at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    /// Area covered by the source
    pub bounds: Rect,
    /// Number of bands
    pub num_bands: usize,
    /// Sample representation
    pub data_type: DataType,
}

impl SourceInfo {
    /// Describe a source raster.
    pub fn of(source: &dyn RasterSource) -> Self {
        Self {
            bounds: source.bounds(),
            num_bands: source.num_bands(),
            data_type: source.data_type(),
        }
    }
}

/// Which combination of ROI and no-data handling the kernels run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPath {
    /// No ROI, no no-data range
    Plain,
    /// ROI only
    RoiOnly,
    /// No-data range only
    NoDataOnly,
    /// Both ROI and no-data range
    RoiAndNoData,
}

impl ExecutionPath {
    /// The path for the given presence flags.
    pub fn select(has_roi: bool, has_nodata: bool) -> Self {
        match (has_roi, has_nodata) {
            (false, false) => ExecutionPath::Plain,
            (true, false) => ExecutionPath::RoiOnly,
            (false, true) => ExecutionPath::NoDataOnly,
            (true, true) => ExecutionPath::RoiAndNoData,
        }
    }

    /// Whether pixels are tested against a ROI.
    pub fn uses_roi(&self) -> bool {
        matches!(self, ExecutionPath::RoiOnly | ExecutionPath::RoiAndNoData)
    }

    /// Whether samples are screened for no-data.
    pub fn uses_nodata(&self) -> bool {
        matches!(self, ExecutionPath::NoDataOnly | ExecutionPath::RoiAndNoData)
    }
}

/// Immutable state shared by every region invocation of one engine.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub(crate) operator: Operator,
    pub(crate) num_sources: usize,
    pub(crate) num_bands: usize,
    pub(crate) data_type: DataType,
    pub(crate) destination_nodata: TypedScalars,
    pub(crate) operator_null: TypedScalars,
    pub(crate) nodata: Option<NoDataMask>,
    pub(crate) path: ExecutionPath,
}

impl EngineState {
    /// Validate the configuration against the sources and resolve the state.
    pub fn resolve(
        config: &AlgebraConfig,
        sources: &[SourceInfo],
        has_roi: bool,
    ) -> AlgebraResult<Self> {
        let operator = config
            .operator
            .ok_or_else(|| AlgebraError::InvalidOperator("no operator set".to_string()))?;

        let first = sources.first().ok_or(AlgebraError::NoSources)?;
        let hint = config.layout.unwrap_or_default();

        let data_type = hint.data_type.unwrap_or_else(|| {
            sources
                .iter()
                .skip(1)
                .fold(first.data_type, |acc, s| acc.promote(s.data_type))
        });

        if let Some(empty) = sources.iter().position(|s| s.num_bands == 0) {
            return Err(AlgebraError::InvalidLayout(format!("source {} has no bands", empty)));
        }
        let min_bands = sources.iter().map(|s| s.num_bands).min().unwrap_or(1);
        let max_bands = sources.iter().map(|s| s.num_bands).max().unwrap_or(1);
        let num_bands = match hint.num_bands {
            Some(0) => {
                return Err(AlgebraError::InvalidLayout(
                    "layout hint requests zero bands".to_string(),
                ))
            }
            Some(bands) => {
                if bands > min_bands {
                    warn!(
                        "Layout hint asks for {} bands but a source has only {}; its last band is repeated",
                        bands, min_bands
                    );
                }
                bands
            }
            None => {
                if min_bands != max_bands {
                    debug!(
                        "Sources disagree in band count ({}..{}), output capped at {}",
                        min_bands, max_bands, min_bands
                    );
                }
                min_bands
            }
        };

        let operator_null = TypedScalars::new(operator.null_value());
        let destination_nodata = TypedScalars::new(config.destination_nodata);
        let nodata = config
            .nodata
            .map(|range| NoDataMask::new(range, &operator_null));
        let path = ExecutionPath::select(has_roi, nodata.is_some());

        debug!(
            "Resolved {} over {} source(s): {} band(s) of {}, path {:?}",
            operator,
            sources.len(),
            num_bands,
            data_type,
            path
        );

        Ok(Self {
            operator,
            num_sources: sources.len(),
            num_bands,
            data_type,
            destination_nodata,
            operator_null,
            nodata,
            path,
        })
    }

    /// Operator applied across sources.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Number of sources the engine was built for.
    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    /// Number of output bands.
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    /// Output representation.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Destination no-data, precomputed for every representation.
    pub fn destination_nodata(&self) -> &TypedScalars {
        &self.destination_nodata
    }

    /// Operator null value, precomputed for every representation.
    pub fn operator_null(&self) -> &TypedScalars {
        &self.operator_null
    }

    /// The no-data mask, if a range was configured.
    pub fn nodata(&self) -> Option<&NoDataMask> {
        self.nodata.as_ref()
    }

    /// The execution path fixed at construction.
    pub fn path(&self) -> ExecutionPath {
        self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::nodata::NoDataRange;

    fn info(bands: usize, data_type: DataType) -> SourceInfo {
        SourceInfo {
            bounds: Rect::new(0, 0, 8, 8),
            num_bands: bands,
            data_type,
        }
    }

    fn sum_config() -> AlgebraConfig {
        AlgebraConfig::new().with_operator(Operator::Sum)
    }

    #[test]
    fn test_missing_operator() {
        let result = EngineState::resolve(&AlgebraConfig::new(), &[info(1, DataType::Byte)], false);
        assert!(matches!(result, Err(AlgebraError::InvalidOperator(_))));
    }

    #[test]
    fn test_no_sources() {
        let result = EngineState::resolve(&sum_config(), &[], false);
        assert!(matches!(result, Err(AlgebraError::NoSources)));
    }

    #[test]
    fn test_band_count_is_minimum() {
        let state = EngineState::resolve(
            &sum_config(),
            &[info(1, DataType::Byte), info(3, DataType::Byte)],
            false,
        )
        .unwrap();
        assert_eq!(state.num_bands(), 1);
        assert_eq!(state.num_sources(), 2);
    }

    #[test]
    fn test_layout_hint_wins() {
        let config = sum_config().with_num_bands(3).with_data_type(DataType::Double);
        let state = EngineState::resolve(
            &config,
            &[info(1, DataType::Byte), info(3, DataType::Short)],
            false,
        )
        .unwrap();
        assert_eq!(state.num_bands(), 3);
        assert_eq!(state.data_type(), DataType::Double);

        let zero = sum_config().with_num_bands(0);
        assert!(matches!(
            EngineState::resolve(&zero, &[info(1, DataType::Byte)], false),
            Err(AlgebraError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_output_type_promotion() {
        let state = EngineState::resolve(
            &sum_config(),
            &[info(1, DataType::UShort), info(1, DataType::Short)],
            false,
        )
        .unwrap();
        assert_eq!(state.data_type(), DataType::Int);

        let state = EngineState::resolve(
            &sum_config(),
            &[info(1, DataType::Byte), info(1, DataType::Float)],
            false,
        )
        .unwrap();
        assert_eq!(state.data_type(), DataType::Float);
    }

    #[test]
    fn test_sentinels_clamped_per_type() {
        let config = AlgebraConfig::new()
            .with_operator(Operator::Multiply)
            .with_destination_nodata(-500.0);
        let state = EngineState::resolve(&config, &[info(1, DataType::Byte)], false).unwrap();

        assert_eq!(state.destination_nodata().byte, 0);
        assert_eq!(state.destination_nodata().short, -500);
        assert_eq!(state.destination_nodata().ushort, 0);
        assert_eq!(state.operator_null().byte, 1);
        assert_eq!(state.operator_null().double, 1.0);
    }

    #[test]
    fn test_exactly_one_path() {
        for (roi, nodata, expected) in [
            (false, false, ExecutionPath::Plain),
            (true, false, ExecutionPath::RoiOnly),
            (false, true, ExecutionPath::NoDataOnly),
            (true, true, ExecutionPath::RoiAndNoData),
        ] {
            let mut config = sum_config();
            if nodata {
                config = config.with_nodata(NoDataRange::exact(0.0));
            }
            let state = EngineState::resolve(&config, &[info(1, DataType::Int)], roi).unwrap();
            assert_eq!(state.path(), expected);
            assert_eq!(state.path().uses_roi(), roi);
            assert_eq!(state.path().uses_nodata(), nodata);
            assert_eq!(state.nodata().is_some(), nodata);
        }
    }

    #[test]
    fn test_zero_band_source_rejected() {
        let result = EngineState::resolve(&sum_config(), &[info(0, DataType::Byte)], false);
        assert!(matches!(result, Err(AlgebraError::InvalidLayout(_))));
        assert!(result.unwrap_err().is_construction_error());
    }

    #[test]
    fn test_every_operator_resolves_for_every_type() {
        for op in Operator::ALL {
            for data_type in DataType::ALL {
                let config = AlgebraConfig::new().with_operator(op);
                let state = EngineState::resolve(&config, &[info(1, data_type)], false).unwrap();
                assert_eq!(state.data_type(), data_type);
                assert_eq!(state.operator(), op);
            }
        }
    }
}

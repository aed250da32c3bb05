//! Engine configuration.
//!
//! # Example
//!
//! ```ignore
//! let config = AlgebraConfig::new()
//!     .with_operator(Operator::Sum)
//!     .with_nodata(NoDataRange::exact(0.0))
//!     .with_destination_nodata(-1.0);
//! ```

use crate::algebra::nodata::NoDataRange;
use crate::algebra::operator::Operator;
use crate::core::error::AlgebraResult;
use crate::core::types::DataType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Destination layout the caller wants to force.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutHint {
    /// Output representation; widest source representation when unset.
    #[serde(default)]
    pub data_type: Option<DataType>,
    /// Output band count; smallest source band count when unset.
    #[serde(default)]
    pub num_bands: Option<usize>,
}

/// Everything needed to build an engine besides the sources and ROI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgebraConfig {
    /// Operator applied across sources. Must be set.
    #[serde(default)]
    pub operator: Option<Operator>,
    /// Input values treated as absent, shared by every source and band.
    #[serde(default)]
    pub nodata: Option<NoDataRange>,
    /// Value written where no result exists.
    #[serde(default)]
    pub destination_nodata: f64,
    /// Optional destination layout.
    #[serde(default)]
    pub layout: Option<LayoutHint>,
}

impl Default for AlgebraConfig {
    fn default() -> Self {
        Self {
            operator: None,
            nodata: None,
            destination_nodata: 0.0,
            layout: None,
        }
    }
}

impl AlgebraConfig {
    /// Create a configuration with no operator set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operator.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Set the no-data range.
    pub fn with_nodata(mut self, range: NoDataRange) -> Self {
        self.nodata = Some(range);
        self
    }

    /// Set the destination no-data value.
    pub fn with_destination_nodata(mut self, value: f64) -> Self {
        self.destination_nodata = value;
        self
    }

    /// Force the output representation.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.layout.get_or_insert_with(LayoutHint::default).data_type = Some(data_type);
        self
    }

    /// Force the output band count.
    pub fn with_num_bands(mut self, bands: usize) -> Self {
        self.layout.get_or_insert_with(LayoutHint::default).num_bands = Some(bands);
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> AlgebraResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> AlgebraResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> AlgebraResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> AlgebraResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

//! Multi-source per-pixel algebra.
//!
//! This module contains the engine proper:
//! - The operator table and its per-representation folds
//! - No-data ranges and the byte lookup tables
//! - The ROI capability
//! - Construction-time band/type reconciliation
//! - The raster kernel and the region dispatcher

pub mod config;
pub mod engine;
pub mod kernel;
pub mod nodata;
pub mod operator;
pub mod reconcile;
pub mod roi;

pub use config::{AlgebraConfig, LayoutHint};
pub use engine::{AlgebraEngine, RegionOutcome};
pub use kernel::PixelRule;
pub use nodata::{NoDataMask, NoDataRange, NoDataScreen};
pub use operator::{FoldFn, Operator, Reduce};
pub use reconcile::{EngineState, ExecutionPath, SourceInfo};
pub use roi::{MaskRoi, RectRoi, Roi};

//! # Raster Algebra - Multi-source per-pixel arithmetic
//!
//! Combines any number of source rasters pixel by pixel with one of four
//! operators (sum, subtract, multiply, divide), band by band, over six
//! sample representations: byte, ushort, short, int, float and double.
//!
//! ## Features
//!
//! - **Saturating arithmetic**: results clamp to the output representation,
//!   integer division by zero saturates toward the dividend's sign
//! - **No-data handling**: absent samples are replaced by the operator's
//!   identity; a pixel is no-data only when every operand is
//! - **Regions of interest**: pixels outside the ROI get the destination
//!   no-data value, whole regions outside it skip the kernel entirely
//! - **Band/type reconciliation**: mixed band counts and representations
//!   are resolved once, at construction
//! - **Parallel tiling**: the engine is immutable, so tiles are computed
//!   concurrently with rayon
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use raster_algebra::prelude::*;
//!
//! let bounds = Rect::new(0, 0, 512, 512);
//! let a = RasterImage::constant(bounds, DataType::Byte, &[50.0]);
//! let b = RasterImage::constant(bounds, DataType::Byte, &[100.0]);
//!
//! let config = AlgebraConfig::new()
//!     .with_operator(Operator::Sum)
//!     .with_nodata(NoDataRange::exact(0.0));
//! let engine = AlgebraEngine::new(&config, &[&a, &b], None)?;
//!
//! let output = TiledExecutor::new(ProcessingConfig::new())
//!     .execute(&engine, &[&a, &b], bounds, None)?;
//! assert_eq!(output.image.get::<u8>(0, 0, 0), Some(150));
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Data types, sample trait, raster buffers and errors
//! - [`algebra`]: Operators, no-data, ROI, reconciliation, kernel and dispatcher
//! - [`execution`]: Tiled execution driver with progress reporting

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algebra;
pub mod core;
pub mod execution;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use raster_algebra::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{DataType, Rect};
    pub use crate::core::sample::{Sample, TypedScalars};
    pub use crate::core::raster::{
        RasterImage, RasterSource, RegionBuffer, SampleData, SampleLayout, SourceTile, Window,
    };

    // Errors
    pub use crate::core::error::{AlgebraError, AlgebraResult};

    // Algebra
    pub use crate::algebra::config::{AlgebraConfig, LayoutHint};
    pub use crate::algebra::engine::{AlgebraEngine, RegionOutcome};
    pub use crate::algebra::nodata::{NoDataMask, NoDataRange};
    pub use crate::algebra::operator::{Operator, Reduce};
    pub use crate::algebra::reconcile::{EngineState, ExecutionPath, SourceInfo};
    pub use crate::algebra::roi::{MaskRoi, RectRoi, Roi};

    // Execution
    pub use crate::execution::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
    pub use crate::execution::tiled::{
        ExecutionStats, ProcessingConfig, TileIterator, TiledExecutor, TiledOutput,
    };
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

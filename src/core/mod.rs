//! Core types shared by the algebra engine and its drivers.
//!
//! This module contains:
//! - Value types (data types, rectangles)
//! - The sample trait over the six supported representations
//! - Raster buffers, sample layouts and windowed views
//! - Error types

pub mod types;
pub mod error;
pub mod sample;
pub mod raster;

// Re-export commonly used types
pub use types::{DataType, Rect};
pub use error::{AlgebraError, AlgebraResult};
pub use sample::{Sample, TypedScalars};
pub use raster::{RasterImage, RasterSource, RegionBuffer, SampleData, SampleLayout, SourceTile, Window};

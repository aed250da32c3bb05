//! Error types for raster algebra.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Fail fast at engine construction, before any region is computed
//! - Name the offending value (operator name, data type, counts)
//! - Wrap configuration and I/O failures from the ambient layers

use crate::core::types::Rect;
use thiserror::Error;

/// Top-level error type for raster algebra.
///
/// Per-pixel numeric edge cases (division by zero, overflow) are never
/// reported here; they saturate deterministically inside the kernels.
#[derive(Error, Debug)]
pub enum AlgebraError {
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    #[error("Unsupported representation: {0}")]
    UnsupportedRepresentation(String),

    #[error("Geometry mismatch for {what}: expected {expected}, got {actual}")]
    GeometryMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("At least one source raster is required")]
    NoSources,

    #[error("Region {region} is not covered by {what} bounds {bounds}")]
    RegionOutOfBounds {
        what: &'static str,
        region: Rect,
        bounds: Rect,
    },

    #[error("Invalid sample layout: {0}")]
    InvalidLayout(String),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl AlgebraError {
    /// Check if this error rejects an engine configuration.
    ///
    /// Construction errors abort engine creation; nothing is computed.
    /// `InvalidLayout` is also raised for malformed sample buffers.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            AlgebraError::InvalidOperator(_)
                | AlgebraError::NoSources
                | AlgebraError::InvalidLayout(_)
                | AlgebraError::Config(_)
        )
    }

    /// Get a suggestion for fixing this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            AlgebraError::InvalidOperator(_) => {
                Some("Use one of: sum, subtract, multiply, divide".to_string())
            }
            AlgebraError::UnsupportedRepresentation(_) => Some(
                "Use one of: byte, ushort, short, int, float, double".to_string(),
            ),
            AlgebraError::GeometryMismatch { what, expected, .. } => {
                Some(format!("Provide exactly {} {}", expected, what))
            }
            _ => None,
        }
    }
}

/// Result type alias for raster algebra operations.
pub type AlgebraResult<T> = Result<T, AlgebraError>;

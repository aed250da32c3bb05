//! Execution module.
//!
//! This module drives an engine over whole images, tile by tile.

pub mod progress;
pub mod tiled;

pub use progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
pub use tiled::{ExecutionStats, ProcessingConfig, TileIterator, TiledExecutor, TiledOutput};

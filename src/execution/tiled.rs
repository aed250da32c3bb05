//! Tiled execution of an [`AlgebraEngine`] over a whole image.
//!
//! The image bounds are split into tiles, every tile is computed into its
//! own destination raster (in parallel with rayon when enabled) and the
//! tiles are stitched into one output raster afterwards.
//!
//! # Example
//!
//! ```ignore
//! let config = ProcessingConfig::new()
//!     .with_tile_size(256, 256)
//!     .with_threads(4);
//!
//! let output = TiledExecutor::new(config).execute(&engine, &sources, bounds, None)?;
//! println!("{} tiles in {:?}", output.stats.tiles_total, output.stats.total_duration);
//! ```

use crate::algebra::engine::{AlgebraEngine, RegionOutcome};
use crate::core::error::AlgebraResult;
use crate::core::raster::{RasterImage, RasterSource};
use crate::core::types::Rect;
use crate::execution::progress::ProgressTracker;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Minimum tile size in pixels
pub const MIN_TILE_SIZE: u32 = 64;

/// Maximum tile size in pixels
pub const MAX_TILE_SIZE: u32 = 4096;

/// Configuration for tiled processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Preferred tile width.
    pub tile_width: u32,
    /// Preferred tile height.
    pub tile_height: u32,
    /// Whether to process tiles in parallel.
    pub parallel: bool,
    /// Number of worker threads (0 = rayon's global pool).
    pub num_threads: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            tile_width: 512,
            tile_height: 512,
            parallel: true,
            num_threads: 0,
        }
    }
}

impl ProcessingConfig {
    /// Create a new processing configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tile size.
    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_width = width.clamp(MIN_TILE_SIZE, MAX_TILE_SIZE);
        self.tile_height = height.clamp(MIN_TILE_SIZE, MAX_TILE_SIZE);
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }
}

/// Iterator over tiles in row-major order.
#[derive(Debug, Clone)]
pub struct TileIterator {
    bounds: Rect,
    tile_width: u32,
    tile_height: u32,
    current_x: u32,
    current_y: u32,
}

impl TileIterator {
    /// Create a new tile iterator over `bounds`.
    pub fn new(bounds: Rect, tile_width: u32, tile_height: u32) -> Self {
        Self {
            bounds,
            tile_width: tile_width.max(1),
            tile_height: tile_height.max(1),
            current_x: bounds.x,
            current_y: if bounds.is_empty() { bounds.bottom() } else { bounds.y },
        }
    }

    /// Get the total number of tiles.
    pub fn tile_count(&self) -> usize {
        if self.bounds.is_empty() {
            return 0;
        }
        let tiles_x = self.bounds.width.div_ceil(self.tile_width) as usize;
        let tiles_y = self.bounds.height.div_ceil(self.tile_height) as usize;
        tiles_x * tiles_y
    }
}

impl Iterator for TileIterator {
    type Item = Rect;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_y >= self.bounds.bottom() {
            return None;
        }

        let x = self.current_x;
        let y = self.current_y;
        let width = self.tile_width.min(self.bounds.right() - x);
        let height = self.tile_height.min(self.bounds.bottom() - y);

        self.current_x += width;
        if self.current_x >= self.bounds.right() {
            self.current_x = self.bounds.x;
            self.current_y += height;
        }

        Some(Rect::new(x, y, width, height))
    }
}

/// Tiled execution statistics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    /// Total execution time.
    pub total_duration: Duration,
    /// Number of tiles the image was split into.
    pub tiles_total: usize,
    /// Tiles the kernel ran over.
    pub tiles_computed: usize,
    /// Tiles filled by the ROI fast path.
    pub tiles_outside_roi: usize,
}

/// Result of a tiled execution.
#[derive(Debug, Clone)]
pub struct TiledOutput {
    /// The stitched output raster.
    pub image: RasterImage,
    /// Execution statistics.
    pub stats: ExecutionStats,
}

/// Drives an engine over every tile of an image.
#[derive(Debug, Clone, Default)]
pub struct TiledExecutor {
    config: ProcessingConfig,
}

impl TiledExecutor {
    /// Create an executor with the given processing configuration.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// The processing configuration.
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Tiles covering `bounds`.
    pub fn tiles(&self, bounds: Rect) -> TileIterator {
        TileIterator::new(bounds, self.config.tile_width, self.config.tile_height)
    }

    /// Compute `bounds` tile by tile and stitch the result.
    ///
    /// A supplied tracker is started before the first tile and completed
    /// after the last one; it is not completed when a tile fails.
    pub fn execute(
        &self,
        engine: &AlgebraEngine,
        sources: &[&dyn RasterSource],
        bounds: Rect,
        mut progress: Option<&mut ProgressTracker>,
    ) -> AlgebraResult<TiledOutput> {
        let start_time = Instant::now();
        if let Some(tracker) = progress.as_deref_mut() {
            tracker.start();
        }
        let progress = progress.as_deref();
        let tiles: Vec<Rect> = self.tiles(bounds).collect();
        debug!(
            "Executing {} tile(s) over {} ({})",
            tiles.len(),
            bounds,
            if self.config.parallel { "parallel" } else { "sequential" }
        );

        let compute_tile = |rect: &Rect| -> AlgebraResult<(RasterImage, RegionOutcome)> {
            let tile_start = Instant::now();
            let mut tile = engine.create_destination(*rect);
            let outcome = engine.compute_region(sources, &mut tile, *rect)?;
            if let Some(tracker) = progress {
                tracker.tile_completed(
                    *rect,
                    outcome == RegionOutcome::OutsideRoi,
                    tile_start.elapsed().as_micros() as u64,
                );
            }
            Ok((tile, outcome))
        };

        let results: Vec<(RasterImage, RegionOutcome)> = if !self.config.parallel {
            tiles.iter().map(compute_tile).collect::<AlgebraResult<_>>()?
        } else if self.config.num_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.num_threads)
                .build()?;
            pool.install(|| tiles.par_iter().map(compute_tile).collect::<AlgebraResult<_>>())?
        } else {
            tiles.par_iter().map(compute_tile).collect::<AlgebraResult<_>>()?
        };

        let mut stats = ExecutionStats {
            tiles_total: tiles.len(),
            ..Default::default()
        };
        let mut image = engine.create_destination(bounds);
        for (tile, outcome) in &results {
            match outcome {
                RegionOutcome::Computed => stats.tiles_computed += 1,
                RegionOutcome::OutsideRoi => stats.tiles_outside_roi += 1,
                RegionOutcome::Empty => {}
            }
            image.copy_from(tile)?;
        }
        stats.total_duration = start_time.elapsed();
        if let Some(tracker) = progress {
            tracker.complete();
        }

        info!(
            "Computed {} tile(s), {} outside ROI, in {:?}",
            stats.tiles_computed, stats.tiles_outside_roi, stats.total_duration
        );
        Ok(TiledOutput { image, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::config::AlgebraConfig;
    use crate::algebra::nodata::NoDataRange;
    use crate::algebra::operator::Operator;
    use crate::algebra::roi::{RectRoi, Roi};
    use crate::core::error::AlgebraError;
    use crate::core::types::DataType;
    use crate::execution::progress::ProgressUpdate;
    use std::sync::Arc;

    #[test]
    fn test_tile_iterator() {
        let iter = TileIterator::new(Rect::new(0, 0, 1000, 1000), 256, 256);
        assert_eq!(iter.tile_count(), 16); // 4x4 tiles

        let tiles: Vec<_> = TileIterator::new(Rect::new(0, 0, 100, 100), 64, 64).collect();
        assert_eq!(tiles.len(), 4); // 2x2 tiles
        assert_eq!(tiles[0], Rect::new(0, 0, 64, 64));

        // Last tile is smaller
        assert_eq!(tiles[3], Rect::new(64, 64, 36, 36));
    }

    #[test]
    fn test_tile_iterator_offset_bounds() {
        let bounds = Rect::new(10, 20, 130, 70);
        let iter = TileIterator::new(bounds, 64, 64);
        assert_eq!(iter.tile_count(), 6);

        let tiles: Vec<_> = iter.collect();
        assert_eq!(tiles.len(), 6);
        assert_eq!(tiles[0], Rect::new(10, 20, 64, 64));
        assert_eq!(tiles[2], Rect::new(138, 20, 2, 64));
        assert_eq!(tiles[5], Rect::new(138, 84, 2, 6));
        let area: u64 = tiles.iter().map(|t| t.area()).sum();
        assert_eq!(area, bounds.area());

        assert_eq!(TileIterator::new(Rect::new(5, 5, 0, 10), 64, 64).count(), 0);
    }

    #[test]
    fn test_processing_config() {
        let config = ProcessingConfig::new()
            .with_tile_size(16, 10_000)
            .with_threads(2)
            .with_parallel(false);

        assert_eq!(config.tile_width, MIN_TILE_SIZE);
        assert_eq!(config.tile_height, MAX_TILE_SIZE);
        assert_eq!(config.num_threads, 2);
        assert!(!config.parallel);

        let parsed: ProcessingConfig = serde_json::from_str(r#"{"tile_width": 128}"#).unwrap();
        assert_eq!(parsed.tile_width, 128);
        assert!(parsed.parallel);
    }

    fn gradient(bounds: Rect) -> RasterImage {
        let samples: Vec<i32> = (0..bounds.area() as i32).collect();
        RasterImage::from_vec(bounds, 1, samples).unwrap()
    }

    fn execute_with(config: ProcessingConfig) -> TiledOutput {
        let bounds = Rect::new(0, 0, 200, 150);
        let a = gradient(bounds);
        let b = RasterImage::constant(bounds, DataType::Int, &[2.0]);
        let engine = AlgebraEngine::new(
            &AlgebraConfig::new().with_operator(Operator::Multiply),
            &[&a, &b],
            None,
        )
        .unwrap();
        TiledExecutor::new(config)
            .execute(&engine, &[&a, &b], bounds, None)
            .unwrap()
    }

    #[test]
    fn test_tiled_matches_single_region() {
        let sequential = execute_with(ProcessingConfig::new().with_tile_size(64, 64).with_parallel(false));
        let parallel = execute_with(ProcessingConfig::new().with_tile_size(64, 64));
        let pooled = execute_with(ProcessingConfig::new().with_tile_size(64, 64).with_threads(2));

        assert_eq!(sequential.stats.tiles_total, 12);
        assert_eq!(sequential.stats.tiles_computed, 12);
        assert_eq!(sequential.image, parallel.image);
        assert_eq!(sequential.image, pooled.image);
        assert_eq!(sequential.image.get::<i32>(199, 149, 0), Some(2 * (149 * 200 + 199)));
    }

    #[test]
    fn test_roi_tiles_skipped() {
        let bounds = Rect::new(0, 0, 256, 256);
        let a = RasterImage::constant(bounds, DataType::Float, &[1.0]);
        let roi: Arc<dyn Roi> = Arc::new(RectRoi::new(Rect::new(0, 0, 64, 64)));
        let config = AlgebraConfig::new()
            .with_operator(Operator::Sum)
            .with_nodata(NoDataRange::nan())
            .with_destination_nodata(-1.0);
        let engine = AlgebraEngine::new(&config, &[&a, &a], Some(roi)).unwrap();

        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut tracker = ProgressTracker::new(16).with_callback(Box::new(move |update| {
            match update {
                ProgressUpdate::Started { .. } => sink.lock().push("started"),
                ProgressUpdate::Completed { .. } => sink.lock().push("completed"),
                _ => {}
            }
        }));
        let output = TiledExecutor::new(ProcessingConfig::new().with_tile_size(64, 64))
            .execute(&engine, &[&a, &a], bounds, Some(&mut tracker))
            .unwrap();

        assert_eq!(output.stats.tiles_computed, 1);
        assert_eq!(output.stats.tiles_outside_roi, 15);
        assert_eq!(tracker.progress_percent(), 100.0);
        assert_eq!(*events.lock(), vec!["started", "completed"]);
        assert_eq!(output.image.get::<f32>(10, 10, 0), Some(2.0));
        assert_eq!(output.image.get::<f32>(100, 10, 0), Some(-1.0));
    }

    #[test]
    fn test_missing_source_coverage_propagates() {
        let a = RasterImage::constant(Rect::new(0, 0, 100, 100), DataType::Byte, &[1.0]);
        let small = RasterImage::constant(Rect::new(0, 0, 50, 50), DataType::Byte, &[1.0]);
        let engine = AlgebraEngine::new(
            &AlgebraConfig::new().with_operator(Operator::Sum),
            &[&a, &small],
            None,
        )
        .unwrap();

        let result = TiledExecutor::default().execute(&engine, &[&a, &small], a.bounds(), None);
        assert!(matches!(result, Err(AlgebraError::RegionOutOfBounds { .. })));
    }
}

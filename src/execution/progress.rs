//! Progress tracking for tiled execution.

use crate::core::types::Rect;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A progress update event.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    /// Execution has started.
    Started {
        total_tiles: usize,
    },
    /// A tile has been written.
    TileCompleted {
        tile: Rect,
        outside_roi: bool,
        duration_us: u64,
        index: usize,
        total: usize,
    },
    /// Overall progress percentage.
    Progress {
        percent: f32,
        elapsed_ms: u64,
        estimated_remaining_ms: Option<u64>,
    },
    /// Execution has completed.
    Completed {
        total_duration_ms: u64,
        tiles_computed: usize,
        tiles_outside_roi: usize,
    },
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Tracks tile progress. Shared by reference across worker threads.
pub struct ProgressTracker {
    /// Total number of tiles to process.
    total_tiles: usize,
    /// Tiles the kernel ran over.
    computed_tiles: AtomicU64,
    /// Tiles filled by the ROI fast path.
    outside_roi_tiles: AtomicU64,
    /// Start time.
    start_time: Option<Instant>,
    /// Progress callback.
    callback: Option<ProgressCallback>,
    /// Tile durations in microseconds, for estimation.
    tile_times: parking_lot::Mutex<Vec<u64>>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new(total_tiles: usize) -> Self {
        Self {
            total_tiles,
            computed_tiles: AtomicU64::new(0),
            outside_roi_tiles: AtomicU64::new(0),
            start_time: None,
            callback: None,
            tile_times: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Create a progress tracker wrapped in Arc for sharing.
    pub fn new_shared(total_tiles: usize) -> Arc<Self> {
        Arc::new(Self::new(total_tiles))
    }

    /// Set a callback for progress updates.
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Total number of tiles.
    pub fn total_tiles(&self) -> usize {
        self.total_tiles
    }

    /// Start tracking.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.send_update(ProgressUpdate::Started {
            total_tiles: self.total_tiles,
        });
    }

    /// Report that a tile has been written.
    pub fn tile_completed(&self, tile: Rect, outside_roi: bool, duration_us: u64) {
        if outside_roi {
            self.outside_roi_tiles.fetch_add(1, Ordering::Relaxed);
        } else {
            self.computed_tiles.fetch_add(1, Ordering::Relaxed);
        }
        self.tile_times.lock().push(duration_us);

        self.send_update(ProgressUpdate::TileCompleted {
            tile,
            outside_roi,
            duration_us,
            index: self.finished(),
            total: self.total_tiles,
        });
        self.send_progress_update();
    }

    /// Complete tracking.
    pub fn complete(&self) {
        let duration = self
            .start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        self.send_update(ProgressUpdate::Completed {
            total_duration_ms: duration,
            tiles_computed: self.computed_tiles.load(Ordering::Relaxed) as usize,
            tiles_outside_roi: self.outside_roi_tiles.load(Ordering::Relaxed) as usize,
        });
    }

    /// Get current progress percentage.
    pub fn progress_percent(&self) -> f32 {
        if self.total_tiles == 0 {
            return 100.0;
        }
        (self.finished() as f32 / self.total_tiles as f32) * 100.0
    }

    /// Estimate remaining time in milliseconds.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        let times = self.tile_times.lock();
        if times.is_empty() {
            return None;
        }

        let avg_us: u64 = times.iter().sum::<u64>() / times.len() as u64;
        let remaining = self.total_tiles.saturating_sub(self.finished());

        Some(avg_us * remaining as u64 / 1000)
    }

    fn finished(&self) -> usize {
        (self.computed_tiles.load(Ordering::Relaxed) + self.outside_roi_tiles.load(Ordering::Relaxed))
            as usize
    }

    fn send_update(&self, update: ProgressUpdate) {
        if let Some(ref callback) = self.callback {
            callback(update);
        }
    }

    fn send_progress_update(&self) {
        let elapsed = self
            .start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        self.send_update(ProgressUpdate::Progress {
            percent: self.progress_percent(),
            elapsed_ms: elapsed,
            estimated_remaining_ms: self.estimated_remaining_ms(),
        });
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total_tiles", &self.total_tiles)
            .field("finished", &self.finished())
            .finish()
    }
}

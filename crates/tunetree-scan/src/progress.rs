//! Build progress reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Progress information while a tree is being built.
#[derive(Debug, Clone)]
pub struct BuildProgress {
    /// Path currently being visited.
    pub current_path: PathBuf,
    /// Number of folders visited so far.
    pub folders_visited: u64,
    /// Number of songs found so far.
    pub songs_found: u64,
    /// Number of warnings encountered.
    pub warnings_count: u64,
    /// Time elapsed since the build started.
    pub elapsed: Duration,
}

impl BuildProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            current_path: PathBuf::new(),
            folders_visited: 0,
            songs_found: 0,
            warnings_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Get total items visited (folders + songs).
    pub fn total_items(&self) -> u64 {
        self.folders_visited + self.songs_found
    }

    /// Calculate the visit rate in items per second.
    pub fn items_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.total_items() as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for BuildProgress {
    fn default() -> Self {
        Self::new()
    }
}

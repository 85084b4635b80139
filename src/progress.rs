// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::plan::SeriesStatus;

/// Minimum time between two transfer rate samples
pub const RATE_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

/// Weight of the newest sample in the smoothed transfer rate
const RATE_SMOOTHING: f64 = 0.3;

/// Progress of a single transfer
///
/// Every download owns its own value, so concurrent transfers never share
/// rate state.
#[derive(Debug, Clone, Copy)]
pub struct TransferProgress {
    bytes_so_far: u64,
    total: Option<u64>,
    started: Instant,
    last_sample: Instant,
    bytes_at_last_sample: u64,
    smoothed_rate: Option<f64>,
}

impl TransferProgress {
    /// Start tracking a transfer of `total` bytes, if known
    pub fn new(total: Option<u64>) -> Self {
        Self::starting_at(total, Instant::now())
    }

    pub fn starting_at(total: Option<u64>, now: Instant) -> Self {
        Self {
            bytes_so_far: 0,
            total,
            started: now,
            last_sample: now,
            bytes_at_last_sample: 0,
            smoothed_rate: None,
        }
    }

    /// Account for `bytes` more bytes written
    pub fn record(&mut self, bytes: u64) {
        self.record_at(bytes, Instant::now());
    }

    pub fn record_at(&mut self, bytes: u64, now: Instant) {
        self.bytes_so_far += bytes;

        let elapsed = now.saturating_duration_since(self.last_sample);
        if elapsed < RATE_SAMPLE_INTERVAL {
            return;
        }

        let sampled = (self.bytes_so_far - self.bytes_at_last_sample) as f64 / elapsed.as_secs_f64();
        self.smoothed_rate = Some(match self.smoothed_rate {
            Some(previous) => RATE_SMOOTHING * sampled + (1.0 - RATE_SMOOTHING) * previous,
            None => sampled,
        });
        self.last_sample = now;
        self.bytes_at_last_sample = self.bytes_so_far;
    }

    pub fn bytes_so_far(&self) -> u64 {
        self.bytes_so_far
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Completion percentage, only when the total size is known
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => {
                Some((self.bytes_so_far as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }

    /// Smoothed transfer rate in bytes per second, once a sample has been taken
    pub fn rate(&self) -> Option<f64> {
        self.smoothed_rate
    }
}

/// Format a byte rate as a bit rate ("Kbps" or "Mbps")
pub fn format_rate(bytes_per_sec: f64) -> String {
    let kbits = bytes_per_sec * 8.0 / 1024.0;
    if kbits > 1024.0 {
        format!("{:.2} Mbps", kbits / 1024.0)
    } else {
        format!("{:.2} Kbps", kbits)
    }
}

/// Events emitted during a sync pass for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A sync pass over the registry is starting
    SyncStarting { series_count: usize },

    /// A series' remote list is being fetched
    CheckingSeries {
        /// Position of the series in the registry
        series_id: usize,
        url: String,
    },

    /// Remote and local lists have been compared
    SeriesChecked {
        series_id: usize,
        url: String,
        status: SeriesStatus,
    },

    /// A download is starting
    DownloadStarting {
        series_id: usize,
        episode_name: String,
        /// Index of this episode among the series' pending episodes
        episode_index: usize,
        /// Number of pending episodes in the series
        total_to_download: usize,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        series_id: usize,
        episode_name: String,
        progress: TransferProgress,
    },

    /// A download completed and was recorded
    DownloadCompleted {
        series_id: usize,
        episode_name: String,
        bytes_downloaded: u64,
    },

    /// A download failed; the rest of the series is skipped
    DownloadFailed {
        series_id: usize,
        episode_name: String,
        error: String,
    },

    /// A series could not be checked
    SeriesFailed {
        series_id: usize,
        url: String,
        error: String,
    },

    /// Sync pass completed
    SyncCompleted {
        downloaded_count: usize,
        up_to_date_count: usize,
        failed_count: usize,
    },
}

/// Trait for reporting progress events during synchronization.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress snapshot reported by FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percentage of `total_secs` encoded so far, capped at 100.
    pub fn percent_of(&self, total_secs: f64) -> u8 {
        if total_secs <= 0.0 || !total_secs.is_finite() {
            return 0;
        }
        let pct = (self.out_time_ms as f64 / 1000.0) / total_secs * 100.0;
        pct.clamp(0.0, 100.0) as u8
    }
}

//! Video encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Video codec used for every delivered clip (H.264)
pub const VIDEO_CODEC: &str = "libx264";
/// Audio codec used for every delivered clip
pub const AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Default encoder thread count
pub const DEFAULT_THREADS: u8 = 4;

/// Video encoding configuration.
///
/// Codecs are fixed so that every clip plays inline in chat clients;
/// only the quality knobs are tunable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Encoder threads
    #[serde(default = "default_threads")]
    pub threads: u8,
}

fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_threads() -> u8 {
    DEFAULT_THREADS
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            threads: DEFAULT_THREADS,
        }
    }
}

impl EncodingConfig {
    /// Create a new encoding configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config with updated CRF (clamped to 0-51).
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf.min(51);
        self
    }

    /// Returns a new config with updated preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            VIDEO_CODEC.to_string(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            AUDIO_CODEC.to_string(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-threads".to_string(),
            self.threads.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

//! yt-dlp and FFmpeg CLI wrappers for fetching and transforming clips.
//!
//! This crate provides:
//! - Source download through yt-dlp
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - A single-pass trim, crop and encode engine

pub mod command;
pub mod download;
pub mod engine;
pub mod error;
pub mod probe;
pub mod progress;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, preflight, FfmpegCommand, FfmpegRunner, ToolPaths};
pub use download::{clear_cache, FetchedVideo, VideoFetcher, YtDlpFetcher};
pub use engine::{FfmpegEngine, MediaEngine, MediaHandle};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;

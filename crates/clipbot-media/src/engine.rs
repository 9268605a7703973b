//! Trim, crop and encode through FFmpeg.
//!
//! A [`MediaHandle`] accumulates edits without touching the file; the engine
//! renders all of them in a single FFmpeg pass when [`MediaEngine::encode`]
//! is called.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use clipbot_models::{AspectRatio, CropRect, EncodingConfig, TimeRange};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};

/// Rounds both output dimensions down to even numbers, which yuv420p requires.
const EVEN_DIMENSIONS_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// An opened source file plus the edits queued against it.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaHandle {
    source: PathBuf,
    info: VideoInfo,
    trim: Option<TimeRange>,
    crop: Option<CropRect>,
}

impl MediaHandle {
    pub fn new(source: impl Into<PathBuf>, info: VideoInfo) -> Self {
        Self {
            source: source.into(),
            info,
            trim: None,
            crop: None,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Source duration in seconds; 0 when unknown.
    pub fn duration(&self) -> f64 {
        self.info.duration
    }

    /// Source frame size `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    pub fn trim_range(&self) -> Option<TimeRange> {
        self.trim
    }

    pub fn crop_rect(&self) -> Option<CropRect> {
        self.crop
    }

    /// Keep only `range` of the source.
    ///
    /// An end past the source duration is left to FFmpeg, which stops at the
    /// last frame. A start at or past a known duration would yield an empty
    /// clip and is rejected.
    pub fn trim(mut self, range: TimeRange) -> MediaResult<Self> {
        let duration = self.duration();
        if duration > 0.0 && range.start >= duration {
            return Err(MediaError::invalid_trim(format!(
                "start {:.2}s is beyond the video length of {:.2}s",
                range.start, duration
            )));
        }
        self.trim = Some(range);
        Ok(self)
    }

    /// Crop to an explicit rectangle, which must lie inside the frame.
    pub fn crop(mut self, rect: CropRect) -> MediaResult<Self> {
        let (width, height) = self.dimensions();
        if !rect.fits_within(width, height) {
            return Err(MediaError::invalid_crop(format!(
                "{}x{}+{}+{} does not fit in a {}x{} frame",
                rect.width, rect.height, rect.x, rect.y, width, height
            )));
        }
        self.crop = Some(rect);
        Ok(self)
    }

    /// Crop to the largest centered rectangle at `ratio`; no-op for the original ratio.
    pub fn crop_to_ratio(self, ratio: AspectRatio) -> MediaResult<Self> {
        if ratio == AspectRatio::Original {
            return Ok(self);
        }
        let (width, height) = self.dimensions();
        let rect = CropRect::centered(width, height, ratio).ok_or_else(|| {
            MediaError::invalid_crop(format!(
                "a {}x{} frame is too small for {}",
                width, height, ratio
            ))
        })?;
        self.crop(rect)
    }

    /// Length of the rendered output in seconds, as far as it is known up front.
    pub fn output_duration(&self) -> f64 {
        match self.trim {
            Some(range) if self.duration() > 0.0 => range.end.min(self.duration()) - range.start,
            Some(range) => range.duration(),
            None => self.duration(),
        }
    }

    /// Frame size after the crop.
    pub fn output_dimensions(&self) -> (u32, u32) {
        self.crop
            .map(|r| (r.width, r.height))
            .unwrap_or_else(|| self.dimensions())
    }

    /// FFmpeg invocation rendering every queued edit into `output`.
    pub fn to_command(&self, output: impl AsRef<Path>, encoding: &EncodingConfig) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(&self.source, output);

        if let Some(range) = self.trim {
            cmd = cmd.seek(range.start).duration(range.duration());
        }

        let mut filters = Vec::new();
        if let Some(rect) = self.crop {
            filters.push(rect.to_ffmpeg_filter());
        }
        let (out_w, out_h) = self.output_dimensions();
        if out_w % 2 != 0 || out_h % 2 != 0 {
            filters.push(EVEN_DIMENSIONS_FILTER.to_string());
        }
        if !filters.is_empty() {
            cmd = cmd.video_filter(filters.join(","));
        }

        cmd.output_args(["-map", "0:v:0", "-map", "0:a:0?"])
            .output_args(encoding.to_ffmpeg_args())
    }
}

/// Opens, edits and encodes media files.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Inspect `path` and return a handle with no edits queued.
    async fn open(&self, path: &Path) -> MediaResult<MediaHandle>;

    /// Render `handle` into `output` with the fixed codecs.
    async fn encode(
        &self,
        handle: &MediaHandle,
        output: &Path,
        encoding: &EncodingConfig,
    ) -> MediaResult<PathBuf>;
}

/// [`MediaEngine`] backed by the `ffprobe` and `ffmpeg` CLIs.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    timeout_secs: Option<u64>,
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill an encode that runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn open(&self, path: &Path) -> MediaResult<MediaHandle> {
        let info = probe_video(path).await?;
        debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            duration = info.duration,
            "Opened source video"
        );
        Ok(MediaHandle::new(path, info))
    }

    async fn encode(
        &self,
        handle: &MediaHandle,
        output: &Path,
        encoding: &EncodingConfig,
    ) -> MediaResult<PathBuf> {
        let cmd = handle.to_command(output, encoding);
        let total_secs = handle.output_duration();
        let (width, height) = handle.output_dimensions();

        info!(
            input = %handle.source().display(),
            output = %output.display(),
            width,
            height,
            duration = total_secs,
            "Encoding clip"
        );

        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }

        let started = Instant::now();
        runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    percent = progress.percent_of(total_secs),
                    speed = progress.speed,
                    "Encode progress"
                );
            })
            .await?;
        metrics::histogram!("clipbot_ffmpeg_duration_seconds").record(started.elapsed().as_secs_f64());

        if !output.exists() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg finished without writing an output file",
                None,
                None,
            ));
        }

        Ok(output.to_path_buf())
    }
}

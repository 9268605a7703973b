//! Hand-written doubles for the pipeline's I/O seams.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use clipbot_media::{FetchedVideo, MediaEngine, MediaError, MediaHandle, MediaResult, VideoFetcher, VideoInfo};
use clipbot_models::{EncodingConfig, UserId};

use crate::error::{TransportError, TransportResult};
use crate::transport::{Keyboard, Transport};

// ============================================================================
// Mock Transport
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        user: UserId,
        text: String,
        keyboard: Keyboard,
    },
    File {
        user: UserId,
        file_name: String,
        caption: String,
    },
}

/// Transport that records everything sent.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<Sent>>,
    fail_files: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every file upload.
    pub fn failing_uploads() -> Self {
        Self {
            fail_files: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                Sent::File { .. } => None,
            })
            .collect()
    }

    pub fn files(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::File {
                    file_name, caption, ..
                } => Some((file_name, caption)),
                Sent::Text { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&self, user: UserId, text: &str, keyboard: &Keyboard) -> TransportResult<()> {
        self.sent.lock().unwrap().push(Sent::Text {
            user,
            text: text.to_string(),
            keyboard: keyboard.clone(),
        });
        Ok(())
    }

    async fn send_file(&self, user: UserId, path: &Path, caption: &str) -> TransportResult<()> {
        if self.fail_files {
            return Err(TransportError::api(Some(413), "Request Entity Too Large"));
        }
        // Same check a real upload would do.
        tokio::fs::metadata(path).await?;
        self.sent.lock().unwrap().push(Sent::File {
            user,
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Mock Fetcher
// ============================================================================

pub enum FetchBehavior {
    /// Write a small source file and report this title
    Succeed(Option<String>),
    Fail,
    /// Never finish within any reasonable test timeout
    Hang,
}

/// Fetcher that writes a placeholder file into the work directory.
pub struct MockFetcher {
    behavior: FetchBehavior,
    /// Every destination directory handed to `fetch`
    pub dest_dirs: Mutex<Vec<PathBuf>>,
}

impl MockFetcher {
    pub fn new(behavior: FetchBehavior) -> Self {
        Self {
            behavior,
            dest_dirs: Mutex::new(Vec::new()),
        }
    }

    pub fn titled(title: &str) -> Self {
        Self::new(FetchBehavior::Succeed(Some(title.to_string())))
    }

    pub fn last_dest_dir(&self) -> Option<PathBuf> {
        self.dest_dirs.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl VideoFetcher for MockFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> MediaResult<FetchedVideo> {
        self.dest_dirs.lock().unwrap().push(dest_dir.to_path_buf());
        match &self.behavior {
            FetchBehavior::Succeed(title) => {
                let path = dest_dir.join("source.mp4");
                tokio::fs::write(&path, url.as_bytes()).await?;
                Ok(FetchedVideo {
                    path,
                    title: title.clone(),
                })
            }
            FetchBehavior::Fail => Err(MediaError::download_failed("yt-dlp failed: HTTP Error 403: Forbidden")),
            FetchBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(MediaError::download_failed("unreachable"))
            }
        }
    }
}

// ============================================================================
// Mock Engine
// ============================================================================

/// Engine that reports a fixed source and writes a sparse output of a chosen size.
pub struct MockEngine {
    info: VideoInfo,
    output_size: u64,
    fail_encode: bool,
    panic_on_open: bool,
    /// Handles passed to `encode`, for asserting the queued edits
    pub encoded: Mutex<Vec<MediaHandle>>,
}

impl MockEngine {
    pub fn new(width: u32, height: u32, duration: f64) -> Self {
        Self {
            info: VideoInfo {
                duration,
                width,
                height,
                fps: 30.0,
                codec: "h264".to_string(),
                has_audio: true,
            },
            output_size: 1024 * 1024,
            fail_encode: false,
            panic_on_open: false,
            encoded: Mutex::new(Vec::new()),
        }
    }

    pub fn with_output_size(mut self, bytes: u64) -> Self {
        self.output_size = bytes;
        self
    }

    pub fn failing_encode(mut self) -> Self {
        self.fail_encode = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_open = true;
        self
    }

    pub fn last_encoded(&self) -> Option<MediaHandle> {
        self.encoded.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn open(&self, path: &Path) -> MediaResult<MediaHandle> {
        if self.panic_on_open {
            panic!("decoder blew up");
        }
        Ok(MediaHandle::new(path, self.info.clone()))
    }

    async fn encode(
        &self,
        handle: &MediaHandle,
        output: &Path,
        _encoding: &EncodingConfig,
    ) -> MediaResult<PathBuf> {
        self.encoded.lock().unwrap().push(handle.clone());
        if self.fail_encode {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Conversion failed!".to_string()),
                Some(1),
            ));
        }
        let file = std::fs::File::create(output)?;
        file.set_len(self.output_size)?;
        Ok(output.to_path_buf())
    }
}

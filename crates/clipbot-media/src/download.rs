//! Video download using yt-dlp.
//!
//! The fetcher asks yt-dlp for an mp4/m4a pair merged into a single mp4 so
//! the result is always a container chat clients can play, and presents a
//! desktop browser identity to the remote host.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Browser identity sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Prefer a combined mp4 (H.264 + AAC) over anything that would need Opus/WebM.
pub const FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// File stem of the downloaded source inside the work directory.
const SOURCE_STEM: &str = "source";

/// Separator between the fields yt-dlp prints after the download.
const PRINT_SEPARATOR: char = '\t';

/// A downloaded source video.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedVideo {
    pub path: PathBuf,
    /// Title reported by the source, when available
    pub title: Option<String>,
}

/// Retrieves a source video into a local directory.
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    /// Download `url` into `dest_dir`, returning the local file.
    async fn fetch(&self, url: &str, dest_dir: &Path) -> MediaResult<FetchedVideo>;
}

/// [`VideoFetcher`] backed by the `yt-dlp` CLI.
#[derive(Debug, Clone, Default)]
pub struct YtDlpFetcher;

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Build the yt-dlp argument list for one download.
    pub fn build_args(&self, url: &str, dest_dir: &Path) -> Vec<String> {
        let template = dest_dir.join(format!("{SOURCE_STEM}.%(ext)s"));

        vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--user-agent".to_string(),
            USER_AGENT.to_string(),
            "--add-header".to_string(),
            "Accept-Language:en-US,en;q=0.5".to_string(),
            "-f".to_string(),
            FORMAT_SELECTOR.to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--add-metadata".to_string(),
            "--print".to_string(),
            format!("after_move:%(filepath)s{PRINT_SEPARATOR}%(title)s"),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
            "--".to_string(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl VideoFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> MediaResult<FetchedVideo> {
        check_ytdlp()?;
        tokio::fs::create_dir_all(dest_dir).await?;

        info!(url = %url, dest = %dest_dir.display(), "Downloading video");
        let started = Instant::now();

        let output = Command::new("yt-dlp")
            .args(self.build_args(url, dest_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);

            let error_msg = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("Unknown error");
            if stderr.contains("429") || stderr.contains("Too Many Requests") {
                warn!(url = %url, "Source host is rate limiting downloads");
            }

            return Err(MediaError::download_failed(format!(
                "yt-dlp failed: {}",
                error_msg
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (printed_path, title) = parse_print_output(&stdout);

        let path = match printed_path.filter(|p| p.exists()) {
            Some(path) => path,
            None => locate_output(dest_dir)
                .await?
                .ok_or_else(|| MediaError::download_failed("Output file not created"))?,
        };

        let file_size = tokio::fs::metadata(&path).await?.len();
        metrics::histogram!("clipbot_download_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        info!(
            output = %path.display(),
            size_mb = file_size as f64 / (1024.0 * 1024.0),
            "Downloaded video successfully"
        );

        Ok(FetchedVideo { path, title })
    }
}

/// Extract `(filepath, title)` from the `--print` line.
fn parse_print_output(stdout: &str) -> (Option<PathBuf>, Option<String>) {
    let Some(line) = stdout
        .lines()
        .rev()
        .find(|l| l.contains(PRINT_SEPARATOR))
    else {
        return (None, None);
    };

    let (path, title) = line
        .split_once(PRINT_SEPARATOR)
        .unwrap_or((line, ""));
    let title = title.trim();
    let title = (!title.is_empty() && title != "NA").then(|| title.to_string());
    let path = (!path.trim().is_empty()).then(|| PathBuf::from(path.trim()));

    (path, title)
}

/// Find the downloaded `source.*` file when yt-dlp did not report it.
async fn locate_output(dest_dir: &Path) -> MediaResult<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dest_dir).await?;
    let mut found = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_source = path.file_stem().and_then(|s| s.to_str()) == Some(SOURCE_STEM);
        let is_partial = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "part" || e == "ytdl");
        if is_source && !is_partial {
            found = Some(path);
            break;
        }
    }

    Ok(found)
}

/// Clear yt-dlp's cache directory, which avoids stale signature data causing 403s.
pub async fn clear_cache() -> MediaResult<()> {
    check_ytdlp()?;

    let output = Command::new("yt-dlp")
        .arg("--rm-cache-dir")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::download_failed(format!(
            "yt-dlp --rm-cache-dir failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    info!("yt-dlp cache cleared");
    Ok(())
}

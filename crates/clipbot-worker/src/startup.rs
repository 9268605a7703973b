//! Startup checks run before the bot starts polling.

use tracing::{info, warn};

use clipbot_media::ToolPaths;

use crate::config::BotConfig;
use crate::error::WorkerResult;

/// Make sure the bot can do its job before accepting any message.
///
/// The work root must be creatable and the external tools must be on
/// `PATH`; either failing is fatal. Clearing the yt-dlp cache is best effort.
pub async fn prepare(config: &BotConfig) -> WorkerResult<ToolPaths> {
    tokio::fs::create_dir_all(&config.work_dir).await?;

    let tools = clipbot_media::preflight()?;
    info!(
        work_dir = %config.work_dir.display(),
        ffmpeg = %tools.ffmpeg.display(),
        ffprobe = %tools.ffprobe.display(),
        ytdlp = %tools.ytdlp.display(),
        "External tools found"
    );

    if let Err(e) = clipbot_media::clear_cache().await {
        warn!("Could not clear yt-dlp cache: {}", e);
    }

    Ok(tools)
}

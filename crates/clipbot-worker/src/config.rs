//! Bot configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clipbot_models::EncodingConfig;

use crate::dispatcher::DEFAULT_INBOX_IDLE_TIMEOUT;
use crate::error::{WorkerError, WorkerResult};

/// Public Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Largest file the Bot API accepts for upload.
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Bot configuration.
#[derive(Clone)]
pub struct BotConfig {
    /// Bot API token
    pub telegram_token: String,
    /// Bot API base URL (overridable for a local Bot API server)
    pub telegram_api_url: String,
    /// Root under which each pipeline run gets its own temporary directory
    pub work_dir: PathBuf,
    /// Upload limit in bytes
    pub max_upload_bytes: u64,
    /// Upper bound for one pipeline run, fetch to delivery
    pub pipeline_timeout: Duration,
    /// Long-poll timeout passed to getUpdates
    pub poll_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Idle time after which a user's inbox task is retired
    pub inbox_idle_timeout: Duration,
    /// Encoder settings
    pub encoding: EncodingConfig,
}

impl BotConfig {
    /// Config with defaults for everything but the token.
    pub fn new(telegram_token: impl Into<String>) -> Self {
        Self {
            telegram_token: telegram_token.into(),
            telegram_api_url: DEFAULT_API_URL.to_string(),
            work_dir: std::env::temp_dir().join("clipbot"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * BYTES_PER_MB,
            pipeline_timeout: Duration::from_secs(1800), // 30 minutes
            poll_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(60),
            inbox_idle_timeout: DEFAULT_INBOX_IDLE_TIMEOUT,
            encoding: EncodingConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| WorkerError::config_error("TELEGRAM_BOT_TOKEN is not set"))?;

        let defaults = Self::new(token.trim());

        let mut encoding = defaults.encoding.clone();
        if let Ok(preset) = std::env::var("CLIPBOT_ENCODE_PRESET") {
            encoding = encoding.with_preset(preset);
        }
        if let Some(crf) = env_parse::<u8>("CLIPBOT_ENCODE_CRF") {
            encoding = encoding.with_crf(crf);
        }

        Ok(Self {
            telegram_api_url: std::env::var("TELEGRAM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.telegram_api_url),
            work_dir: std::env::var("CLIPBOT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_upload_bytes: env_parse::<u64>("CLIPBOT_MAX_UPLOAD_MB")
                .and_then(megabytes_to_bytes)
                .unwrap_or(defaults.max_upload_bytes),
            pipeline_timeout: env_parse("CLIPBOT_PIPELINE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.pipeline_timeout),
            poll_timeout: env_parse("CLIPBOT_POLL_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_timeout),
            shutdown_timeout: env_parse("CLIPBOT_SHUTDOWN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
            inbox_idle_timeout: env_parse("CLIPBOT_INBOX_IDLE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.inbox_idle_timeout),
            encoding,
            telegram_token: defaults.telegram_token,
        })
    }
}

// The token is a credential; keep it out of logs.
impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("telegram_token", &"<redacted>")
            .field("telegram_api_url", &self.telegram_api_url)
            .field("work_dir", &self.work_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("pipeline_timeout", &self.pipeline_timeout)
            .field("poll_timeout", &self.poll_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("inbox_idle_timeout", &self.inbox_idle_timeout)
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// `None` when the result would not fit in a `u64`.
fn megabytes_to_bytes(mb: u64) -> Option<u64> {
    mb.checked_mul(BYTES_PER_MB)
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

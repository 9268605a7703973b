//! Worker error types.

use std::time::Duration;
use thiserror::Error;

use clipbot_media::MediaError;

pub type WorkerResult<T> = Result<T, WorkerError>;

pub type TransportResult<T> = Result<T, TransportError>;

/// Message shown when the source could not be downloaded.
pub const FETCH_FAILED_MESSAGE: &str = "❌ Failed to download video. Please try again later.";

/// Errors talking to the chat platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bot API error{}: {description}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Api {
        code: Option<i64>,
        description: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransportError {
    pub fn api(code: Option<i64>, description: impl Into<String>) -> Self {
        Self::Api {
            code,
            description: description.into(),
        }
    }
}

/// Why a pipeline run failed. One variant per step kind.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[source] MediaError),

    #[error("Transform failed: {0}")]
    Transform(#[source] MediaError),

    #[error("Encode failed: {0}")]
    Encode(#[source] MediaError),

    #[error("Delivery failed: {0}")]
    Delivery(#[source] TransportError),

    #[error("Run timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Run crashed: {0}")]
    Crashed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Short step name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Transform(_) => "transform",
            PipelineError::Encode(_) => "encode",
            PipelineError::Delivery(_) => "delivery",
            PipelineError::Timeout(_) => "timeout",
            PipelineError::Crashed(_) => "crashed",
            PipelineError::Io(_) => "io",
        }
    }

    /// The single failure message sent to the user.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Fetch(_) => FETCH_FAILED_MESSAGE.to_string(),
            // Bad trim or crop parameters are the user's to fix, so say what was wrong.
            PipelineError::Transform(
                err @ (MediaError::InvalidTrim(_) | MediaError::InvalidCrop(_)),
            ) => format!("❌ Error processing video: {}", err),
            PipelineError::Timeout(_) => {
                "❌ Error processing video: it took too long. Please try a shorter clip.".to_string()
            }
            _ => "❌ Error processing video. Please try again later.".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Startup check failed: {0}")]
    Startup(#[from] MediaError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

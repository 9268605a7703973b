//! Clip requests handed from the conversation to the pipeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::choice::AspectRatio;
use crate::session::{TimeRange, UserId};

/// Unique identifier for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a pipeline run needs, detached from the mutable session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRequest {
    pub run_id: RunId,
    pub user_id: UserId,
    pub source_url: String,
    /// `None` keeps the whole video
    pub trim: Option<TimeRange>,
    pub aspect_ratio: AspectRatio,
}

impl ClipRequest {
    pub fn new(
        user_id: UserId,
        source_url: impl Into<String>,
        trim: Option<TimeRange>,
        aspect_ratio: AspectRatio,
    ) -> Self {
        Self {
            run_id: RunId::new(),
            user_id,
            source_url: source_url.into(),
            trim,
            aspect_ratio,
        }
    }

    pub fn wants_crop(&self) -> bool {
        self.aspect_ratio != AspectRatio::Original
    }
}

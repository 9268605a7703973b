//! Per-user conversation session.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::choice::AspectRatio;

/// Stable user identity supplied by the chat transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Where a user is in the conversation.
///
/// Variants are declared in conversation order; the derived `Ord` is that order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Waiting for a video link
    #[default]
    AwaitingUrl,
    /// Waiting for "whole video" vs "trim"
    AwaitingTrimChoice,
    /// Waiting for the trim start (seconds)
    AwaitingStartTime,
    /// Waiting for the trim end (seconds)
    AwaitingEndTime,
    /// Waiting for the target aspect ratio
    AwaitingRatio,
    /// A pipeline run owns the session
    Processing,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::AwaitingUrl => "awaiting_url",
            ConversationState::AwaitingTrimChoice => "awaiting_trim_choice",
            ConversationState::AwaitingStartTime => "awaiting_start_time",
            ConversationState::AwaitingEndTime => "awaiting_end_time",
            ConversationState::AwaitingRatio => "awaiting_ratio",
            ConversationState::Processing => "processing",
        }
    }

    /// Whether the state machine is locked out of this session.
    pub fn is_processing(&self) -> bool {
        matches!(self, ConversationState::Processing)
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated trim window in seconds (`end > start >= 0`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    /// Returns `None` unless `0 <= start < end` and both are finite.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if start.is_finite() && end.is_finite() && start >= 0.0 && end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Conversation progress and collected parameters for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Session {
    pub user_id: UserId,
    pub state: ConversationState,
    pub source_url: Option<String>,
    pub trim_requested: Option<bool>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub aspect_ratio: Option<AspectRatio>,
    /// Scoped work directory of the active pipeline run
    pub work_dir: Option<PathBuf>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session waiting for a link.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            state: ConversationState::AwaitingUrl,
            source_url: None,
            trim_requested: None,
            start_time: None,
            end_time: None,
            aspect_ratio: None,
            work_dir: None,
            updated_at: Utc::now(),
        }
    }

    /// Clear back to [`ConversationState::AwaitingUrl`], dropping every collected field.
    pub fn reset(&mut self) {
        *self = Self::new(self.user_id);
    }

    /// Trim window, when trimming was requested and both ends are set.
    pub fn trim_range(&self) -> Option<TimeRange> {
        match (self.trim_requested, self.start_time, self.end_time) {
            (Some(true), Some(start), Some(end)) => TimeRange::new(start, end),
            _ => None,
        }
    }

    /// Mark the session as mutated.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether two sessions hold the same conversation data, ignoring timestamps.
    pub fn same_progress(&self, other: &Session) -> bool {
        self.user_id == other.user_id
            && self.state == other.state
            && self.source_url == other.source_url
            && self.trim_requested == other.trim_requested
            && self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.aspect_ratio == other.aspect_ratio
            && self.work_dir == other.work_dir
    }
}

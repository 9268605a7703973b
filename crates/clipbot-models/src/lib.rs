//! Shared data models for ClipBot.
//!
//! This crate provides Serde-serializable types for:
//! - Per-user conversation sessions
//! - Typed menu choices (trim, aspect ratio)
//! - Crop geometry
//! - Encoding configuration
//! - Clip requests handed to the processing pipeline

pub mod choice;
pub mod encoding;
pub mod error;
pub mod rect;
pub mod request;
pub mod session;
pub mod utils;

// Re-export common types
pub use choice::{AspectRatio, ChoiceParseError, TrimChoice};
pub use encoding::EncodingConfig;
pub use error::{InputError, InputResult};
pub use rect::CropRect;
pub use request::{ClipRequest, RunId};
pub use session::{ConversationState, Session, TimeRange, UserId};
pub use utils::{is_supported_url, parse_seconds, SUPPORTED_HOST_MARKERS};

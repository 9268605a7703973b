//! Input validation errors.
//!
//! The display text of each variant is what the user sees as the re-prompt.

use thiserror::Error;

/// Why a message was rejected in the current conversation state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("❌ That doesn't look like a YouTube link. Please send a valid YouTube URL.")]
    NotAVideoLink,

    #[error("❌ Please select one of the provided options.")]
    UnknownChoice,

    #[error("❌ Please enter a valid number of seconds for the {0} time.")]
    NotANumber(&'static str),

    #[error("❌ Start time can't be negative. Please enter a positive number.")]
    NegativeStart,

    #[error("❌ End time must be greater than the start time ({start}s). Please enter a valid end time.")]
    EndNotAfterStart { start: f64 },
}

pub type InputResult<T> = Result<T, InputError>;

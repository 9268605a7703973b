//! Outbound chat transport seam.

use async_trait::async_trait;
use std::path::Path;

use clipbot_models::UserId;

use crate::error::TransportResult;

/// Reply keyboard to show with a message. A rendering hint only; input is
/// validated regardless of how it was typed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Keyboard {
    /// Leave whatever keyboard the client shows
    #[default]
    None,
    /// Offer these buttons, one inner `Vec` per row
    Choices(Vec<Vec<String>>),
    /// Hide the custom keyboard
    Remove,
}

impl Keyboard {
    /// Lay out `labels` in rows of `per_row` buttons.
    pub fn rows<'a>(labels: impl IntoIterator<Item = &'a str>, per_row: usize) -> Self {
        let labels: Vec<String> = labels.into_iter().map(str::to_string).collect();
        Keyboard::Choices(
            labels
                .chunks(per_row.max(1))
                .map(|row| row.to_vec())
                .collect(),
        )
    }
}

/// Sends messages and files to a user.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message, optionally changing the reply keyboard.
    async fn send_text(&self, user: UserId, text: &str, keyboard: &Keyboard) -> TransportResult<()>;

    /// Upload a video file with a caption.
    async fn send_file(&self, user: UserId, path: &Path, caption: &str) -> TransportResult<()>;
}

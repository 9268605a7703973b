//! Chat bot worker.
//!
//! This crate provides:
//! - Per-user session store and conversation state machine
//! - Clip pipeline with scoped work directories and a single failure handler
//! - Per-user ordered message dispatch
//! - Telegram Bot API transport and long-poll loop
//! - Startup checks and graceful shutdown

pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod poller;
pub mod session_store;
pub mod startup;
pub mod telegram;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::BotConfig;
pub use conversation::{advance, Command, Input, Prompt, Transition};
pub use dispatcher::Dispatcher;
pub use error::{PipelineError, TransportError, TransportResult, WorkerError, WorkerResult};
pub use logging::RunLogger;
pub use pipeline::{ClipPipeline, PipelineOutcome, PipelineSettings};
pub use poller::Poller;
pub use session_store::{SessionHandle, SessionStore};
pub use telegram::TelegramClient;
pub use transport::{Keyboard, Transport};

//! Long-polling update loop.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use clipbot_models::UserId;

use crate::config::BotConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{TransportError, WorkerError, WorkerResult};
use crate::telegram::{TelegramClient, Update};

/// First delay after a failed poll; doubles per consecutive failure.
const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Pulls updates from the Bot API and feeds them to the dispatcher.
pub struct Poller {
    client: TelegramClient,
    dispatcher: Dispatcher,
    poll_timeout: Duration,
    shutdown_timeout: Duration,
    shutdown: watch::Sender<bool>,
}

impl Poller {
    pub fn new(client: TelegramClient, dispatcher: Dispatcher, config: &BotConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            client,
            dispatcher,
            poll_timeout: config.poll_timeout,
            shutdown_timeout: config.shutdown_timeout,
            shutdown,
        }
    }

    /// Poll until [`Poller::shutdown`] is called or the token is rejected.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting update poller with {}s long-poll timeout",
            self.poll_timeout.as_secs()
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut offset: Option<i64> = None;
        let mut consecutive_failures = 0u32;
        let mut fatal = None;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping poller");
                        break;
                    }
                }
                result = self.client.get_updates(offset, self.poll_timeout) => {
                    match result {
                        Ok(updates) => {
                            consecutive_failures = 0;
                            if let Some(next) = route_updates(&self.dispatcher, updates) {
                                offset = Some(next);
                            }
                        }
                        Err(e) if is_fatal(&e) => {
                            error!("Bot API rejected the token: {}", e);
                            fatal = Some(e);
                            break;
                        }
                        Err(e) => {
                            consecutive_failures += 1;
                            let delay = backoff_delay(consecutive_failures);
                            warn!(
                                "Polling failed ({} in a row), retrying in {:?}: {}",
                                consecutive_failures, delay, e
                            );
                            tokio::select! {
                                _ = shutdown_rx.changed() => {}
                                _ = tokio::time::sleep(delay) => {}
                            }
                        }
                    }
                }
            }
        }

        info!("Waiting for in-flight runs to complete...");
        if !self.dispatcher.shutdown(self.shutdown_timeout).await {
            warn!(
                "In-flight runs still active after {:?}, exiting anyway",
                self.shutdown_timeout
            );
        }
        info!("Poller stopped");

        match fatal {
            Some(e) => Err(WorkerError::Transport(e)),
            None => Ok(()),
        }
    }

    /// Signal shutdown. Takes effect even if [`Poller::run`] has not started yet.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

/// Hand text messages to the dispatcher; returns the next offset to request.
pub fn route_updates(dispatcher: &Dispatcher, updates: Vec<Update>) -> Option<i64> {
    let mut next_offset = None;

    for update in updates {
        next_offset = next_offset.max(Some(update.update_id + 1));

        let Some(message) = update.message else {
            continue;
        };
        let (Some(from), Some(text)) = (message.from, message.text) else {
            debug!(update_id = update.update_id, "Skipping non-text message");
            continue;
        };
        if from.is_bot {
            continue;
        }
        dispatcher.dispatch(UserId(from.id), text);
    }

    next_offset
}

/// 401 and 404 mean the token is wrong; polling again cannot help.
fn is_fatal(err: &TransportError) -> bool {
    matches!(
        err,
        TransportError::Api {
            code: Some(401 | 404),
            ..
        }
    )
}

fn backoff_delay(attempt: u32) -> Duration {
    let delay = BASE_BACKOFF.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    delay.min(MAX_BACKOFF)
}

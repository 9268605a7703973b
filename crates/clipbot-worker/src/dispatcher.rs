//! Routes inbound messages to per-user actors.
//!
//! Every user gets an unbounded inbox drained by a single task, so one
//! user's messages are applied strictly in arrival order while different
//! users never wait on each other. An actor that sits idle retires and
//! removes its inbox; the next message for that user starts a fresh one.
//! Pipeline runs are spawned on the same [`TaskTracker`], which lets
//! shutdown wait for in-flight work.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use clipbot_models::UserId;

use crate::conversation::{advance, Input};
use crate::pipeline::ClipPipeline;
use crate::session_store::SessionStore;
use crate::transport::Transport;

/// How long an actor waits for its next message before retiring.
pub const DEFAULT_INBOX_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    store: SessionStore,
    transport: Arc<dyn Transport>,
    pipeline: Arc<ClipPipeline>,
    inboxes: Mutex<HashMap<UserId, mpsc::UnboundedSender<String>>>,
    tracker: TaskTracker,
    idle_timeout: Duration,
}

impl Dispatcher {
    pub fn new(store: SessionStore, transport: Arc<dyn Transport>, pipeline: Arc<ClipPipeline>) -> Self {
        Self::with_idle_timeout(store, transport, pipeline, DEFAULT_INBOX_IDLE_TIMEOUT)
    }

    /// Like [`Dispatcher::new`], retiring a user's actor after `idle_timeout`
    /// without messages.
    pub fn with_idle_timeout(
        store: SessionStore,
        transport: Arc<dyn Transport>,
        pipeline: Arc<ClipPipeline>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                transport,
                pipeline,
                inboxes: Mutex::new(HashMap::new()),
                tracker: TaskTracker::new(),
                idle_timeout,
            }),
        }
    }

    /// Queue `text` for `user_id`. Returns `false` once shutdown has begun.
    pub fn dispatch(&self, user_id: UserId, text: String) -> bool {
        if self.inner.tracker.is_closed() {
            warn!(user_id = %user_id, "Dropping message received during shutdown");
            return false;
        }

        let mut inboxes = self.inner.inboxes.lock().unwrap_or_else(|e| e.into_inner());
        let text = match inboxes.get(&user_id) {
            Some(inbox) => match inbox.send(text) {
                Ok(()) => return true,
                // Actor is gone; start a fresh one with the same message.
                Err(mpsc::error::SendError(text)) => text,
            },
            None => text,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(text).is_err() {
            return false;
        }
        inboxes.insert(user_id, tx);
        drop(inboxes);

        let inner = Arc::clone(&self.inner);
        self.inner.tracker.spawn(run_actor(inner, user_id, rx));
        true
    }

    /// Number of users with a live inbox. Idle users drop out.
    pub fn active_users(&self) -> usize {
        self.inner.inboxes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Stop accepting messages, let inboxes drain and wait for in-flight runs.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.inner.tracker.close();
        self.inner
            .inboxes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        tokio::time::timeout(timeout, self.inner.tracker.wait())
            .await
            .is_ok()
    }
}

async fn run_actor(inner: Arc<Inner>, user_id: UserId, mut inbox: mpsc::UnboundedReceiver<String>) {
    debug!(user_id = %user_id, "Inbox opened");
    loop {
        let text = match tokio::time::timeout(inner.idle_timeout, inbox.recv()).await {
            Ok(Some(text)) => text,
            Ok(None) => break,
            Err(_) => match inner.retire_if_idle(user_id, &mut inbox) {
                Some(text) => text,
                None => break,
            },
        };
        inner.handle_message(user_id, &text).await;
    }
    debug!(user_id = %user_id, "Inbox closed");
}

impl Inner {
    /// Close and unregister `inbox` unless a message slipped in.
    ///
    /// Runs under the inboxes lock, which `dispatch` also holds while
    /// sending, so no message can land between the emptiness check and the
    /// close. Later sends fail and `dispatch` starts a new actor.
    fn retire_if_idle(
        &self,
        user_id: UserId,
        inbox: &mut mpsc::UnboundedReceiver<String>,
    ) -> Option<String> {
        let mut inboxes = self.inboxes.lock().unwrap_or_else(|e| e.into_inner());
        if let Ok(text) = inbox.try_recv() {
            return Some(text);
        }
        inbox.close();
        if inboxes.get(&user_id).is_some_and(|tx| tx.is_closed()) {
            inboxes.remove(&user_id);
        }
        None
    }

    async fn handle_message(&self, user_id: UserId, text: &str) {
        metrics::counter!("clipbot_messages_total").increment(1);

        let handle = self.store.handle(user_id).await;
        let transition = {
            let mut session = handle.lock().await;
            let from = session.state;
            let transition = advance(&mut session, Input::parse(text));
            debug!(
                user_id = %user_id,
                from = from.as_str(),
                to = session.state.as_str(),
                "Applied message"
            );
            transition
        };

        if let Err(e) = self
            .transport
            .send_text(user_id, &transition.prompt.text, &transition.prompt.keyboard)
            .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to send reply");
        }

        if let Some(request) = transition.dispatch {
            let pipeline = Arc::clone(&self.pipeline);
            self.tracker.spawn(async move {
                // Already logged and reported to the user by the pipeline.
                let _ = pipeline.run(request).await;
            });
        }
    }
}

//! In-memory per-user session store.
//!
//! Each user's session sits behind its own async mutex. The outer map is
//! only write-locked to insert a user seen for the first time, so work for
//! different users never waits on each other beyond a map lookup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use clipbot_models::{Session, UserId};

/// Shared, lockable session of one user.
pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<UserId, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's session lock, creating an `AwaitingUrl` session on first use.
    pub async fn handle(&self, user_id: UserId) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(&user_id) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(user_id).or_insert_with(|| {
            debug!(user_id = %user_id, "Created session");
            Arc::new(Mutex::new(Session::new(user_id)))
        });
        Arc::clone(handle)
    }

    /// Snapshot of the user's session. Never fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Session {
        let handle = self.handle(user_id).await;
        let session = handle.lock().await;
        session.clone()
    }

    /// Clear the user's session back to `AwaitingUrl`. Idempotent.
    pub async fn reset(&self, user_id: UserId) {
        let handle = self.handle(user_id).await;
        handle.lock().await.reset();
        debug!(user_id = %user_id, "Session reset");
    }

    /// Note (or clear) the scoped work directory of the user's active run.
    pub async fn record_work_dir(&self, user_id: UserId, path: Option<PathBuf>) {
        let handle = self.handle(user_id).await;
        let mut session = handle.lock().await;
        session.work_dir = path;
        session.touch();
    }

    /// Number of users seen since startup.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipbot_models::ConversationState;

    #[tokio::test]
    async fn test_get_or_create_starts_awaiting_url() {
        let store = SessionStore::new();
        let session = store.get_or_create(UserId(1)).await;

        assert_eq!(session.state, ConversationState::AwaitingUrl);
        assert_eq!(session.user_id, UserId(1));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_handle_is_shared_per_user() {
        let store = SessionStore::new();
        let a = store.handle(UserId(1)).await;
        let b = store.handle(UserId(1)).await;
        let other = store.handle(UserId(2)).await;

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test]
    async fn test_reset_twice_equals_once() {
        let store = SessionStore::new();
        {
            let handle = store.handle(UserId(9)).await;
            let mut session = handle.lock().await;
            session.state = ConversationState::AwaitingEndTime;
            session.source_url = Some("https://youtu.be/abc".to_string());
            session.trim_requested = Some(true);
            session.start_time = Some(30.0);
        }

        store.reset(UserId(9)).await;
        let once = store.get_or_create(UserId(9)).await;
        store.reset(UserId(9)).await;
        let twice = store.get_or_create(UserId(9)).await;

        assert!(once.same_progress(&twice));
        assert_eq!(twice.state, ConversationState::AwaitingUrl);
        assert!(twice.source_url.is_none());
        assert!(twice.start_time.is_none());
    }

    #[tokio::test]
    async fn test_record_work_dir() {
        let store = SessionStore::new();
        store
            .record_work_dir(UserId(3), Some(PathBuf::from("/tmp/clipbot/run")))
            .await;
        assert_eq!(
            store.get_or_create(UserId(3)).await.work_dir,
            Some(PathBuf::from("/tmp/clipbot/run"))
        );

        store.record_work_dir(UserId(3), None).await;
        assert!(store.get_or_create(UserId(3)).await.work_dir.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_users_get_distinct_sessions() {
        let store = SessionStore::new();
        let mut tasks = Vec::new();
        for id in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.get_or_create(UserId(id)).await
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(store.len().await, 32);
    }
}

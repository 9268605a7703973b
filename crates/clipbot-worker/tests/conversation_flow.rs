//! End-to-end conversation and pipeline behavior through the public API.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use clipbot_media::{FetchedVideo, MediaEngine, MediaError, MediaHandle, MediaResult, VideoFetcher};
use clipbot_models::{AspectRatio, ConversationState, EncodingConfig, UserId};
use clipbot_worker::conversation::{ASK_FOR_URL, STILL_PROCESSING};
use clipbot_worker::error::FETCH_FAILED_MESSAGE;
use clipbot_worker::{
    advance, ClipPipeline, Input, Keyboard, PipelineError, PipelineSettings, SessionStore,
    Transport, TransportResult,
};

#[derive(Default)]
struct RecordingTransport {
    texts: Mutex<Vec<String>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, _user: UserId, text: &str, _keyboard: &Keyboard) -> TransportResult<()> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_file(&self, _user: UserId, _path: &Path, _caption: &str) -> TransportResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct UnreachableSource {
    dirs: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl VideoFetcher for UnreachableSource {
    async fn fetch(&self, _url: &str, dest_dir: &Path) -> MediaResult<FetchedVideo> {
        self.dirs.lock().unwrap().push(dest_dir.to_path_buf());
        tokio::fs::write(dest_dir.join("source.mp4.part"), b"partial").await?;
        Err(MediaError::download_failed("yt-dlp failed: Video unavailable"))
    }
}

struct UnusedEngine;

#[async_trait]
impl MediaEngine for UnusedEngine {
    async fn open(&self, path: &Path) -> MediaResult<MediaHandle> {
        Err(MediaError::FileNotFound(path.to_path_buf()))
    }

    async fn encode(&self, _handle: &MediaHandle, output: &Path, _encoding: &EncodingConfig) -> MediaResult<PathBuf> {
        Err(MediaError::FileNotFound(output.to_path_buf()))
    }
}

async fn send(store: &SessionStore, user: UserId, text: &str) -> clipbot_worker::Transition {
    let handle = store.handle(user).await;
    let mut session = handle.lock().await;
    advance(&mut session, Input::parse(text))
}

#[tokio::test]
async fn trim_and_portrait_scenario_reaches_processing() {
    let store = SessionStore::new();
    let user = UserId(1001);

    send(&store, user, "https://youtu.be/abc").await;
    assert_eq!(store.get_or_create(user).await.state, ConversationState::AwaitingTrimChoice);

    send(&store, user, "2) Trim video").await;
    assert_eq!(store.get_or_create(user).await.state, ConversationState::AwaitingStartTime);

    send(&store, user, "30").await;
    assert_eq!(store.get_or_create(user).await.state, ConversationState::AwaitingEndTime);

    let rejected = send(&store, user, "10").await;
    assert!(rejected.dispatch.is_none());
    assert_eq!(store.get_or_create(user).await.state, ConversationState::AwaitingEndTime);

    send(&store, user, "90").await;
    assert_eq!(store.get_or_create(user).await.state, ConversationState::AwaitingRatio);

    let transition = send(&store, user, "3) 9:16 (Portrait)").await;
    let session = store.get_or_create(user).await;
    assert_eq!(session.state, ConversationState::Processing);
    assert_eq!(session.start_time, Some(30.0));
    assert_eq!(session.end_time, Some(90.0));
    assert_eq!(session.aspect_ratio, Some(AspectRatio::Portrait));

    let request = transition.dispatch.expect("pipeline request");
    assert_eq!(request.user_id, user);

    let refused = send(&store, user, "/download").await;
    assert_eq!(refused.prompt.text, STILL_PROCESSING);
}

#[tokio::test]
async fn restart_command_clears_progress() {
    let store = SessionStore::new();
    let user = UserId(1002);

    send(&store, user, "https://www.youtube.com/watch?v=xyz").await;
    send(&store, user, "trim").await;

    let transition = send(&store, user, "/download").await;
    assert_eq!(transition.prompt.text, ASK_FOR_URL);

    let session = store.get_or_create(user).await;
    assert_eq!(session.state, ConversationState::AwaitingUrl);
    assert!(session.source_url.is_none());
    assert!(session.trim_requested.is_none());
}

#[tokio::test]
async fn failed_fetch_reports_once_and_leaves_nothing_behind() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new();
    let transport = Arc::new(RecordingTransport::default());
    let fetcher = Arc::new(UnreachableSource::default());
    let pipeline = Arc::new(ClipPipeline::new(
        PipelineSettings {
            work_root: root.path().to_path_buf(),
            ..PipelineSettings::default()
        },
        store.clone(),
        transport.clone(),
        fetcher.clone(),
        Arc::new(UnusedEngine),
    ));

    let user = UserId(1003);
    let mut request = None;
    for text in ["https://youtu.be/gone", "1", "6"] {
        if let Some(dispatched) = send(&store, user, text).await.dispatch {
            request = Some(dispatched);
        }
    }
    let request = request.expect("pipeline request");

    let transition = send(&store, user, "ignored while processing").await;
    assert_eq!(transition.prompt.text, STILL_PROCESSING);

    let err = pipeline.run(request).await.unwrap_err();
    assert!(matches!(err, PipelineError::Fetch(_)));

    let texts = transport.texts.lock().unwrap().clone();
    assert_eq!(texts.iter().filter(|t| t.as_str() == FETCH_FAILED_MESSAGE).count(), 1);

    let session = store.get_or_create(user).await;
    assert_eq!(session.state, ConversationState::AwaitingUrl);
    assert!(session.work_dir.is_none());

    let dir = fetcher.dirs.lock().unwrap()[0].clone();
    assert!(!dir.exists());
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

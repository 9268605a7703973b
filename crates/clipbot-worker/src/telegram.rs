//! Telegram Bot API client.
//!
//! Thin HTTPS client over the three methods the bot needs:
//! - `getUpdates` long polling
//! - `sendMessage` with reply keyboards
//! - `sendVideo` multipart upload
//!
//! Every call goes through [`TelegramClient::execute_request`], which wraps
//! it in a tracing span and records latency.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info_span, Instrument};

use clipbot_models::UserId;

use crate::error::{TransportError, TransportResult};
use crate::transport::{Keyboard, Transport};

/// Slack on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Timeout for ordinary API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Uploads of up to 50MB can be slow on constrained links.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

// =============================================================================
// Wire types
// =============================================================================

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> TransportResult<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TransportError::api(
                self.error_code,
                self.description
                    .unwrap_or_else(|| "request was not successful".to_string()),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<Value>,
}

/// `reply_markup` JSON for a keyboard hint, `None` to leave the client's keyboard alone.
pub fn reply_markup(keyboard: &Keyboard) -> Option<Value> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::Choices(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
                .collect();
            Some(json!({
                "keyboard": rows,
                "one_time_keyboard": true,
                "resize_keyboard": true,
            }))
        }
        Keyboard::Remove => Some(json!({ "remove_keyboard": true })),
    }
}

// =============================================================================
// Client
// =============================================================================

/// Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
}

impl TelegramClient {
    /// Create a client for `token` against `api_url` (normally `https://api.telegram.org`).
    pub fn new(api_url: &str, token: &str) -> TransportResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("clipbot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// Fetch pending updates, blocking server-side for up to `timeout`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> TransportResult<Vec<Update>> {
        let body = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &body, timeout + POLL_GRACE).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str, keyboard: &Keyboard) -> TransportResult<Message> {
        let body = SendMessageRequest {
            chat_id,
            text,
            reply_markup: reply_markup(keyboard),
        };
        self.call("sendMessage", &body, REQUEST_TIMEOUT).await
    }

    /// Upload `path` as a streamable video.
    pub async fn send_video(&self, chat_id: i64, path: &Path, caption: &str) -> TransportResult<Message> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();
        debug!(chat_id, size = bytes.len(), file = %file_name, "Uploading video");

        let part = Part::bytes(bytes).file_name(file_name).mime_str("video/mp4")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("supports_streaming", "true")
            .part("video", part);

        let url = self.method_url("sendVideo");
        self.execute_request("sendVideo", async {
            let response = self
                .http
                .post(&url)
                .multipart(form)
                .timeout(UPLOAD_TIMEOUT)
                .send()
                .await?;
            let envelope: ApiResponse<Message> = response.json().await?;
            envelope.into_result()
        })
        .await
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> TransportResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.method_url(method);
        self.execute_request(method, async {
            // Errors come back as JSON with `ok: false` regardless of HTTP status.
            let response = self.http.post(&url).json(body).timeout(timeout).send().await?;
            let envelope: ApiResponse<T> = response.json().await?;
            envelope.into_result()
        })
        .await
    }

    async fn execute_request<T, F>(&self, method: &str, fut: F) -> TransportResult<T>
    where
        F: std::future::Future<Output = TransportResult<T>>,
    {
        let span = info_span!("telegram_request", method = %method);

        let start = Instant::now();
        let result = fut.instrument(span).await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::histogram!(
            "clipbot_telegram_request_duration_seconds",
            "method" => method.to_string(),
            "outcome" => outcome
        )
        .record(start.elapsed().as_secs_f64());

        result
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_text(&self, user: UserId, text: &str, keyboard: &Keyboard) -> TransportResult<()> {
        self.send_message(user.as_i64(), text, keyboard).await.map(|_| ())
    }

    async fn send_file(&self, user: UserId, path: &Path, caption: &str) -> TransportResult<()> {
        self.send_video(user.as_i64(), path, caption).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:abc";

    fn sent_message() -> Value {
        json!({
            "ok": true,
            "result": {
                "message_id": 10,
                "chat": { "id": 42, "type": "private" },
                "text": "hi"
            }
        })
    }

    #[test]
    fn test_reply_markup_shapes() {
        assert!(reply_markup(&Keyboard::None).is_none());
        assert_eq!(
            reply_markup(&Keyboard::Remove),
            Some(json!({ "remove_keyboard": true }))
        );

        let markup = reply_markup(&Keyboard::rows(["1) Download entire video", "2) Trim video"], 2))
            .unwrap();
        assert_eq!(markup["keyboard"][0][1]["text"], "2) Trim video");
        assert_eq!(markup["one_time_keyboard"], true);
        assert_eq!(markup["resize_keyboard"], true);
    }

    #[tokio::test]
    async fn test_send_message_with_keyboard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendMessage")))
            .and(body_partial_json(json!({
                "chat_id": 42,
                "text": "pick one",
                "reply_markup": {
                    "keyboard": [[{ "text": "a" }, { "text": "b" }]],
                    "one_time_keyboard": true,
                    "resize_keyboard": true
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sent_message()))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
        let message = client
            .send_message(42, "pick one", &Keyboard::rows(["a", "b"], 2))
            .await
            .unwrap();
        assert_eq!(message.message_id, 10);
        assert_eq!(message.chat.id, 42);
    }

    #[tokio::test]
    async fn test_get_updates_parses_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/getUpdates")))
            .and(body_partial_json(json!({ "offset": 7, "allowed_updates": ["message"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    {
                        "update_id": 7,
                        "message": {
                            "message_id": 1,
                            "from": { "id": 42, "is_bot": false, "username": "alice" },
                            "chat": { "id": 42, "type": "private" },
                            "text": "https://youtu.be/abc"
                        }
                    },
                    { "update_id": 8 }
                ]
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
        let updates = client.get_updates(Some(7), Duration::from_secs(0)).await.unwrap();

        assert_eq!(updates.len(), 2);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.from.as_ref().unwrap().id, 42);
        assert_eq!(message.text.as_deref(), Some("https://youtu.be/abc"));
        assert!(updates[1].message.is_none());
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendMessage")))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
        let err = client
            .send_text(UserId(1), "hello", &Keyboard::None)
            .await
            .unwrap_err();

        match err {
            TransportError::Api { code, description } => {
                assert_eq!(code, Some(400));
                assert!(description.contains("chat not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_video_uploads_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendVideo")))
            .respond_with(ResponseTemplate::new(200).set_body_json(sent_message()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let video = dir.path().join("output.mp4");
        tokio::fs::write(&video, b"not really a video").await.unwrap();

        let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
        client
            .send_file(UserId(42), &video, "Processed YouTube video - test")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"video\"; filename=\"output.mp4\""));
        assert!(body.contains("Processed YouTube video - test"));
    }

    #[tokio::test]
    async fn test_send_video_missing_file_is_io_error() {
        let client = TelegramClient::new("http://127.0.0.1:9", TOKEN).unwrap();
        let err = client
            .send_video(42, Path::new("/definitely/not/here.mp4"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }
}

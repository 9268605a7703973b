//! Chat bot binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipbot_media::{FfmpegEngine, YtDlpFetcher};
use clipbot_worker::{
    startup, BotConfig, ClipPipeline, Dispatcher, PipelineSettings, Poller, SessionStore,
    TelegramClient, Transport,
};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,clipbot_worker=info,clipbot_media=info,hyper=warn,reqwest=warn")
    });

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting clipbot");

    let config = match BotConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!("Bot config: {:?}", config);

    if let Err(e) = startup::prepare(&config).await {
        error!("{}", e);
        std::process::exit(1);
    }

    let client = match TelegramClient::new(&config.telegram_api_url, &config.telegram_token) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create Telegram client: {}", e);
            std::process::exit(1);
        }
    };

    let store = SessionStore::new();
    let transport: Arc<dyn Transport> = Arc::new(client.clone());
    let engine = FfmpegEngine::new().with_timeout(config.pipeline_timeout.as_secs());
    let pipeline = Arc::new(ClipPipeline::new(
        PipelineSettings::from(&config),
        store.clone(),
        Arc::clone(&transport),
        Arc::new(YtDlpFetcher::new()),
        Arc::new(engine),
    ));
    let dispatcher =
        Dispatcher::with_idle_timeout(store, transport, pipeline, config.inbox_idle_timeout);
    let poller = Arc::new(Poller::new(client, dispatcher, &config));

    // Setup signal handler
    let signal_poller = Arc::clone(&poller);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_poller.shutdown();
    });

    if let Err(e) = poller.run().await {
        error!("Poller error: {}", e);
        std::process::exit(1);
    }

    info!("Bot shutdown complete");
}

//! Video preview worker binary.
//!
//! Usage: `preview-worker [EVENT_FILE]`. The event is read from the file, or
//! from stdin when no file is given; the response JSON goes to stdout.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use preview_media::FfmpegToolchain;
use preview_storage::S3Client;
use preview_worker::config::debug_from_env;
use preview_worker::{
    retry_async, HandlerResponse, PreviewHandler, RetryConfig, RetryResult, WorkerConfig,
    WorkerError,
};

const EXIT_FAILED: i32 = 1;
const EXIT_STARTUP: i32 = 2;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing(debug_from_env());

    info!("Starting preview-worker");

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => fail_startup(&e),
    };
    info!("Worker config: {:?}", config);

    let raw = match read_event(std::env::args().nth(1)).await {
        Ok(raw) => raw,
        Err(e) => fail_startup(&WorkerError::invalid_event(format!("failed to read event: {}", e))),
    };

    let store = match S3Client::from_env().await {
        Ok(store) => store,
        Err(e) => fail_startup(&WorkerError::config_error(e.to_string())),
    };

    let media = FfmpegToolchain::new()
        .with_timeout(config.ffmpeg_timeout.as_secs())
        .with_verbose(config.debug);
    if let Err(e) = media.check_available() {
        fail_startup(&WorkerError::Toolchain(e.to_string()));
    }

    let handler = PreviewHandler::from_config(Arc::new(store), Arc::new(media), &config);

    let retry = RetryConfig::new("preview_invocation")
        .with_max_retries(config.publish_retries)
        .with_base_delay(Duration::from_millis(500));

    match retry_async(&retry, || handler.handle_json(&raw), WorkerError::is_retryable).await {
        RetryResult::Success(response) => {
            println!("{}", response.to_json());
        }
        RetryResult::Failed { error, attempts } => {
            error!(
                kind = %error.kind(),
                attempts,
                "Invocation failed: {}", error
            );
            println!("{}", HandlerResponse::failure(&error).to_json());
            std::process::exit(EXIT_FAILED);
        }
    }
}

/// Colored text output for development, JSON when `LOG_FORMAT=json`.
fn init_tracing(debug: bool) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_directive = if debug { "preview=debug" } else { "preview=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // Logs go to stderr; stdout carries the response.
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn read_event(path: Option<String>) -> std::io::Result<Vec<u8>> {
    match path {
        Some(path) => tokio::fs::read(path).await,
        None => {
            let mut raw = Vec::new();
            tokio::io::stdin().read_to_end(&mut raw).await?;
            Ok(raw)
        }
    }
}

fn fail_startup(error: &WorkerError) -> ! {
    error!("Startup failed: {}", error);
    println!("{}", HandlerResponse::failure(error).to_json());
    std::process::exit(EXIT_STARTUP);
}

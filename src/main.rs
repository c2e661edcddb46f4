//! # tg_digest
//!
//! A daily digest pipeline that collects yesterday's posts from configured
//! Telegram channels, turns each into a short Korean notification via the
//! Gemini API, and delivers the aggregate to a Slack incoming webhook.
//!
//! ## Usage
//!
//! ```sh
//! SLACK_WEBHOOK_URL=... GEMINI_API_KEY=... tg_digest [channel]
//! ```
//!
//! ## Architecture
//!
//! The application is a single sequential pipeline, run once per day by an
//! external scheduler:
//! 1. **Window**: compute yesterday's `[00:00:00, 23:59:59]` range in KST
//! 2. **Fetch**: list each channel's messages newest-first and keep the window
//! 3. **Process**: per channel strategy, scrape-and-summarize or translate
//! 4. **Deliver**: post the items to Slack in chunks
//!
//! Processing is deliberately not concurrent: the Gemini client enforces a
//! fixed spacing between calls to stay inside the API rate limit, which
//! serializes the whole run anyway.

use clap::Parser;
use std::error::Error;
use tracing::{error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod digest;
mod extract;
mod models;
mod slack;
mod telegram;
mod utils;
mod window;

use api::{CALL_SPACING, DigestGenerator, GeminiClient, PacedGenerate};
use cli::Cli;
use config::Config;
use extract::ArticleClient;
use slack::SlackDelivery;
use telegram::WebPreviewSource;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("tg_digest starting up");

    // .env is optional; CI provides real environment variables.
    let _ = dotenvy::dotenv();

    let args = Cli::parse();

    // Both config failures are fatal and happen before any network call.
    let config = match Config::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(Box::new(e) as Box<dyn Error>);
        }
    };

    let window = window::select_window(chrono::Utc::now(), config.day_offset);
    info!(
        start = %window.start,
        end = %window.end,
        date = %window.date_label(),
        "Digest window selected"
    );

    // --- Build external clients ---
    let source = WebPreviewSource::new()?;
    let articles = ArticleClient::new()?;
    let backend = PacedGenerate::new(
        GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())?,
        CALL_SPACING,
    );
    let generator = DigestGenerator::new(backend);
    let delivery = SlackDelivery::new(config.webhook_url.clone())?;

    // --- Process channels sequentially ---
    let mut items = Vec::new();
    for spec in &config.channels {
        let channel_items =
            digest::process_channel(spec, &window, &source, &articles, &generator).await;
        items.extend(channel_items);
    }
    info!(count = items.len(), "Total digest items");

    // --- Deliver (always, even with zero items) ---
    let channel_label = match config.channels.as_slice() {
        [only] => Some(only.name.as_str()),
        _ => None,
    };
    let delivered = delivery
        .deliver_digest(&items, &window.date_label(), channel_label)
        .await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        items = items.len(),
        posts_delivered = delivered,
        "Execution complete"
    );

    Ok(())
}

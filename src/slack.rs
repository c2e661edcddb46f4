//! Slack webhook delivery of the assembled digest.
//!
//! Items are rendered as Block Kit payloads and posted to an incoming
//! webhook. Slack rejects messages with too many blocks, so the digest is
//! partitioned into chunks of at most [`CHUNK_SIZE`] items, each submitted
//! as its own post. One chunk failing is logged and does not block the
//! remaining chunks.
//!
//! A run that produced zero items still posts a single "no news" message;
//! the daily delivery is never silently skipped.

use crate::models::OutputItem;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument};

/// Maximum digest items per webhook post.
const CHUNK_SIZE: usize = 15;
const POST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned status {status}")]
    Status { status: reqwest::StatusCode },
}

fn header_text(date_label: &str, channel_label: Option<&str>) -> String {
    match channel_label {
        Some(channel) => format!("📰 {channel} 일간 크립토 뉴스 요약 - {date_label}"),
        None => format!("📰 일간 크립토 뉴스 요약 - {date_label}"),
    }
}

fn header_block(text: &str) -> Value {
    json!({
        "type": "header",
        "text": { "type": "plain_text", "text": text, "emoji": true }
    })
}

fn divider() -> Value {
    json!({ "type": "divider" })
}

/// Render one chunk of items as a Block Kit payload.
///
/// `start_index` is the 1-based number of the chunk's first item, so item
/// numbering runs through the whole digest rather than restarting per post.
fn build_chunk_payload(
    items: &[OutputItem],
    start_index: usize,
    chunk_index: usize,
    total_chunks: usize,
    total_items: usize,
    date_label: &str,
    channel_label: Option<&str>,
) -> Value {
    let mut header = header_text(date_label, channel_label);
    if total_chunks > 1 {
        header.push_str(&format!(" ({chunk_index}/{total_chunks})"));
    }

    let mut blocks = vec![header_block(&header), divider()];
    for (offset, item) in items.iter().enumerate() {
        let index = start_index + offset;
        let time = item.timestamp.format("%H:%M");
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*{index}. [{time}] 뉴스*\n{}", item.body)
            }
        }));
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("<{}|📎 원문 보기>", item.link)
            }
        }));
        if offset + 1 < items.len() {
            blocks.push(divider());
        }
    }

    // Summary footer goes on the final chunk only.
    if chunk_index == total_chunks {
        blocks.push(json!({
            "type": "context",
            "elements": [{
                "type": "mrkdwn",
                "text": format!("총 {total_items}개의 뉴스 | Powered by Google Gemini")
            }]
        }));
    }

    json!({ "blocks": blocks })
}

fn build_empty_payload(date_label: &str, channel_label: Option<&str>) -> Value {
    json!({
        "blocks": [
            header_block(&header_text(date_label, channel_label)),
            divider(),
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": "어제 수집된 뉴스가 없습니다." }
            }
        ]
    })
}

/// Partition the digest into webhook payloads, in delivery order.
///
/// Always returns at least one payload: an empty digest becomes a single
/// "no news" notification.
pub fn build_payloads(
    items: &[OutputItem],
    date_label: &str,
    channel_label: Option<&str>,
) -> Vec<Value> {
    if items.is_empty() {
        return vec![build_empty_payload(date_label, channel_label)];
    }

    let total_chunks = items.len().div_ceil(CHUNK_SIZE);
    items
        .chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(i, chunk)| {
            build_chunk_payload(
                chunk,
                i * CHUNK_SIZE + 1,
                i + 1,
                total_chunks,
                items.len(),
                date_label,
                channel_label,
            )
        })
        .collect()
}

/// Client for a Slack incoming webhook.
pub struct SlackDelivery {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackDelivery {
    pub fn new(webhook_url: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(POST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    async fn post(&self, payload: &Value) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status { status });
        }
        Ok(())
    }

    /// Deliver the full digest, one post per chunk, in order.
    ///
    /// Returns the number of successfully submitted posts. Failed chunks
    /// are logged and skipped; later chunks are still attempted.
    #[instrument(level = "info", skip_all, fields(items = items.len()))]
    pub async fn deliver_digest(
        &self,
        items: &[OutputItem],
        date_label: &str,
        channel_label: Option<&str>,
    ) -> usize {
        let payloads = build_payloads(items, date_label, channel_label);
        let total = payloads.len();

        let mut delivered = 0usize;
        for (i, payload) in payloads.iter().enumerate() {
            match self.post(payload).await {
                Ok(()) => {
                    delivered += 1;
                    info!(chunk = i + 1, total, "Delivered digest chunk");
                }
                Err(e) => {
                    error!(chunk = i + 1, total, error = %e, "Failed to deliver digest chunk");
                }
            }
        }
        delivered
    }
}

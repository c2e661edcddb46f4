//! Telegram channel message retrieval.
//!
//! The pipeline only needs one capability from Telegram: list a channel's
//! recent messages, newest-first, with backward paging. [`ChannelSource`]
//! captures that contract; [`WebPreviewSource`] implements it against the
//! public `https://t.me/s/<channel>` web preview, which requires no API
//! credentials or session material.
//!
//! [`fetch_window_messages`] drives the paging loop and applies the digest
//! window: candidates newer than the window are skipped, the first candidate
//! older than the window stops iteration (messages arrive newest-first), and
//! empty-text posts are dropped.

use crate::models::RawMessage;
use crate::window::{DigestWindow, kst};
use chrono::DateTime;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Upper bound on preview pages walked per channel. Each page carries about
/// 20 messages, so this comfortably covers one day of a busy channel.
const MAX_PAGES: usize = 20;

/// Errors surfaced by a message source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for channel {channel}")]
    Status {
        status: reqwest::StatusCode,
        channel: String,
    },
    #[error("parse error: {0}")]
    Parse(String),
}

/// A source of channel messages.
///
/// `list_messages` returns one page of messages, newest-first. `before_id`
/// pages backward: only messages with an id strictly below it are returned.
pub trait ChannelSource {
    async fn list_messages(
        &self,
        channel: &str,
        before_id: Option<i64>,
    ) -> Result<Vec<RawMessage>, SourceError>;
}

/// [`ChannelSource`] backed by the public `t.me/s/<channel>` preview pages.
pub struct WebPreviewSource {
    client: reqwest::Client,
}

impl WebPreviewSource {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(crate::extract::BROWSER_USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

impl ChannelSource for WebPreviewSource {
    #[instrument(level = "debug", skip(self))]
    async fn list_messages(
        &self,
        channel: &str,
        before_id: Option<i64>,
    ) -> Result<Vec<RawMessage>, SourceError> {
        let mut url = format!("https://t.me/s/{channel}");
        if let Some(before) = before_id {
            url.push_str(&format!("?before={before}"));
        }

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status(),
                channel: channel.to_string(),
            });
        }
        let html = response.text().await?;
        let mut messages = parse_preview_page(channel, &html)?;
        // The preview renders oldest-first within a page.
        messages.reverse();
        debug!(channel, count = messages.len(), "Listed preview page");
        Ok(messages)
    }
}

/// Parse one preview page into messages, in document (oldest-first) order.
fn parse_preview_page(channel: &str, html: &str) -> Result<Vec<RawMessage>, SourceError> {
    let document = Html::parse_document(html);
    let message_selector = Selector::parse("div.tgme_widget_message[data-post]")
        .map_err(|e| SourceError::Parse(e.to_string()))?;
    let text_selector = Selector::parse("div.tgme_widget_message_text")
        .map_err(|e| SourceError::Parse(e.to_string()))?;
    let time_selector =
        Selector::parse("time[datetime]").map_err(|e| SourceError::Parse(e.to_string()))?;

    let mut messages = Vec::new();
    for element in document.select(&message_selector) {
        let Some(post) = element.value().attr("data-post") else {
            continue;
        };
        // data-post is "<channel>/<id>"
        let Some(id) = post.rsplit('/').next().and_then(|s| s.parse::<i64>().ok()) else {
            warn!(channel, post, "Skipping message with malformed data-post");
            continue;
        };

        let Some(datetime) = element
            .select(&time_selector)
            .next()
            .and_then(|t| t.value().attr("datetime"))
        else {
            warn!(channel, id, "Skipping message without a timestamp");
            continue;
        };
        let timestamp = DateTime::parse_from_rfc3339(datetime)
            .map_err(|e| SourceError::Parse(format!("bad datetime {datetime}: {e}")))?
            .with_timezone(&kst());

        // Media-only posts have no text element; captions render in the
        // same element as regular text.
        let text = element
            .select(&text_selector)
            .next()
            .map(message_text)
            .unwrap_or_default();

        messages.push(RawMessage {
            id,
            text,
            timestamp,
            source_link: format!("https://t.me/{channel}/{id}"),
        });
    }
    Ok(messages)
}

/// Flatten a message text element, substituting anchors with their href so
/// shortened link labels don't lose the full URL, and `<br>` with newlines.
fn message_text(element: ElementRef) -> String {
    let mut out = String::new();
    flatten_into(element, &mut out);
    out.trim().to_string()
}

fn flatten_into(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(el) if el.name() == "a" => {
                match el.attr("href").filter(|href| href.starts_with("http")) {
                    Some(href) => out.push_str(href),
                    None => {
                        if let Some(child_el) = ElementRef::wrap(child) {
                            flatten_into(child_el, out);
                        }
                    }
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    flatten_into(child_el, out);
                }
            }
            _ => {}
        }
    }
}

/// Collect the channel's messages whose timestamps fall inside the window,
/// oldest-first.
///
/// Any retrieval error yields an empty sequence for this channel; the
/// failure is logged and the overall run continues.
#[instrument(level = "info", skip(source, window))]
pub async fn fetch_window_messages<S: ChannelSource>(
    source: &S,
    channel: &str,
    window: &DigestWindow,
) -> Vec<RawMessage> {
    let mut kept: Vec<RawMessage> = Vec::new();
    let mut before_id: Option<i64> = None;

    'pages: for _ in 0..MAX_PAGES {
        let page = match source.list_messages(channel, before_id).await {
            Ok(page) => page,
            Err(e) => {
                error!(channel, error = %e, "Failed to list messages; channel contributes no items");
                return Vec::new();
            }
        };
        if page.is_empty() {
            break;
        }

        for msg in &page {
            if msg.timestamp < window.start {
                // Newest-first: everything after this is older still.
                break 'pages;
            }
            if msg.timestamp > window.end {
                continue;
            }
            if msg.text.trim().is_empty() {
                debug!(channel, id = msg.id, "Dropping empty message");
                continue;
            }
            kept.push(msg.clone());
        }

        before_id = page.last().map(|m| m.id);
    }

    // Chronological within the channel.
    kept.reverse();
    info!(channel, count = kept.len(), "Fetched messages in window");
    kept
}

//! Data models shared across the digest pipeline.
//!
//! This module defines the core data structures:
//! - [`RawMessage`]: one post retrieved from a Telegram channel
//! - [`ChannelSpec`] / [`Strategy`]: static per-channel configuration
//! - [`ExtractedContent`]: cleaned article body that passed the quality gates
//! - [`OutputItem`]: one deliverable digest entry

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// How messages from a channel are turned into digest items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Extract article links from the message, scrape the first usable one,
    /// and summarize its content into three Korean lines.
    Scrape,
    /// Translate the message text itself into Korean.
    Translate,
}

/// Static configuration for one source channel.
///
/// Built once at startup from the defaults or a `channels.yaml` file and
/// never mutated for the rest of the run.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSpec {
    /// Public channel handle, e.g. `ahboyashreads`.
    pub name: String,
    /// Processing strategy for every message in this channel.
    pub strategy: Strategy,
}

/// A single post as retrieved from a channel, before any processing.
///
/// Messages with empty (after trimming) text are discarded by the fetcher
/// and never reach this type's consumers.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Channel-scoped message ordinal.
    pub id: i64,
    /// Message text, non-empty after trimming.
    pub text: String,
    /// Post time, normalized into the digest timezone.
    pub timestamp: DateTime<FixedOffset>,
    /// Canonical link to the message itself, `https://t.me/<channel>/<id>`.
    pub source_link: String,
}

/// Cleaned main text of a linked article.
///
/// Only constructed by the extractor after the minimum-length and paywall
/// gates pass; the text is capped at the extractor's length limit.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Page title, when one could be found.
    pub title: Option<String>,
    /// Cleaned body text, non-blank lines joined with single newlines.
    pub text: String,
}

impl ExtractedContent {
    /// Length of the cleaned body in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }
}

/// One entry of the final digest.
///
/// Created by the strategy dispatcher, immutable thereafter. Items are
/// collected in per-channel, per-message processing order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputItem {
    /// Generated Korean text (three summary lines for scrape items, the
    /// translated message for translate items).
    pub body: String,
    /// Timestamp of the originating message.
    pub timestamp: DateTime<FixedOffset>,
    /// Article link when one was resolved, otherwise the message's own link.
    pub link: String,
    /// Name of the originating channel.
    pub channel: String,
}

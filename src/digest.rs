//! Per-channel strategy dispatch.
//!
//! Each message either becomes one digest item or is dropped; dropping is
//! an expected outcome, not an error.
//!
//! - [`Strategy::Scrape`]: walk the message's links in order, skip known
//!   unscrapeable domains, and summarize the first link whose content
//!   survives the quality gates. First success wins; the remaining links
//!   are never fetched.
//! - [`Strategy::Translate`]: translate the message text itself. The item
//!   links to the first URL in the message, or to the message itself when
//!   it has none.

use crate::api::{DigestGenerator, GenerateAsync};
use crate::extract::{FetchArticle, extract_links, is_scrapeable};
use crate::models::{ChannelSpec, OutputItem, RawMessage, Strategy};
use crate::telegram::{ChannelSource, fetch_window_messages};
use crate::window::DigestWindow;
use tracing::{debug, info, instrument};

/// Process one message according to its channel's strategy.
///
/// Returns `Some` for an emitted item, `None` for a dropped message. A
/// single message never produces more than one item.
pub async fn process_message<F, G>(
    strategy: Strategy,
    channel: &str,
    msg: &RawMessage,
    articles: &F,
    generator: &DigestGenerator<G>,
) -> Option<OutputItem>
where
    F: FetchArticle,
    G: GenerateAsync,
{
    match strategy {
        Strategy::Scrape => {
            for link in extract_links(&msg.text) {
                if !is_scrapeable(&link) {
                    debug!(channel, id = msg.id, link, "Skipping unscrapeable domain");
                    continue;
                }
                if let Some(content) = articles.fetch_article(&link).await {
                    let body = generator
                        .summarize_to_korean(&content.text, content.title.as_deref())
                        .await;
                    return Some(OutputItem {
                        body,
                        timestamp: msg.timestamp,
                        link,
                        channel: channel.to_string(),
                    });
                }
            }
            debug!(channel, id = msg.id, "No usable article content; dropping message");
            None
        }
        Strategy::Translate => {
            let body = generator.translate_to_korean(&msg.text).await?;
            let link = extract_links(&msg.text)
                .into_iter()
                .next()
                .unwrap_or_else(|| msg.source_link.clone());
            Some(OutputItem {
                body,
                timestamp: msg.timestamp,
                link,
                channel: channel.to_string(),
            })
        }
    }
}

/// Fetch one channel's window of messages and process them in order.
///
/// Message processing is strictly sequential; the generation client's call
/// spacing serializes the backend rate limit for the whole run.
#[instrument(level = "info", skip_all, fields(channel = %spec.name))]
pub async fn process_channel<S, F, G>(
    spec: &ChannelSpec,
    window: &DigestWindow,
    source: &S,
    articles: &F,
    generator: &DigestGenerator<G>,
) -> Vec<OutputItem>
where
    S: ChannelSource,
    F: FetchArticle,
    G: GenerateAsync,
{
    let messages = fetch_window_messages(source, &spec.name, window).await;
    let total = messages.len();

    let mut items = Vec::new();
    for msg in &messages {
        if let Some(item) =
            process_message(spec.strategy, &spec.name, msg, articles, generator).await
        {
            items.push(item);
        }
    }

    info!(
        channel = %spec.name,
        messages = total,
        emitted = items.len(),
        dropped = total - items.len(),
        "Channel processed"
    );
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GenerationError;
    use crate::models::ExtractedContent;
    use crate::telegram::SourceError;
    use chrono::DateTime;
    use std::cell::RefCell;

    fn msg(id: i64, text: &str) -> RawMessage {
        RawMessage {
            id,
            text: text.to_string(),
            timestamp: DateTime::parse_from_rfc3339("2026-08-29T12:00:00+09:00").unwrap(),
            source_link: format!("https://t.me/testchan/{id}"),
        }
    }

    /// Article fetcher that succeeds only for configured links and records
    /// every attempted fetch.
    struct FakeArticles {
        available: Vec<(&'static str, &'static str)>,
        attempts: RefCell<Vec<String>>,
    }

    impl FakeArticles {
        fn with(available: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                available,
                attempts: RefCell::new(Vec::new()),
            }
        }
    }

    impl FetchArticle for FakeArticles {
        async fn fetch_article(&self, link: &str) -> Option<ExtractedContent> {
            self.attempts.borrow_mut().push(link.to_string());
            self.available
                .iter()
                .find(|(l, _)| *l == link)
                .map(|(_, text)| ExtractedContent {
                    title: None,
                    text: text.to_string(),
                })
        }
    }

    struct EchoBackend {
        fail: bool,
    }

    impl GenerateAsync for EchoBackend {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            if self.fail {
                Err(GenerationError::Timeout)
            } else if prompt.contains("번역") {
                Ok("비트코인 상승".to_string())
            } else {
                Ok("요약1\n요약2\n요약3".to_string())
            }
        }
    }

    fn generator(fail: bool) -> DigestGenerator<EchoBackend> {
        DigestGenerator::new(EchoBackend { fail })
    }

    #[tokio::test]
    async fn test_translate_strategy_emits_item_with_article_link() {
        let articles = FakeArticles::with(vec![]);
        let item = process_message(
            Strategy::Translate,
            "testchan",
            &msg(7, "BTC rallies https://example.com/a"),
            &articles,
            &generator(false),
        )
        .await
        .unwrap();

        assert_eq!(item.body, "비트코인 상승");
        assert_eq!(item.link, "https://example.com/a");
        assert_eq!(item.channel, "testchan");
    }

    #[tokio::test]
    async fn test_translate_strategy_falls_back_to_message_link() {
        let articles = FakeArticles::with(vec![]);
        let item = process_message(
            Strategy::Translate,
            "testchan",
            &msg(7, "BTC rallies, no link here"),
            &articles,
            &generator(false),
        )
        .await
        .unwrap();

        assert_eq!(item.link, "https://t.me/testchan/7");
    }

    #[tokio::test]
    async fn test_translate_strategy_drops_message_on_failure() {
        let articles = FakeArticles::with(vec![]);
        let item = process_message(
            Strategy::Translate,
            "testchan",
            &msg(7, "BTC rallies"),
            &articles,
            &generator(true),
        )
        .await;
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_scrape_strategy_first_success_wins() {
        let articles = FakeArticles::with(vec![("https://example.com/b", "article body")]);
        let text = "see https://example.com/a and https://example.com/b and https://example.com/c";
        let item = process_message(
            Strategy::Scrape,
            "testchan",
            &msg(1, text),
            &articles,
            &generator(false),
        )
        .await
        .unwrap();

        assert_eq!(item.body, "요약1\n요약2\n요약3");
        assert_eq!(item.link, "https://example.com/b");
        // /c is never attempted once /b succeeded.
        assert_eq!(
            *articles.attempts.borrow(),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[tokio::test]
    async fn test_scrape_strategy_skips_unscrapeable_domains() {
        let articles = FakeArticles::with(vec![]);
        let text = "clip https://youtube.com/watch?v=1 post https://x.com/a/status/2";
        let item = process_message(
            Strategy::Scrape,
            "testchan",
            &msg(1, text),
            &articles,
            &generator(false),
        )
        .await;

        assert!(item.is_none());
        assert!(articles.attempts.borrow().is_empty(), "no fetch attempted");
    }

    #[tokio::test]
    async fn test_scrape_strategy_drops_when_no_content_found() {
        let articles = FakeArticles::with(vec![]);
        let item = process_message(
            Strategy::Scrape,
            "testchan",
            &msg(1, "read https://example.com/a"),
            &articles,
            &generator(false),
        )
        .await;
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_scrape_strategy_summarize_failure_still_emits() {
        // Summarization degrades to a fallback body; the item is kept.
        let articles = FakeArticles::with(vec![("https://example.com/a", "short article body")]);
        let item = process_message(
            Strategy::Scrape,
            "testchan",
            &msg(1, "read https://example.com/a"),
            &articles,
            &generator(true),
        )
        .await
        .unwrap();
        assert_eq!(item.body, "short article body");
    }

    /// End-to-end: one translate channel, one message in window.
    struct OnePageSource {
        messages: Vec<RawMessage>,
    }

    impl ChannelSource for OnePageSource {
        async fn list_messages(
            &self,
            _channel: &str,
            before_id: Option<i64>,
        ) -> Result<Vec<RawMessage>, SourceError> {
            if before_id.is_some() {
                Ok(Vec::new())
            } else {
                Ok(self.messages.clone())
            }
        }
    }

    #[tokio::test]
    async fn test_process_channel_translate_end_to_end() {
        let spec = ChannelSpec {
            name: "testchan".to_string(),
            strategy: Strategy::Translate,
        };
        let window = crate::window::select_window(
            "2026-08-30T01:00:00Z".parse().unwrap(),
            -1,
        );
        let source = OnePageSource {
            messages: vec![msg(7, "BTC rallies https://example.com/a")],
        };
        let articles = FakeArticles::with(vec![]);

        let items =
            process_channel(&spec, &window, &source, &articles, &generator(false)).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].body, "비트코인 상승");
        assert_eq!(items[0].link, "https://example.com/a");
        assert_eq!(items[0].channel, "testchan");
    }
}

//! Gemini API interaction with rate-limit pacing.
//!
//! This module wraps the Google Gemini `generateContent` REST endpoint
//! behind a small trait so the rest of the pipeline never touches HTTP
//! directly.
//!
//! # Architecture
//!
//! - [`GenerateAsync`]: core trait defining one generation call
//! - [`GeminiClient`]: concrete reqwest-based implementation
//! - [`PacedGenerate`]: decorator that sleeps after every call to hold the
//!   backend's rate limit
//!
//! # Pacing
//!
//! The free Gemini tier allows at most 15 calls per minute, so consecutive
//! calls must be at least 4.5 seconds apart. The spacing is part of the
//! call contract, enforced unconditionally after success and failure alike,
//! and the pipeline stays sequential so no two calls can overlap.
//!
//! # Failure asymmetry
//!
//! [`DigestGenerator::summarize_to_korean`] never fails: on a backend error
//! it degrades to the first 200 characters of the input.
//! [`DigestGenerator::translate_to_korean`] returns `None` on failure so the
//! caller drops the message instead of delivering untranslated text.

use crate::utils::{collapse_lines, truncate_chars, truncate_for_log};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Minimum spacing between consecutive backend calls (≤15 calls/minute).
pub const CALL_SPACING: Duration = Duration::from_millis(4500);

const GENERATE_TIMEOUT_SECS: u64 = 30;
/// Input text is truncated to this many characters before prompting.
const PROMPT_INPUT_CAP: usize = 3000;
/// A summary keeps at most this many lines.
const SUMMARY_LINES: usize = 3;
/// Length of the degraded fallback summary.
const FALLBACK_CHARS: usize = 200;

/// Errors from one generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Trait for async text generation.
///
/// Implementors send a prompt to a backend and return the generated text.
/// The abstraction keeps the dispatcher testable with in-process mocks.
pub trait GenerateAsync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GENERATE_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Transport(e.to_string())
    }
}

impl GenerateAsync for GeminiClient {
    #[instrument(level = "debug", skip_all)]
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Transport(format!(
                "generateContent returned status {status}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::Malformed(
                "response contained no candidate text".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Decorator that enforces a fixed delay after every call on any
/// [`GenerateAsync`] implementation.
pub struct PacedGenerate<T> {
    inner: T,
    spacing: Duration,
}

impl<T> PacedGenerate<T>
where
    T: GenerateAsync,
{
    pub fn new(inner: T, spacing: Duration) -> Self {
        Self { inner, spacing }
    }
}

impl<T> fmt::Debug for PacedGenerate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacedGenerate")
            .field("spacing", &self.spacing)
            .finish_non_exhaustive()
    }
}

impl<T> GenerateAsync for PacedGenerate<T>
where
    T: GenerateAsync,
{
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let result = self.inner.generate(prompt).await;
        // The spacing holds even when the call failed; a failing backend
        // still counts against the rate limit.
        sleep(self.spacing).await;
        result
    }
}

/// High-level generation operations used by the strategy dispatcher.
pub struct DigestGenerator<T> {
    backend: T,
}

impl<T> DigestGenerator<T>
where
    T: GenerateAsync,
{
    pub fn new(backend: T) -> Self {
        Self { backend }
    }

    /// Summarize article content into three Korean lines.
    ///
    /// Never fails: on a backend error the first [`FALLBACK_CHARS`]
    /// characters of the input are returned instead, ellipsis-suffixed
    /// when truncated.
    #[instrument(level = "debug", skip_all)]
    pub async fn summarize_to_korean(&self, text: &str, title: Option<&str>) -> String {
        let input = truncate_chars(text, PROMPT_INPUT_CAP);
        let prompt = summary_prompt(&input, title);
        match self.backend.generate(&prompt).await {
            Ok(raw) => {
                let summary = take_summary_lines(&raw);
                debug!(preview = %truncate_for_log(&summary, 80), "Summary generated");
                summary
            }
            Err(e) => {
                warn!(error = %e, "Summarization failed; using truncated original as fallback");
                summary_fallback(text)
            }
        }
    }

    /// Translate message text into Korean, keeping crypto and industry
    /// terminology untranslated.
    ///
    /// Returns `None` on backend failure; the caller must drop the message.
    #[instrument(level = "debug", skip_all)]
    pub async fn translate_to_korean(&self, text: &str) -> Option<String> {
        let input = truncate_chars(text, PROMPT_INPUT_CAP);
        match self.backend.generate(&translate_prompt(&input)).await {
            Ok(raw) => {
                let translated = raw.trim().to_string();
                if translated.is_empty() {
                    warn!("Translation returned empty text; dropping message");
                    None
                } else {
                    Some(translated)
                }
            }
            Err(e) => {
                warn!(error = %e, "Translation failed; dropping message");
                None
            }
        }
    }
}

fn summary_prompt(text: &str, title: Option<&str>) -> String {
    let title_line = match title {
        Some(t) => format!("기사 제목: {t}\n"),
        None => String::new(),
    };
    format!(
        "다음은 암호화폐/크립토 산업 관련 뉴스입니다.\n\
         이 내용을 한국어로 정확히 3줄로 요약해주세요.\n\
         각 줄은 한 문장으로, 핵심 정보만 간결하게 담아주세요.\n\
         번호나 불릿 포인트 없이 각 줄만 작성해주세요.\n\n\
         {title_line}뉴스 내용:\n{text}\n\n3줄 요약:"
    )
}

fn translate_prompt(text: &str) -> String {
    format!(
        "다음 크립토 뉴스를 자연스러운 한국어로 번역해주세요.\n\
         코인명, 프로토콜명, 거래소명 등 업계 고유 용어는 번역하지 말고 원문 그대로 남겨주세요.\n\
         번역문만 출력해주세요.\n\n원문:\n{text}"
    )
}

/// Keep at most the first three non-blank lines of the raw model output.
/// Fewer lines are kept as-is, never padded.
fn take_summary_lines(raw: &str) -> String {
    collapse_lines(raw)
        .lines()
        .take(SUMMARY_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_fallback(text: &str) -> String {
    if text.chars().count() > FALLBACK_CHARS {
        format!("{}...", truncate_chars(text, FALLBACK_CHARS))
    } else {
        text.to_string()
    }
}

//! Notation extraction: one column image in, cleaned transcript lines out.
//!
//! The recogniser is an untrusted external service. Everything here treats
//! it that way: each call is throttled, bounded by a timeout and retried
//! with exponential backoff. Empty or garbled text is *not* an error; it
//! simply yields no candidates downstream.
//!
//! ## Retry Strategy
//!
//! With a 500 ms base and 3 retries the waits are 500 ms → 1 s → 2 s.
//! A timed-out attempt counts as a failed attempt and is retried the same
//! way; only the last failure decides which [`ExtractionError`] is reported.

use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, timeout, Duration, Instant};
use tracing::{debug, warn};

use super::{encode, postprocess};
use crate::config::ScanConfig;
use crate::error::ExtractionError;
use crate::notation::{GlyphTable, Language, NotationTables};
use crate::output::RawTranscript;
use crate::prompts::recognition_prompt;
use crate::raster::RasterImage;

/// Everything a recogniser needs to read one column.
#[derive(Clone)]
pub struct RecognitionRequest {
    pub page: usize,
    pub column: usize,
    pub language: Language,
    pub system_prompt: String,
    pub image: ImageData,
}

/// Raw recogniser answer before cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognition {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

#[derive(Debug, Clone, Error)]
pub enum RecognizerError {
    #[error("{0}")]
    Provider(String),
}

/// A vision-text recognition service.
///
/// Implementations must be cheap to share across tasks; the scan pipeline
/// calls [`recognize`](Self::recognize) concurrently.
pub trait NotationRecognizer: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    fn recognize<'a>(
        &'a self,
        request: &'a RecognitionRequest,
    ) -> BoxFuture<'a, Result<Recognition, RecognizerError>>;
}

// ── Vision-model recogniser ─────────────────────────────────────────────────

/// [`NotationRecognizer`] backed by an `edgequake_llm` vision provider.
///
/// ## Message Layout
///
/// 1. **System message** with the transcription rules and the alphabet
/// 2. **User message** with the column PNG attached and empty text
pub struct VisionRecognizer {
    provider: Arc<dyn LLMProvider>,
    label: String,
    temperature: f32,
    max_tokens: usize,
}

impl VisionRecognizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ScanConfig) -> Self {
        let label = match (&config.provider_name, &config.model) {
            (Some(p), Some(m)) => format!("{p}/{m}"),
            (Some(p), None) => p.clone(),
            (None, Some(m)) => m.clone(),
            (None, None) => "vision".to_string(),
        };
        Self {
            provider,
            label,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

impl NotationRecognizer for VisionRecognizer {
    fn name(&self) -> &str {
        &self.label
    }

    fn recognize<'a>(
        &'a self,
        request: &'a RecognitionRequest,
    ) -> BoxFuture<'a, Result<Recognition, RecognizerError>> {
        Box::pin(async move {
            let messages = vec![
                ChatMessage::system(request.system_prompt.as_str()),
                ChatMessage::user_with_images("", vec![request.image.clone()]),
            ];
            let response = self
                .provider
                .chat(&messages, Some(&self.options()))
                .await
                .map_err(|e| RecognizerError::Provider(e.to_string()))?;
            Ok(Recognition {
                text: response.content,
                input_tokens: response.prompt_tokens,
                output_tokens: response.completion_tokens,
            })
        })
    }
}

// ── Throttle ────────────────────────────────────────────────────────────────

/// Enforces a minimum spacing between the starts of recogniser calls,
/// shared by every concurrent column task.
#[derive(Debug)]
pub struct RequestThrottle {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait for this caller's slot.
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut next = self.next_slot.lock().await;
        let now = Instant::now();
        let slot = match *next {
            Some(t) if t > now => t,
            _ => now,
        };
        *next = Some(slot + self.interval);
        drop(next);
        sleep_until(slot).await;
    }
}

// ── Extraction ──────────────────────────────────────────────────────────────

/// Result of extracting one column, successful or not.
#[derive(Debug, Clone)]
pub struct ColumnOutcome {
    pub page: usize,
    pub column: usize,
    pub transcript: Result<RawTranscript, ExtractionError>,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u32,
}

/// Glyph table for the configured language, English if it has none.
pub(crate) fn table_for<'a>(tables: &'a NotationTables, language: Language) -> Option<&'a GlyphTable> {
    tables
        .get(language)
        .or_else(|| tables.get(Language::English))
}

/// Read one column through `recognizer`.
///
/// `page` and `column` are 1-indexed and only label the transcript.
pub async fn extract(
    column_image: &RasterImage,
    page: usize,
    column: usize,
    recognizer: &dyn NotationRecognizer,
    config: &ScanConfig,
) -> Result<RawTranscript, ExtractionError> {
    extract_column(recognizer, None, column_image, page, column, config)
        .await
        .transcript
}

/// [`extract`] with an optional shared throttle and full accounting.
pub async fn extract_column(
    recognizer: &dyn NotationRecognizer,
    throttle: Option<&RequestThrottle>,
    column_image: &RasterImage,
    page: usize,
    column: usize,
    config: &ScanConfig,
) -> ColumnOutcome {
    let start = Instant::now();
    let mut outcome = ColumnOutcome {
        page,
        column,
        transcript: Ok(RawTranscript {
            page,
            column,
            lines: Vec::new(),
        }),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: 0,
        retries: 0,
    };

    let builtin = NotationTables::shared();
    let Some(table) = table_for(&config.notation, config.language).or_else(|| builtin.get(Language::English))
    else {
        outcome.transcript = Err(ExtractionError::RecognizerFailed {
            page,
            column,
            retries: 0,
            detail: format!("no glyph table for {}", config.language),
        });
        return outcome;
    };

    let image = match encode::encode_column(column_image) {
        Ok(image) => image,
        Err(e) => {
            outcome.transcript = Err(ExtractionError::EncodeFailed {
                page,
                column,
                detail: e.to_string(),
            });
            return outcome;
        }
    };

    let request = RecognitionRequest {
        page,
        column,
        language: config.language,
        system_prompt: config
            .system_prompt
            .clone()
            .unwrap_or_else(|| recognition_prompt(config.language, table)),
        image,
    };

    let limit = Duration::from_secs(config.api_timeout_secs);
    let mut last_err: Option<ExtractionError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_delay_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Page {} column {}: retry {}/{} after {}ms",
                page, column, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }
        if let Some(throttle) = throttle {
            throttle.wait().await;
        }

        match timeout(limit, recognizer.recognize(&request)).await {
            Ok(Ok(recognition)) => {
                let lines = postprocess::clean_transcript(&recognition.text, table);
                debug!(
                    "Page {} column {}: {} lines, {} input tokens, {} output tokens",
                    page,
                    column,
                    lines.len(),
                    recognition.input_tokens,
                    recognition.output_tokens
                );
                outcome.transcript = Ok(RawTranscript { page, column, lines });
                outcome.input_tokens = recognition.input_tokens;
                outcome.output_tokens = recognition.output_tokens;
                outcome.retries = attempt;
                outcome.duration_ms = start.elapsed().as_millis() as u64;
                return outcome;
            }
            Ok(Err(e)) => {
                warn!(
                    "Page {} column {}: attempt {} failed: {}",
                    page,
                    column,
                    attempt + 1,
                    e
                );
                last_err = Some(ExtractionError::RecognizerFailed {
                    page,
                    column,
                    retries: config.max_retries,
                    detail: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    "Page {} column {}: attempt {} timed out after {}s",
                    page,
                    column,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(ExtractionError::Timeout {
                    page,
                    column,
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    outcome.transcript = Err(last_err.unwrap_or_else(|| ExtractionError::RecognizerFailed {
        page,
        column,
        retries: config.max_retries,
        detail: "Unknown error".to_string(),
    }));
    outcome.retries = config.max_retries;
    outcome.duration_ms = start.elapsed().as_millis() as u64;
    outcome
}

/// Delay before retry `attempt` (1-based): `base` doubled per prior retry.
fn backoff_delay_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

//! Backend trait and normalized request/response types.
//!
//! The [`Backend`] trait abstracts over LLM providers, translating between
//! normalized [`LlmRequest`]/[`LlmResponse`] types and provider-specific
//! HTTP APIs. Built-in implementations: [`OpenAiBackend`], [`GeminiBackend`].
//!
//! ## Architecture
//!
//! ```text
//! Stage ──► LlmRequest ──► with_backoff() ──► Backend::complete() ──► LlmResponse
//!                                                    │
//!                                       ┌────────────┴────────────┐
//!                                  OpenAiBackend             GeminiBackend
//!                               /v1/chat/completions   /v1beta/models/{m}:generateContent
//!                               image_url parts         inlineData parts
//! ```

pub mod backoff;
pub mod gemini;
pub mod mock;
pub mod openai;

pub use backoff::BackoffConfig;
pub use gemini::GeminiBackend;
pub use mock::MockBackend;
pub use openai::OpenAiBackend;

use crate::error::Result;
use crate::screenshot::ScreenshotInput;
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sampling temperature used for every stage.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Token ceiling used for every stage.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Sampling parameters for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f64,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Ask the provider to constrain output to a JSON object.
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            json_mode: false,
        }
    }
}

impl LlmConfig {
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

/// An inline image attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub mime_type: String,
    /// Standard base64, without a `data:` prefix.
    pub data: String,
}

impl From<&ScreenshotInput> for ImagePart {
    fn from(input: &ScreenshotInput) -> Self {
        Self {
            mime_type: input.mime_type.to_string(),
            data: input.image_base64.clone(),
        }
    }
}

/// A normalized LLM request, provider-agnostic.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Model identifier (e.g. `"gpt-4o"`, `"gemini-2.0-flash"`).
    pub model: String,

    /// Optional system instructions.
    pub system_prompt: Option<String>,

    /// The user prompt text.
    pub prompt: String,

    /// Images sent alongside the user prompt, in order.
    pub images: Vec<ImagePart>,

    /// Sampling parameters.
    pub config: LlmConfig,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            prompt: prompt.into(),
            images: Vec::new(),
            config: LlmConfig::default(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    pub fn with_images(mut self, images: Vec<ImagePart>) -> Self {
        self.images = images;
        self
    }

    pub fn with_config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }
}

/// A normalized LLM response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated text content. May be empty.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token counts, model info), as raw JSON.
    pub metadata: Option<serde_json::Value>,
}

/// Abstraction over LLM providers.
///
/// Implementors translate between the normalized [`LlmRequest`]/[`LlmResponse`]
/// and the provider's HTTP API. Each implementor carries its own credentials
/// and base URL.
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute a non-streaming LLM call.
    async fn complete(&self, client: &Client, request: &LlmRequest) -> Result<LlmResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Check whether a [`PipelineError`] is retryable based on the backoff config.
///
/// Retryable conditions:
/// - [`PipelineError::HttpError`] with a status in `config.retryable_statuses`
/// - [`PipelineError::Request`] (connection/transport errors)
pub fn is_retryable(error: &PipelineError, config: &BackoffConfig) -> bool {
    match error {
        PipelineError::HttpError { status, .. } => config.retryable_statuses.contains(status),
        PipelineError::Request(_) => true,
        _ => false,
    }
}

fn cancelled(flag: Option<&AtomicBool>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::Relaxed))
}

/// Execute a backend call with transport-level retry and exponential backoff.
///
/// Retries transient failures (429, 5xx, connection errors) according to
/// `config`. The cancellation flag is checked before the first attempt and
/// after every backoff sleep, never while a request is in flight.
pub async fn with_backoff(
    backend: &Arc<dyn Backend>,
    client: &Client,
    request: &LlmRequest,
    config: &BackoffConfig,
    cancel: Option<&AtomicBool>,
) -> Result<LlmResponse> {
    let mut last_error: Option<PipelineError> = None;

    for attempt in 0..=config.max_retries {
        if cancelled(cancel) {
            return Err(PipelineError::Cancelled);
        }

        if attempt > 0 {
            let delay = retry_delay(config, attempt, last_error.as_ref());
            log::warn!(
                "[PROVIDER] {} retry {}/{} in {}ms: {}",
                backend.name(),
                attempt,
                config.max_retries,
                delay.as_millis(),
                last_error.as_ref().map(|e| e.to_string()).unwrap_or_default()
            );
            tokio::time::sleep(delay).await;

            if cancelled(cancel) {
                return Err(PipelineError::Cancelled);
            }
        }

        match backend.complete(client, request).await {
            Ok(response) => return Ok(response),
            Err(e) if attempt < config.max_retries && is_retryable(&e, config) => {
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        PipelineError::Other("backoff loop exited unexpectedly".into())
    }))
}

fn retry_delay(config: &BackoffConfig, attempt: u32, last_error: Option<&PipelineError>) -> Duration {
    match last_error {
        Some(PipelineError::HttpError {
            retry_after: Some(ra),
            ..
        }) if config.respect_retry_after => (*ra).min(config.max_delay),
        _ => config.delay_for_attempt(attempt - 1),
    }
}

/// Parse a `Retry-After` header value given in whole seconds.
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Turn a non-success HTTP response into [`PipelineError::HttpError`].
pub(crate) async fn http_error(resp: reqwest::Response) -> PipelineError {
    let status = resp.status().as_u16();
    let retry_after = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let body = resp.text().await.unwrap_or_default();
    PipelineError::HttpError {
        status,
        body,
        retry_after,
    }
}

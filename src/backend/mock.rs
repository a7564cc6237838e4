//! Mock backend for exercising the pipeline without a live provider.
//!
//! [`MockBackend`] plays back a script of [`MockReply`]s in order and
//! records every request it sees, so tests can assert on call counts,
//! prompts, and how many images reached each stage.
//!
//! # Example
//!
//! ```
//! use screen_solve::backend::mock::{MockBackend, MockReply};
//!
//! let mock = MockBackend::scripted(vec![
//!     MockReply::Status(503),
//!     MockReply::Text("{\"problem_statement\": \"Two Sum\"}".into()),
//! ]);
//! assert!(mock.calls().is_empty());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Backend, LlmRequest, LlmResponse};
use crate::error::{PipelineError, Result};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// A 200 response carrying this text.
    Text(String),
    /// A 200 response with no text.
    Empty,
    /// A non-success HTTP status.
    Status(u16),
}

/// What the mock saw on one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub image_count: usize,
    pub json_mode: bool,
}

/// A test backend that plays back scripted replies.
///
/// Cycles back to the beginning when the script is exhausted. An empty
/// script behaves like [`MockReply::Empty`]. Requests in JSON mode can be
/// given their own script with [`with_json_replies`](Self::with_json_replies),
/// so one mock can serve both pipeline stages regardless of call order.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    json_replies: Option<Vec<MockReply>>,
    json_index: AtomicUsize,
    delay: Option<Duration>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockBackend {
    /// Create a mock that returns these texts in order.
    pub fn new(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(MockReply::Text).collect())
    }

    /// Create a mock that always returns the same text.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::scripted(vec![MockReply::Text(response.into())])
    }

    /// Create a mock from an explicit reply script.
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            index: AtomicUsize::new(0),
            json_replies: None,
            json_index: AtomicUsize::new(0),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Use a separate script for JSON-mode requests.
    pub fn with_json_replies(mut self, replies: Vec<MockReply>) -> Self {
        self.json_replies = Some(replies);
        self
    }

    /// Sleep this long inside every call before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call recorded so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn next_reply(&self, json_mode: bool) -> MockReply {
        match self.json_replies {
            Some(ref script) if json_mode => cycle(script, &self.json_index),
            _ => cycle(&self.replies, &self.index),
        }
    }

    fn record(&self, request: &LlmRequest) {
        let call = MockCall {
            model: request.model.clone(),
            system_prompt: request.system_prompt.clone(),
            prompt: request.prompt.clone(),
            image_count: request.images.len(),
            json_mode: request.config.json_mode,
        };
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

fn cycle(script: &[MockReply], index: &AtomicUsize) -> MockReply {
    if script.is_empty() {
        return MockReply::Empty;
    }
    let idx = index.fetch_add(1, Ordering::Relaxed) % script.len();
    script[idx].clone()
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(&self, _client: &Client, request: &LlmRequest) -> Result<LlmResponse> {
        self.record(request);
        let reply = self.next_reply(request.config.json_mode);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Text(text) => Ok(LlmResponse {
                text,
                status: 200,
                metadata: None,
            }),
            MockReply::Empty => Ok(LlmResponse {
                text: String::new(),
                status: 200,
                metadata: None,
            }),
            MockReply::Status(status) => Err(PipelineError::HttpError {
                status,
                body: format!("mock status {}", status),
                retry_after: None,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

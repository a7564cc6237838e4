//! The provider client: one initialized backend plus its HTTP client.
//!
//! A [`ProviderClient`] is built from a [`ProviderConfig`] snapshot and is
//! replaced wholesale, never mutated, when the provider or key changes.

use crate::backend::{
    with_backoff, Backend, BackoffConfig, GeminiBackend, LlmRequest, OpenAiBackend,
};
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{PipelineError, Result};
use crate::screenshot::ScreenshotInput;
use crate::stage::{ExtractionStage, SolutionStage};
use crate::types::ProblemInfo;
use reqwest::Client;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Request timeout applied to every provider call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// An initialized connection to one LLM provider.
///
/// # Example
///
/// ```
/// use screen_solve::client::ProviderClient;
/// use screen_solve::config::{ProviderConfig, ProviderKind};
///
/// let missing = ProviderConfig::new(ProviderKind::OpenAi, "");
/// assert!(ProviderClient::initialize(&missing).is_err());
/// ```
pub struct ProviderClient {
    kind: ProviderKind,
    backend: Arc<dyn Backend>,
    http: Client,
    backoff: BackoffConfig,
}

impl ProviderClient {
    /// Build a client for the configured provider.
    ///
    /// Fails with [`PipelineError::ProviderUnavailable`] when the key is
    /// missing or does not look like one the provider issues. No network
    /// call is made either way.
    pub fn initialize(config: &ProviderConfig) -> Result<Self> {
        Self::initialize_with_timeout(config, DEFAULT_TIMEOUT)
    }

    /// Like [`initialize`](Self::initialize) with a custom request timeout.
    pub fn initialize_with_timeout(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        validate_credentials(config)?;
        let key = config.api_key.trim();
        let backend: Arc<dyn Backend> = match config.provider {
            ProviderKind::OpenAi => Arc::new(OpenAiBackend::new(key)),
            ProviderKind::Gemini => Arc::new(GeminiBackend::new(key)),
        };
        log::info!("[PROVIDER] Initialized {} client", config.provider);
        Self::with_backend_and_timeout(config.provider, backend, timeout)
    }

    /// Build a client around an explicit backend, skipping key checks.
    pub fn with_backend(kind: ProviderKind, backend: Arc<dyn Backend>) -> Result<Self> {
        Self::with_backend_and_timeout(kind, backend, DEFAULT_TIMEOUT)
    }

    /// Like [`with_backend`](Self::with_backend) with a custom request timeout.
    pub fn with_backend_and_timeout(
        kind: ProviderKind,
        backend: Arc<dyn Backend>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            kind,
            backend,
            http,
            backoff: BackoffConfig::default(),
        })
    }

    /// Replace the transport retry policy.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Send one request and return its text.
    ///
    /// Blank text is [`PipelineError::EmptyResponse`].
    pub async fn complete(
        &self,
        request: &LlmRequest,
        cancel: Option<&AtomicBool>,
    ) -> Result<String> {
        let response =
            with_backoff(&self.backend, &self.http, request, &self.backoff, cancel).await?;
        log::debug!(
            "[PROVIDER] {} responded: status={} chars={}",
            self.backend.name(),
            response.status,
            response.text.len()
        );
        if response.text.trim().is_empty() {
            return Err(PipelineError::EmptyResponse);
        }
        Ok(response.text)
    }

    /// Read a problem description out of screenshots.
    pub async fn extract(
        &self,
        images: &[ScreenshotInput],
        language: &str,
        model: &str,
    ) -> Result<ProblemInfo> {
        ExtractionStage::new(model, language)
            .run(self, images, None)
            .await
    }

    /// Ask for a solution and return the raw model text, unparsed.
    pub async fn solve(&self, problem: &ProblemInfo, language: &str, model: &str) -> Result<String> {
        let request = SolutionStage::new(model, language).request(problem);
        self.complete(&request, None).await
    }
}

/// Check that `config` carries a key shaped like one its provider issues.
pub fn validate_credentials(config: &ProviderConfig) -> Result<()> {
    if !config.has_api_key() {
        return Err(PipelineError::ProviderUnavailable(format!(
            "no API key configured for {}",
            config.provider
        )));
    }
    if !config.provider.is_valid_key_format(&config.api_key) {
        return Err(PipelineError::ProviderUnavailable(format!(
            "API key does not look like a {} key",
            config.provider
        )));
    }
    Ok(())
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("kind", &self.kind)
            .field("backend", &self.backend.name())
            .field("backoff", &self.backoff)
            .finish()
    }
}

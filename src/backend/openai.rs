//! Backend for OpenAI-style chat completions with image input.
//!
//! Endpoint: `{base}/v1/chat/completions`. Images travel as `image_url`
//! content parts carrying `data:` URLs, after the text part.

use super::{http_error, Backend, LlmRequest, LlmResponse};
use crate::config::redact;
use crate::error::Result;
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Default API host.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Backend for OpenAI's chat completions API.
///
/// # Example
///
/// ```
/// use screen_solve::backend::OpenAiBackend;
///
/// let backend = OpenAiBackend::new("sk-...").with_organization("org-abc");
/// ```
#[derive(Clone)]
pub struct OpenAiBackend {
    /// Sent as `Authorization: Bearer {key}`.
    api_key: String,
    /// If set, sent as `OpenAI-Organization: {org}`.
    organization: Option<String>,
    base_url: String,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("api_key", &redact(&self.api_key))
            .field("organization", &self.organization)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            organization: None,
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    /// Set the organization ID header.
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Point the backend at another host (proxy, compatible server).
    ///
    /// A trailing `/v1` is stripped so the path is not doubled.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        let trimmed = base.trim_end_matches('/');
        self.base_url = trimmed.strip_suffix("/v1").unwrap_or(trimmed).to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// Build the messages array: optional system message, then one user
    /// message holding the prompt text followed by every image.
    fn build_messages(request: &LlmRequest) -> Vec<Value> {
        let mut messages = Vec::new();

        if let Some(ref sys) = request.system_prompt {
            if !sys.is_empty() {
                messages.push(json!({"role": "system", "content": sys}));
            }
        }

        if request.images.is_empty() {
            messages.push(json!({"role": "user", "content": request.prompt}));
        } else {
            let mut parts = vec![json!({"type": "text", "text": request.prompt})];
            for image in &request.images {
                parts.push(json!({
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", image.mime_type, image.data),
                        "detail": "high",
                    },
                }));
            }
            messages.push(json!({"role": "user", "content": parts}));
        }

        messages
    }

    fn build_body(request: &LlmRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": Self::build_messages(request),
            "temperature": request.config.temperature,
            "max_tokens": request.config.max_tokens,
        });

        if request.config.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        body
    }

    fn build_http_request(&self, client: &Client, body: &Value) -> reqwest::RequestBuilder {
        let mut req = client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(body);

        if let Some(ref org) = self.organization {
            req = req.header("OpenAI-Organization", org.as_str());
        }

        req
    }

    fn extract_text(json_resp: &Value) -> String {
        json_resp
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    }

    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        for key in ["usage", "model", "id"] {
            if let Some(v) = json_resp.get(key) {
                meta.insert(key.into(), v.clone());
            }
        }
        if meta.is_empty() {
            None
        } else {
            Some(Value::Object(meta))
        }
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn complete(&self, client: &Client, request: &LlmRequest) -> Result<LlmResponse> {
        let body = Self::build_body(request);
        log::debug!(
            "[PROVIDER] openai request: model={} images={} prompt_chars={}",
            request.model,
            request.images.len(),
            request.prompt.len()
        );

        let resp = self
            .build_http_request(client, &body)
            .send()
            .await
            .map_err(PipelineError::Request)?;

        if !resp.status().is_success() {
            return Err(http_error(resp).await);
        }

        let status = resp.status().as_u16();
        let json_resp: Value = resp.json().await?;

        Ok(LlmResponse {
            text: Self::extract_text(&json_resp),
            status,
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

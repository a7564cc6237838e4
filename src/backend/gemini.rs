//! Backend for Gemini-style `generateContent`.
//!
//! Endpoint: `{base}/v1beta/models/{model}:generateContent`, key in the
//! `x-goog-api-key` header. Images travel as `inlineData` parts after the
//! text part; system instructions go in `systemInstruction`.

use super::{http_error, Backend, LlmRequest, LlmResponse};
use crate::config::redact;
use crate::error::Result;
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Default API host.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Backend for Google's Gemini API.
#[derive(Clone)]
pub struct GeminiBackend {
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Point the backend at another host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// An `error` object in a success response, as the provider error it is.
    ///
    /// The object's `code` becomes the status when it is an HTTP error code,
    /// so a rejected key still classifies as an auth failure.
    fn body_error(resp: &Value, status: u16) -> Option<PipelineError> {
        let error = resp.get("error")?;
        let status = error
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .filter(|code| *code >= 400)
            .unwrap_or(status);
        let body = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        Some(PipelineError::HttpError {
            status,
            body,
            retry_after: None,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_body(request: &LlmRequest) -> Value {
        let mut parts = vec![json!({"text": request.prompt})];
        for image in &request.images {
            parts.push(json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": image.data,
                }
            }));
        }

        let mut generation_config = json!({
            "temperature": request.config.temperature,
            "maxOutputTokens": request.config.max_tokens,
        });
        if request.config.json_mode {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({
            "contents": [{"role": "user", "parts": parts}],
            "generationConfig": generation_config,
        });

        if let Some(ref sys) = request.system_prompt {
            if !sys.is_empty() {
                body["systemInstruction"] = json!({"parts": [{"text": sys}]});
            }
        }

        body
    }

    /// Concatenate every text part of the first candidate.
    fn extract_text(json_resp: &Value) -> String {
        json_resp
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        if let Some(v) = json_resp.get("usageMetadata") {
            meta.insert("usage".into(), v.clone());
        }
        if let Some(v) = json_resp.get("modelVersion") {
            meta.insert("model".into(), v.clone());
        }
        if let Some(v) = json_resp
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("finishReason"))
        {
            meta.insert("finish_reason".into(), v.clone());
        }
        if meta.is_empty() {
            None
        } else {
            Some(Value::Object(meta))
        }
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    async fn complete(&self, client: &Client, request: &LlmRequest) -> Result<LlmResponse> {
        let body = Self::build_body(request);
        log::debug!(
            "[PROVIDER] gemini request: model={} images={} prompt_chars={}",
            request.model,
            request.images.len(),
            request.prompt.len()
        );

        let resp = client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(PipelineError::Request)?;

        if !resp.status().is_success() {
            return Err(http_error(resp).await);
        }

        let status = resp.status().as_u16();
        let json_resp: Value = resp.json().await?;

        if let Some(err) = Self::body_error(&json_resp, status) {
            return Err(err);
        }

        Ok(LlmResponse {
            text: Self::extract_text(&json_resp),
            status,
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ImagePart, LlmConfig};
    use crate::error::FailureKind;

    #[test]
    fn test_body_parts_and_generation_config() {
        let request = LlmRequest::new("gemini-2.0-flash", "Read this.").with_images(vec![
            ImagePart {
                mime_type: "image/jpeg".into(),
                data: "QUJD".into(),
            },
        ]);

        let body = GeminiBackend::build_body(&request);
        let parts = body["contents"][0]["parts"].as_array().expect("parts");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "Read this.");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "QUJD");

        assert_eq!(body["generationConfig"]["temperature"], 0.2);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4000);
        assert!(body["generationConfig"].get("responseMimeType").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_body_system_and_json_mode() {
        let request = LlmRequest::new("m", "p")
            .with_system("Only JSON.")
            .with_config(LlmConfig::default().with_json_mode(true));

        let body = GeminiBackend::build_body(&request);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Only JSON.");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_endpoint_includes_model() {
        let backend = GeminiBackend::new("key").with_base_url("http://localhost:9000/");
        assert_eq!(
            backend.endpoint("gemini-1.5-pro"),
            "http://localhost:9000/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let resp = json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP",
            }],
            "usageMetadata": {"promptTokenCount": 5},
        });
        assert_eq!(GeminiBackend::extract_text(&resp), "Hello, world");
        let meta = GeminiBackend::extract_metadata(&resp).unwrap();
        assert_eq!(meta["finish_reason"], "STOP");
        assert_eq!(meta["usage"]["promptTokenCount"], 5);
    }

    #[test]
    fn test_extract_text_missing_candidates() {
        assert_eq!(GeminiBackend::extract_text(&json!({})), "");
        assert!(GeminiBackend::extract_metadata(&json!({})).is_none());
    }

    #[test]
    fn test_error_body_is_call_failure() {
        let resp = json!({"error": {"code": 500, "message": "backend overloaded", "status": "INTERNAL"}});
        let err = GeminiBackend::body_error(&resp, 200).unwrap();
        assert!(matches!(err, PipelineError::HttpError { status: 500, .. }));
        assert_eq!(err.kind(), FailureKind::CallFailure);
        assert_eq!(err.user_message(), "HTTP 500: backend overloaded");

        let bare = GeminiBackend::body_error(&json!({"error": "quota"}), 200).unwrap();
        assert_eq!(bare.kind(), FailureKind::CallFailure);
        assert!(GeminiBackend::body_error(&json!({"candidates": []}), 200).is_none());
    }

    #[test]
    fn test_error_body_with_auth_code() {
        let resp = json!({"error": {"code": 403, "message": "API key not valid"}});
        let err = GeminiBackend::body_error(&resp, 200).unwrap();
        assert_eq!(err.kind(), FailureKind::ProviderUnavailable);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = GeminiBackend::new("AIzaSyA1234567890abcdef");
        let debug_output = format!("{:?}", backend);
        assert!(!debug_output.contains("1234567890abcdef"));
        assert!(debug_output.contains("AIzaSy***"));
    }
}

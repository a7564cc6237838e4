use std::time::Duration;
use thiserror::Error;

/// Errors produced by the pipeline and its components.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No usable provider client: the API key is missing, malformed, or was
    /// rejected by the provider.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider answered but returned no text.
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// The extraction response could not be read as a problem description.
    #[error("Malformed JSON in extraction response: {reason}")]
    MalformedJson {
        /// The serde error message.
        reason: String,
        /// A truncated copy of the text that failed to parse.
        raw: String,
    },

    /// The screenshot queue was empty, or every queued file has vanished.
    #[error("No screenshots to process")]
    NoScreenshots,

    /// The run was superseded or cancelled at a stage boundary.
    #[error("Run was cancelled")]
    Cancelled,

    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// HTTP error with status code, response body, and optional Retry-After hint.
    ///
    /// Returned by [`Backend`](crate::backend::Backend) implementations when
    /// the provider returns a non-success status code.
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// JSON (de)serialization failed outside of response parsing.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration detected before any call was made.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

/// Coarse failure category reported with a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing or rejected credentials. The user should check the API key.
    ProviderUnavailable,
    /// The provider returned no text.
    EmptyResponse,
    /// The extraction response was not valid problem JSON.
    MalformedJson,
    /// Nothing to process.
    NoScreenshots,
    /// Network or provider-side error.
    CallFailure,
    /// The run was cancelled.
    Cancelled,
    /// Anything else (configuration, local I/O).
    Internal,
}

impl PipelineError {
    /// Classify this error into a [`FailureKind`].
    ///
    /// HTTP 401 and 403 count as [`FailureKind::ProviderUnavailable`], since
    /// they mean the configured key was rejected.
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::ProviderUnavailable(_) => FailureKind::ProviderUnavailable,
            PipelineError::HttpError { status, .. } if matches!(status, 401 | 403) => {
                FailureKind::ProviderUnavailable
            }
            PipelineError::EmptyResponse => FailureKind::EmptyResponse,
            PipelineError::MalformedJson { .. } => FailureKind::MalformedJson,
            PipelineError::NoScreenshots => FailureKind::NoScreenshots,
            PipelineError::Cancelled => FailureKind::Cancelled,
            PipelineError::Request(_) | PipelineError::HttpError { .. } => {
                FailureKind::CallFailure
            }
            PipelineError::Json(_)
            | PipelineError::Io(_)
            | PipelineError::InvalidConfig(_)
            | PipelineError::Other(_) => FailureKind::Internal,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self.kind() {
            FailureKind::ProviderUnavailable => {
                "The AI provider is unavailable. Please check your API key.".to_string()
            }
            FailureKind::EmptyResponse | FailureKind::MalformedJson => {
                "Failed to parse response from the AI provider.".to_string()
            }
            FailureKind::NoScreenshots => "No screenshots to process.".to_string(),
            FailureKind::Cancelled => "Processing was cancelled.".to_string(),
            FailureKind::CallFailure | FailureKind::Internal => self.to_string(),
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_provider_unavailable() {
        let err = PipelineError::HttpError {
            status: 401,
            body: "invalid key".into(),
            retry_after: None,
        };
        assert_eq!(err.kind(), FailureKind::ProviderUnavailable);
        assert!(err.user_message().contains("API key"));
    }

    #[test]
    fn test_server_error_is_call_failure() {
        let err = PipelineError::HttpError {
            status: 500,
            body: "boom".into(),
            retry_after: None,
        };
        assert_eq!(err.kind(), FailureKind::CallFailure);
        assert_eq!(err.user_message(), "HTTP 500: boom");
    }

    #[test]
    fn test_parse_failures_share_message() {
        let empty = PipelineError::EmptyResponse;
        let malformed = PipelineError::MalformedJson {
            reason: "expected value".into(),
            raw: "nope".into(),
        };
        assert_eq!(empty.user_message(), malformed.user_message());
        assert_eq!(malformed.kind(), FailureKind::MalformedJson);
    }
}

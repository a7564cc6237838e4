//! Error types for response parsers.

use crate::error::PipelineError;

/// Errors returned by the extraction-response parser.
///
/// Solution parsing never fails; only problem extraction can.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The response was empty or whitespace-only once markers were removed.
    #[error("empty LLM response")]
    EmptyResponse,

    /// The response was not a valid problem-description JSON object.
    #[error("JSON deserialization failed: {reason}")]
    MalformedJson {
        /// The serde error message.
        reason: String,
        /// A truncated copy of the text that failed to parse.
        raw: String,
    },
}

impl From<ParseError> for PipelineError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::EmptyResponse => PipelineError::EmptyResponse,
            ParseError::MalformedJson { reason, raw } => PipelineError::MalformedJson { reason, raw },
        }
    }
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", &s[..idx]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }

    #[test]
    fn test_converts_to_pipeline_error() {
        let err: PipelineError = ParseError::MalformedJson {
            reason: "expected value at line 1".into(),
            raw: "nope".into(),
        }
        .into();
        assert!(matches!(err, PipelineError::MalformedJson { ref raw, .. } if raw == "nope"));

        let err: PipelineError = ParseError::EmptyResponse.into();
        assert!(matches!(err, PipelineError::EmptyResponse));
    }
}

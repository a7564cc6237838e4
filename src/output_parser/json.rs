//! Strict JSON parsing for extraction responses.
//!
//! Leading reasoning blocks and fence markers are removed, then the
//! remainder must be one JSON value of the target type. There is no repair step: a field
//! the model got wrong is reported, never guessed.

use serde::de::DeserializeOwned;

use crate::output_parser::error::{truncate, ParseError};
use crate::output_parser::extract::{strip_json_fences, strip_leading_think_tags};
use crate::types::ProblemInfo;

/// Parse a response into `T` after stripping fences.
///
/// # Examples
///
/// ```
/// use serde::Deserialize;
/// use screen_solve::output_parser::parse_json;
///
/// #[derive(Deserialize)]
/// struct Answer {
///     value: u32,
/// }
///
/// let answer: Answer = parse_json("```json\n{\"value\": 7}\n```").unwrap();
/// assert_eq!(answer.value, 7);
/// ```
pub fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T, ParseError> {
    let cleaned = strip_leading_think_tags(response).trim();
    if cleaned.is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    let body = strip_json_fences(cleaned);
    if body.is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    serde_json::from_str::<T>(&body).map_err(|e| ParseError::MalformedJson {
        reason: e.to_string(),
        raw: truncate(&body, 200),
    })
}

/// Parse an extraction response into a [`ProblemInfo`].
pub fn parse_problem_info(response: &str) -> Result<ProblemInfo, ParseError> {
    parse_json(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{
        "problem_statement": "Return the indices of two numbers that add up to target.",
        "constraints": "2 <= nums.length <= 10^4",
        "example_input": "nums = [2,7,11,15], target = 9",
        "example_output": "[0,1]"
    }"#;

    #[test]
    fn plain_json() {
        let info = parse_problem_info(PLAIN).unwrap();
        assert!(info.problem_statement.starts_with("Return the indices"));
        assert_eq!(info.example_output.as_deref(), Some("[0,1]"));
    }

    #[test]
    fn fenced_json_parses_identically() {
        let fenced = format!("```json\n{}\n```", PLAIN);
        assert_eq!(
            parse_problem_info(&fenced).unwrap(),
            parse_problem_info(PLAIN).unwrap()
        );

        let bare = format!("```\n{}\n```", PLAIN);
        assert_eq!(
            parse_problem_info(&bare).unwrap(),
            parse_problem_info(PLAIN).unwrap()
        );
    }

    #[test]
    fn missing_optional_fields_are_absent() {
        let info = parse_problem_info(r#"{"problem_statement": "Sort it", "constraints": null}"#)
            .unwrap();
        assert_eq!(info.problem_statement, "Sort it");
        assert_eq!(info.constraints, None);
        assert_eq!(info.example_input, None);
        assert_eq!(info.example_output, None);
    }

    #[test]
    fn think_block_is_ignored() {
        let input = "<think>looking at the image</think>```json\n{\"problem_statement\": \"x\"}\n```";
        assert_eq!(parse_problem_info(input).unwrap().problem_statement, "x");
    }

    #[test]
    fn think_tag_inside_statement_is_content() {
        let input = "<think>reading</think>```json\n{\"problem_statement\": \"Strip every <think> tag from the page\", \"constraints\": \"no </think> without <think>\"}\n```";
        let info = parse_problem_info(input).unwrap();
        assert_eq!(info.problem_statement, "Strip every <think> tag from the page");
        assert_eq!(info.constraints.as_deref(), Some("no </think> without <think>"));
    }

    #[test]
    fn prose_is_malformed() {
        let err = parse_problem_info("Sure! Here is the problem: {\"problem_statement\": \"x\"}")
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedJson { .. }));
    }

    #[test]
    fn missing_statement_is_malformed() {
        let err = parse_problem_info(r#"{"constraints": "n < 5"}"#).unwrap_err();
        match err {
            ParseError::MalformedJson { reason, raw } => {
                assert!(reason.contains("problem_statement"));
                assert!(raw.contains("constraints"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn trailing_comma_is_not_repaired() {
        let err = parse_problem_info(r#"{"problem_statement": "x",}"#).unwrap_err();
        assert!(matches!(err, ParseError::MalformedJson { .. }));
    }

    #[test]
    fn empty_and_fence_only_responses() {
        assert!(matches!(parse_problem_info("   "), Err(ParseError::EmptyResponse)));
        assert!(matches!(
            parse_problem_info("```json\n```"),
            Err(ParseError::EmptyResponse)
        ));
    }
}

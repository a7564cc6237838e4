//! Shared text clean-up used by every parser.

use regex::Regex;
use std::sync::OnceLock;

static CODE_BLOCK_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static JSON_FENCE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn code_block_regex() -> Option<&'static Regex> {
    CODE_BLOCK_REGEX
        .get_or_init(|| Regex::new(r"(?s)```(?:[\w+#-]+)?[ \t]*\n?(.*?)```").ok())
        .as_ref()
}

fn json_fence_regex() -> Option<&'static Regex> {
    JSON_FENCE_REGEX
        .get_or_init(|| Regex::new(r"(?i)```(?:json)?").ok())
        .as_ref()
}

/// Preprocessing applied to every response: strip reasoning blocks, then trim.
pub fn preprocess(text: &str) -> String {
    strip_think_tags(text).trim().to_string()
}

/// Strip all `<think>...</think>` and `<thinking>...</thinking>` blocks from text.
///
/// Handles complete blocks, incomplete blocks (no closing tag),
/// and multiple sequential blocks.
///
/// # Examples
///
/// ```
/// use screen_solve::output_parser::strip_think_tags;
///
/// assert_eq!(strip_think_tags("<think>reasoning</think>result"), "result");
/// assert_eq!(strip_think_tags("<think>no closing tag"), "");
/// ```
pub fn strip_think_tags(text: &str) -> String {
    let result = strip_tag_variant(text, "<think>", "</think>");
    strip_tag_variant(&result, "<thinking>", "</thinking>")
}

/// Strip `<think>`/`<thinking>` blocks that come before any other text.
///
/// Tags further in are content and are kept, so a JSON string holding a
/// literal `<think>` survives. An unclosed leading block leaves nothing.
///
/// ```
/// use screen_solve::output_parser::extract::strip_leading_think_tags;
///
/// assert_eq!(strip_leading_think_tags("<think>a</think> {\"x\": \"<think>\"}"), "{\"x\": \"<think>\"}");
/// ```
pub fn strip_leading_think_tags(text: &str) -> &str {
    let mut rest = text.trim_start();
    loop {
        let close = if rest.starts_with("<think>") {
            "</think>"
        } else if rest.starts_with("<thinking>") {
            "</thinking>"
        } else {
            return rest;
        };
        match rest.find(close) {
            Some(end) => rest = rest[end + close.len()..].trim_start(),
            None => return "",
        }
    }
}

fn strip_tag_variant(text: &str, open: &str, close: &str) -> String {
    let mut result = text.to_string();
    while let Some(start) = result.find(open) {
        if let Some(end_offset) = result[start..].find(close) {
            let end = start + end_offset + close.len();
            result = format!("{}{}", &result[..start], &result[end..]);
        } else {
            // unclosed: drop everything after the open tag
            result.truncate(start);
            break;
        }
    }
    result
}

/// Remove every ```` ```json ```` and ```` ``` ```` marker and trim.
///
/// Text outside the fences is kept, so prose around a fenced object still
/// fails strict parsing.
pub fn strip_json_fences(text: &str) -> String {
    match json_fence_regex() {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Content of the first fenced code block, trimmed.
///
/// An optional language tag after the opening fence is skipped.
///
/// # Examples
///
/// ```
/// use screen_solve::output_parser::extract::extract_code_block;
///
/// let input = "Here:\n```python\nprint('hi')\n```\nDone.";
/// assert_eq!(extract_code_block(input), Some("print('hi')"));
/// assert_eq!(extract_code_block("no fences"), None);
/// ```
pub fn extract_code_block(text: &str) -> Option<&str> {
    code_block_regex()?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_think_tags_complete() {
        assert_eq!(strip_think_tags("<think>reasoning</think>result"), "result");
    }

    #[test]
    fn strip_think_tags_multiple_and_mixed() {
        let input = "<think>a</think>mid<thinking>b</thinking>end";
        assert_eq!(strip_think_tags(input), "midend");
    }

    #[test]
    fn strip_thinking_tags_incomplete() {
        assert_eq!(strip_think_tags("keep<thinking>reasoning without close"), "keep");
    }

    #[test]
    fn preprocess_strips_and_trims() {
        assert_eq!(preprocess("  <think>stuff</think>  hello world  "), "hello world");
    }

    #[test]
    fn strip_leading_think_tags_keeps_inner_tags() {
        assert_eq!(
            strip_leading_think_tags("<think>a</think>\n<thinking>b</thinking> body <think>kept"),
            "body <think>kept"
        );
        assert_eq!(strip_leading_think_tags("no tags <think>x</think>"), "no tags <think>x</think>");
        assert_eq!(strip_leading_think_tags("<think>never closed"), "");
    }

    #[test]
    fn strip_json_fences_variants() {
        assert_eq!(strip_json_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_json_fences("```JSON\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_json_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_json_fences("  {}  "), "{}");
    }

    #[test]
    fn extract_code_block_with_language() {
        let input = "Solution:\n```rust\nfn main() {}\n```\nTime complexity: O(1)";
        assert_eq!(extract_code_block(input), Some("fn main() {}"));
    }

    #[test]
    fn extract_code_block_tags_with_symbols() {
        assert_eq!(extract_code_block("```c++\nint x;\n```"), Some("int x;"));
        assert_eq!(extract_code_block("```c#\nvar x = 1;\n```"), Some("var x = 1;"));
    }

    #[test]
    fn extract_code_block_bare_fence() {
        assert_eq!(extract_code_block("```\nx = 1\n```"), Some("x = 1"));
    }

    #[test]
    fn extract_code_block_takes_first() {
        let input = "```py\nfirst\n```\ntext\n```py\nsecond\n```";
        assert_eq!(extract_code_block(input), Some("first"));
    }

    #[test]
    fn extract_code_block_unclosed() {
        assert_eq!(extract_code_block("```python\nprint(1)"), None);
    }
}

//! Heuristic parsing of free-text solution responses.
//!
//! Every extractor here is total: a response with no recognisable structure
//! still yields a complete [`SolutionResult`] built from the constants below.
//!
//! | Field | Source | Fallback |
//! |-------|--------|----------|
//! | code | first fenced block | whole response |
//! | thoughts | `Thoughts:` / `Key Insights:` / `Reasoning:` / `Approach:` section | [`DEFAULT_INSIGHT`] |
//! | time_complexity | text after `Time complexity:` | [`DEFAULT_TIME_COMPLEXITY`] |
//! | space_complexity | text after `Space complexity:` | [`DEFAULT_SPACE_COMPLEXITY`] |

use regex::Regex;
use std::sync::OnceLock;

use crate::diagnostics::{CodeSource, ParseDiagnostics};
use crate::output_parser::extract::{extract_code_block, preprocess};
use crate::output_parser::list::{section_entries, ListStyle};
use crate::types::SolutionResult;

/// Single insight used when the response has no insights section.
pub const DEFAULT_INSIGHT: &str = "Solution approach based on efficient algorithm design";

/// Time complexity used when the response states none.
pub const DEFAULT_TIME_COMPLEXITY: &str = "O(n) - Linear time, since each element of the input \
is processed a constant number of times. No step revisits earlier elements, so the work grows \
in direct proportion to the input size.";

/// Space complexity used when the response states none.
pub const DEFAULT_SPACE_COMPLEXITY: &str = "O(n) - Linear space, since the auxiliary data \
structures may hold up to one entry per input element. Apart from that storage only a fixed \
number of scalar variables is used.";

/// Notation prefixed to a complexity statement that has none.
pub const FALLBACK_NOTATION: &str = "O(n)";

static INSIGHTS_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static TIME_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static SPACE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static NOTATION_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static TRAILING_MARKER_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn insights_regex() -> Option<&'static Regex> {
    INSIGHTS_REGEX
        .get_or_init(|| {
            Regex::new(
                r"(?s)(?:Thoughts:|Key Insights:|Reasoning:|Approach:)(.*?)(?:(?i:time complexity:)|$)",
            )
            .ok()
        })
        .as_ref()
}

fn time_regex() -> Option<&'static Regex> {
    TIME_REGEX
        .get_or_init(|| Regex::new(r"(?is)time complexity:?(.*?)(?:space complexity|$)").ok())
        .as_ref()
}

fn space_regex() -> Option<&'static Regex> {
    SPACE_REGEX
        .get_or_init(|| Regex::new(r"(?s)(?i:space complexity):?(.*?)(?:\n[ \t]*[A-Z]|$)").ok())
        .as_ref()
}

fn notation_regex() -> Option<&'static Regex> {
    NOTATION_REGEX
        .get_or_init(|| Regex::new(r"O\([^)]*\)").ok())
        .as_ref()
}

fn trailing_marker_regex() -> Option<&'static Regex> {
    TRAILING_MARKER_REGEX
        .get_or_init(|| Regex::new(r"\n[ \t]*(?:[-*•]|\d+[.)])?[ \t*]*$").ok())
        .as_ref()
}

/// Parse a solution response. Never fails.
pub fn parse_solution(response: &str) -> SolutionResult {
    parse_solution_with_diagnostics(response).0
}

/// Parse a solution response and report which fields fell back to defaults.
pub fn parse_solution_with_diagnostics(response: &str) -> (SolutionResult, ParseDiagnostics) {
    let text = preprocess(response);
    let mut diagnostics = ParseDiagnostics::default();

    let code = match extract_code_block(&text) {
        Some(code) => {
            diagnostics.code = CodeSource::Fenced;
            code.to_string()
        }
        None => text.clone(),
    };

    let thoughts = match extract_insights(&text) {
        Some((entries, style)) => {
            diagnostics.insights = style.into();
            entries
        }
        None => vec![DEFAULT_INSIGHT.to_string()],
    };

    let time_complexity = match extract_time_complexity(&text) {
        Some(raw) => normalize_complexity(&raw),
        None => {
            diagnostics.time_defaulted = true;
            DEFAULT_TIME_COMPLEXITY.to_string()
        }
    };

    let space_complexity = match extract_space_complexity(&text) {
        Some(raw) => normalize_complexity(&raw),
        None => {
            diagnostics.space_defaulted = true;
            DEFAULT_SPACE_COMPLEXITY.to_string()
        }
    };

    (
        SolutionResult {
            code,
            thoughts,
            time_complexity,
            space_complexity,
        },
        diagnostics,
    )
}

/// Entries of the first insights section, or `None` if there is no section
/// or it is empty.
pub fn extract_insights(text: &str) -> Option<(Vec<String>, ListStyle)> {
    let section = insights_regex()?.captures(text)?.get(1)?.as_str();
    let (entries, style) = section_entries(section);
    if entries.is_empty() {
        None
    } else {
        Some((entries, style))
    }
}

/// Raw text after `Time complexity:`, up to `Space complexity` or the end.
pub fn extract_time_complexity(text: &str) -> Option<String> {
    capture_statement(time_regex()?, text)
}

/// Raw text after `Space complexity:`, up to the next line starting with a
/// capital letter or the end.
pub fn extract_space_complexity(text: &str) -> Option<String> {
    capture_statement(space_regex()?, text)
}

fn capture_statement(re: &Regex, text: &str) -> Option<String> {
    let raw = re.captures(text)?.get(1)?.as_str();
    let cleaned = clean_statement(raw);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Trim whitespace, markdown emphasis and a dangling list marker left over
/// from the next numbered heading.
fn clean_statement(raw: &str) -> String {
    let mut text = raw.trim_end().to_string();
    if let Some(re) = trailing_marker_regex() {
        loop {
            let stripped = re.replace(&text, "").into_owned();
            if stripped == text {
                break;
            }
            text = stripped;
        }
    }
    text.trim_matches(|c: char| c == '*' || c.is_whitespace())
        .to_string()
}

/// Make sure a complexity statement reads `O(...) - explanation`.
///
/// - No `O(...)` at all: prefixed with [`FALLBACK_NOTATION`].
/// - `O(...)` but neither `-` nor "because": rewritten as
///   `{notation} - {rest}`.
/// - Otherwise returned unchanged.
///
/// # Examples
///
/// ```
/// use screen_solve::output_parser::solution::normalize_complexity;
///
/// assert_eq!(normalize_complexity("O(1)"), "O(1) - ");
/// assert_eq!(normalize_complexity("linear scan"), "O(n) - linear scan");
/// assert_eq!(
///     normalize_complexity("O(n log n) because of the sort"),
///     "O(n log n) because of the sort"
/// );
/// ```
pub fn normalize_complexity(statement: &str) -> String {
    let Some(notation) = notation_regex().and_then(|re| re.find(statement)) else {
        return format!("{} - {}", FALLBACK_NOTATION, statement);
    };

    if statement.contains('-') || statement.to_lowercase().contains("because") {
        return statement.to_string();
    }

    let rest = statement[notation.end()..].trim();
    format!("{} - {}", notation.as_str(), rest)
}

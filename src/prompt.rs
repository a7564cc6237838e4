//! Prompt templates for the two stages and the renderer that fills them.

use crate::types::ProblemInfo;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

static PLACEHOLDER_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn placeholder_regex() -> Option<&'static Regex> {
    PLACEHOLDER_REGEX
        .get_or_init(|| Regex::new(r"\{\{|\}\}|\{(\w+)\}").ok())
        .as_ref()
}

/// Placeholder substituted for any problem field the extraction left empty.
pub const NOT_PROVIDED: &str = "Not provided";

/// System instructions for the extraction call. Fixes the output contract.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a coding challenge interpreter. \
Analyze the screenshots of the coding problem and extract all relevant information. \
Return the information as a single JSON object with exactly these fields: \
problem_statement, constraints, example_input, example_output. \
Use null for any field that is not visible. \
Respond with the JSON object only, with no explanation, commentary or markdown around it.";

const EXTRACTION_USER_TEMPLATE: &str = "Extract the coding problem details from these \
screenshots. Return in JSON format with these fields: {{\"problem_statement\": ..., \
\"constraints\": ..., \"example_input\": ..., \"example_output\": ...}}. \
The solution will be written in {language}.";

/// System instructions for the solution call.
pub const SOLUTION_SYSTEM_PROMPT: &str = "You are an expert coding interview assistant. \
Provide clear, optimal solutions with detailed explanations.";

const SOLUTION_TEMPLATE: &str = "Generate a detailed solution for the following coding problem:

{problem_section}

{constraints_section}

{input_section}

{output_section}

LANGUAGE: {language}

I need the response in the following format:
1. Code: A clean, optimized implementation in {language}, inside a single fenced code block.
2. Key Insights: A bulleted list of the key insights and reasoning behind the approach.
3. Time complexity: O(X) followed by a detailed explanation of at least 2 sentences.
4. Space complexity: O(X) followed by a detailed explanation of at least 2 sentences.

For the complexity explanations, be thorough. For example: \"Time complexity: O(n) because \
we iterate through the array only once. This is optimal as we need to examine each element \
at least once to find the solution.\"

Your solution should be efficient and well-commented, and should handle edge cases.";

/// Build a prompt string with variable substitution.
///
/// Replaces `{key}` placeholders in the template with values from `vars`.
/// Use `{{` to insert a literal `{` and `}}` to insert a literal `}`.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use screen_solve::prompt::render;
///
/// let vars = HashMap::from([("name", "Alice".to_string())]);
/// let result = render("Hello {name}, here is JSON: {{\"key\": \"val\"}}", &vars);
/// assert_eq!(result, r#"Hello Alice, here is JSON: {"key": "val"}"#);
/// ```
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let Some(re) = placeholder_regex() else {
        return template.to_string();
    };
    // one pass over the template; substituted values are never rescanned
    re.replace_all(template, |caps: &Captures| match caps.get(1) {
        Some(key) => vars
            .get(key.as_str())
            .cloned()
            .unwrap_or_else(|| caps[0].to_string()),
        None => caps[0][..1].to_string(),
    })
    .into_owned()
}

/// Wrap text in a labeled section: `LABEL:\ncontent`.
pub fn section(label: &str, content: &str) -> String {
    format!("{}:\n{}", label, content)
}

fn or_not_provided(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_PROVIDED)
}

/// User prompt for the extraction call.
pub fn extraction_prompt(language: &str) -> String {
    let vars = HashMap::from([("language", language.to_string())]);
    render(EXTRACTION_USER_TEMPLATE, &vars)
}

/// User prompt for the solution call, embedding every problem field.
pub fn solution_prompt(problem: &ProblemInfo, language: &str) -> String {
    let statement = or_not_provided(Some(problem.problem_statement.as_str()));
    let vars = HashMap::from([
        ("problem_section", section("PROBLEM STATEMENT", statement)),
        (
            "constraints_section",
            section("CONSTRAINTS", or_not_provided(problem.constraints.as_deref())),
        ),
        (
            "input_section",
            section("EXAMPLE INPUT", or_not_provided(problem.example_input.as_deref())),
        ),
        (
            "output_section",
            section("EXAMPLE OUTPUT", or_not_provided(problem.example_output.as_deref())),
        ),
        ("language", language.to_string()),
    ]);
    render(SOLUTION_TEMPLATE, &vars)
}

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Structured description of a coding problem, produced by the extraction stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemInfo {
    /// The problem statement as read from the screenshots.
    pub problem_statement: String,

    /// Input constraints, if visible.
    #[serde(default, deserialize_with = "lenient_text")]
    pub constraints: Option<String>,

    /// Example input, if visible.
    #[serde(default, deserialize_with = "lenient_text")]
    pub example_input: Option<String>,

    /// Example output, if visible.
    #[serde(default, deserialize_with = "lenient_text")]
    pub example_output: Option<String>,
}

impl ProblemInfo {
    pub fn new(problem_statement: impl Into<String>) -> Self {
        Self {
            problem_statement: problem_statement.into(),
            constraints: None,
            example_input: None,
            example_output: None,
        }
    }

    pub fn with_constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = Some(constraints.into());
        self
    }

    pub fn with_example(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.example_input = Some(input.into());
        self.example_output = Some(output.into());
        self
    }
}

/// Accepts a string, a list of strings (joined by newlines), a number or a
/// bool for an optional text field. `null` and blank strings become `None`.
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(items)) => {
            let mut lines = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => lines.push(s),
                    Value::Number(_) | Value::Bool(_) => lines.push(item.to_string()),
                    other => {
                        return Err(serde::de::Error::custom(format!(
                            "unsupported list item: {}",
                            other
                        )))
                    }
                }
            }
            Some(lines.join("\n"))
        }
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
        Some(Value::Object(_)) => {
            return Err(serde::de::Error::custom("expected text, found an object"))
        }
    };
    Ok(text.filter(|s| !s.trim().is_empty()))
}

/// The terminal artifact of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionResult {
    /// The solution source code.
    pub code: String,

    /// Key insights behind the approach, in the order the model gave them.
    pub thoughts: Vec<String>,

    /// Big-O time complexity with a short explanation.
    pub time_complexity: String,

    /// Big-O space complexity with a short explanation.
    pub space_complexity: String,
}

/// Which view the UI should be showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Collecting screenshots.
    #[default]
    Queue,
    /// Showing (or waiting for) a solution.
    Solutions,
    /// Follow-up debugging on a solution.
    Debug,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_problem_info_optional_fields_absent() {
        let info: ProblemInfo =
            serde_json::from_value(json!({"problem_statement": "Two sum"})).unwrap();
        assert_eq!(info, ProblemInfo::new("Two sum"));
    }

    #[test]
    fn test_problem_info_null_and_blank_are_absent() {
        let info: ProblemInfo = serde_json::from_value(json!({
            "problem_statement": "Two sum",
            "constraints": null,
            "example_input": "   ",
        }))
        .unwrap();
        assert!(info.constraints.is_none());
        assert!(info.example_input.is_none());
    }

    #[test]
    fn test_problem_info_list_constraints_joined() {
        let info: ProblemInfo = serde_json::from_value(json!({
            "problem_statement": "Two sum",
            "constraints": ["1 <= n <= 10^4", "values fit in i32"],
            "example_output": 9,
        }))
        .unwrap();
        assert_eq!(
            info.constraints.as_deref(),
            Some("1 <= n <= 10^4\nvalues fit in i32")
        );
        assert_eq!(info.example_output.as_deref(), Some("9"));
    }

    #[test]
    fn test_problem_info_requires_statement() {
        let result = serde_json::from_value::<ProblemInfo>(json!({"constraints": "n > 0"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_view_serializes_lowercase() {
        assert_eq!(serde_json::to_value(View::Solutions).unwrap(), json!("solutions"));
        assert_eq!(View::default(), View::Queue);
    }
}

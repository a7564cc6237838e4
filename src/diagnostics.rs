//! Parse diagnostics for solution responses.
//!
//! [`ParseDiagnostics`] records which heuristics found real content and which
//! fell back to a default, so a degraded answer can be spotted in the logs
//! without the run failing.

use crate::output_parser::list::ListStyle;

/// Where the solution code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeSource {
    /// The first fenced code block.
    Fenced,
    /// No fence was found; the whole response is the code.
    #[default]
    RawText,
}

/// Where the insights list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsightsSource {
    /// Bullet lines under a recognised header.
    Bulleted,
    /// Non-blank lines under a recognised header.
    Lines,
    /// No header was found; the default insight was used.
    #[default]
    Default,
}

impl From<ListStyle> for InsightsSource {
    fn from(style: ListStyle) -> Self {
        match style {
            ListStyle::Bulleted => InsightsSource::Bulleted,
            ListStyle::Lines => InsightsSource::Lines,
        }
    }
}

/// Records what happened while parsing one solution response.
///
/// # Example
///
/// ```
/// use screen_solve::diagnostics::ParseDiagnostics;
///
/// let diag = ParseDiagnostics::default();
/// assert!(!diag.ok()); // nothing was found yet
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseDiagnostics {
    pub code: CodeSource,
    pub insights: InsightsSource,
    /// `Time complexity:` was missing or empty.
    pub time_defaulted: bool,
    /// `Space complexity:` was missing or empty.
    pub space_defaulted: bool,
}

impl ParseDiagnostics {
    /// Whether every field came from the response itself.
    pub fn ok(&self) -> bool {
        self.fallbacks().is_empty()
    }

    /// Names of the fields that fell back to a default.
    pub fn fallbacks(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.code == CodeSource::RawText {
            out.push("code");
        }
        if self.insights == InsightsSource::Default {
            out.push("insights");
        }
        if self.time_defaulted {
            out.push("time_complexity");
        }
        if self.space_defaulted {
            out.push("space_complexity");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reports_every_fallback() {
        let d = ParseDiagnostics {
            time_defaulted: true,
            space_defaulted: true,
            ..Default::default()
        };
        assert_eq!(
            d.fallbacks(),
            vec!["code", "insights", "time_complexity", "space_complexity"]
        );
    }

    #[test]
    fn test_fully_parsed_is_ok() {
        let d = ParseDiagnostics {
            code: CodeSource::Fenced,
            insights: InsightsSource::Lines,
            time_defaulted: false,
            space_defaulted: false,
        };
        assert!(d.ok());
    }
}

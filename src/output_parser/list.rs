//! Splitting a free-text section into list entries.

use regex::Regex;
use std::sync::OnceLock;

static BULLET_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn bullet_regex() -> Option<&'static Regex> {
    BULLET_REGEX
        .get_or_init(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.*)$").ok())
        .as_ref()
}

/// How the entries of a section were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    /// Lines starting with `-`, `*`, `•` or `N.`.
    Bulleted,
    /// No bullet syntax; each non-blank line is one entry.
    Lines,
}

/// Entries of a bulleted list, in order. Non-bullet lines are skipped.
///
/// # Examples
///
/// ```
/// use screen_solve::output_parser::list::bullet_items;
///
/// let items = bullet_items("- first\n• second\n1. third\nnot a bullet");
/// assert_eq!(items, vec!["first", "second", "third"]);
/// ```
pub fn bullet_items(section: &str) -> Vec<String> {
    let Some(re) = bullet_regex() else {
        return Vec::new();
    };
    section
        .lines()
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1).and_then(|m| clean_entry(m.as_str())))
        .collect()
}

/// Every non-blank line of a section, trimmed.
pub fn non_blank_lines(section: &str) -> Vec<String> {
    section.lines().filter_map(clean_entry).collect()
}

/// Bullets if the section has any, otherwise its non-blank lines.
pub fn section_entries(section: &str) -> (Vec<String>, ListStyle) {
    let bullets = bullet_items(section);
    if bullets.is_empty() {
        (non_blank_lines(section), ListStyle::Lines)
    } else {
        (bullets, ListStyle::Bulleted)
    }
}

/// Trim an entry. Lines holding only emphasis markers (`**`) are dropped.
fn clean_entry(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.trim_matches('*').trim().is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_markers_preserve_order() {
        let section = "\n• Use a hash map\n- Store complements\n1. Return on first hit\n";
        assert_eq!(
            bullet_items(section),
            vec!["Use a hash map", "Store complements", "Return on first hit"]
        );
    }

    #[test]
    fn star_bullets_and_paren_numbers() {
        let section = "* alpha\n  2) beta";
        assert_eq!(bullet_items(section), vec!["alpha", "beta"]);
    }

    #[test]
    fn empty_bullets_are_dropped() {
        assert_eq!(bullet_items("- \n- kept\n3. "), vec!["kept"]);
    }

    #[test]
    fn emphasis_line_is_not_a_bullet() {
        let section = "**\n- real entry";
        assert_eq!(bullet_items(section), vec!["real entry"]);
    }

    #[test]
    fn falls_back_to_lines() {
        let (entries, style) = section_entries("\nSort the input first.\n\n  Then sweep once.  \n");
        assert_eq!(style, ListStyle::Lines);
        assert_eq!(entries, vec!["Sort the input first.", "Then sweep once."]);
    }

    #[test]
    fn bullets_win_over_lines() {
        let (entries, style) = section_entries("Intro line\n- point");
        assert_eq!(style, ListStyle::Bulleted);
        assert_eq!(entries, vec!["point"]);
    }

    #[test]
    fn blank_section_has_no_entries() {
        let (entries, _) = section_entries("  \n\n");
        assert!(entries.is_empty());
    }
}

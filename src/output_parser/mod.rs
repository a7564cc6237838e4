//! # Response parsers
//!
//! Pure functions that turn provider text into typed values. None of them
//! make a network call, so each can be tested on canned text.
//!
//! ## Parsers Available
//!
//! | Parser | Use Case |
//! |--------|----------|
//! | [`parse_problem_info`] | Extraction response to [`ProblemInfo`](crate::types::ProblemInfo), strict |
//! | [`parse_json`] | Same strict fence-stripping parse for any `DeserializeOwned` |
//! | [`parse_solution`] | Solution response to [`SolutionResult`](crate::types::SolutionResult), never fails |
//! | [`parse_solution_with_diagnostics`] | As above, plus which fields fell back |
//!
//! ## Shared Utilities
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`strip_think_tags`] | Remove `<think>` blocks from text |
//! | [`strip_leading_think_tags`] | Remove only the reasoning blocks before the body |
//! | [`strip_json_fences`] | Remove ```` ```json ```` / ```` ``` ```` markers |
//! | [`extract::extract_code_block`] | First fenced code block |
//! | [`list::section_entries`] | Bullets or non-blank lines of a section |

pub mod error;
pub mod extract;
pub mod json;
pub mod list;
pub mod solution;

pub use error::ParseError;
pub use extract::{preprocess, strip_json_fences, strip_leading_think_tags, strip_think_tags};
pub use json::{parse_json, parse_problem_info};
pub use solution::{
    normalize_complexity, parse_solution, parse_solution_with_diagnostics, DEFAULT_INSIGHT,
    DEFAULT_SPACE_COMPLEXITY, DEFAULT_TIME_COMPLEXITY,
};

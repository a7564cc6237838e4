//! The two pipeline stages.
//!
//! A stage is one provider call: it builds the request, sends it through a
//! [`ProviderClient`](crate::client::ProviderClient), and parses the reply.
//!
//! | Stage | Input | Output | Parse failure |
//! |-------|-------|--------|---------------|
//! | [`ExtractionStage`] | screenshots | [`ProblemInfo`](crate::types::ProblemInfo) | hard error |
//! | [`SolutionStage`] | `ProblemInfo` | [`SolutionResult`](crate::types::SolutionResult) | defaults |

pub mod extraction;
pub mod solution;

pub use extraction::ExtractionStage;
pub use solution::SolutionStage;

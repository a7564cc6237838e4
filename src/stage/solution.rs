use crate::backend::{LlmConfig, LlmRequest};
use crate::client::ProviderClient;
use crate::config::ProviderConfig;
use crate::error::Result;
use crate::output_parser::parse_solution_with_diagnostics;
use crate::prompt::{solution_prompt, SOLUTION_SYSTEM_PROMPT};
use crate::types::{ProblemInfo, SolutionResult};
use std::sync::atomic::AtomicBool;

/// Turns a [`ProblemInfo`] into code, insights and complexity analysis.
///
/// Only the call itself can fail. A reply with no recognisable structure
/// still produces a [`SolutionResult`], filled from defaults.
#[derive(Debug, Clone)]
pub struct SolutionStage {
    pub model: String,
    pub language: String,
    pub config: LlmConfig,
}

impl SolutionStage {
    pub fn new(model: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            language: language.into(),
            config: LlmConfig::default(),
        }
    }

    pub fn from_config(config: &ProviderConfig, language: &str) -> Self {
        Self::new(config.solution_model(), language)
    }

    pub fn request(&self, problem: &ProblemInfo) -> LlmRequest {
        LlmRequest::new(&self.model, solution_prompt(problem, &self.language))
            .with_system(SOLUTION_SYSTEM_PROMPT)
            .with_config(self.config.clone())
    }

    pub async fn run(
        &self,
        client: &ProviderClient,
        problem: &ProblemInfo,
        cancel: Option<&AtomicBool>,
    ) -> Result<SolutionResult> {
        log::info!("[SOLVE] Generating {} solution with {}", self.language, self.model);
        let text = client.complete(&self.request(problem), cancel).await?;

        let (solution, diagnostics) = parse_solution_with_diagnostics(&text);
        if !diagnostics.ok() {
            log::debug!(
                "[SOLVE] Defaults used for: {}",
                diagnostics.fallbacks().join(", ")
            );
        }
        Ok(solution)
    }
}

use crate::backend::{ImagePart, LlmConfig, LlmRequest};
use crate::client::ProviderClient;
use crate::config::ProviderConfig;
use crate::error::{PipelineError, Result};
use crate::output_parser::parse_problem_info;
use crate::prompt::{extraction_prompt, EXTRACTION_SYSTEM_PROMPT};
use crate::screenshot::ScreenshotInput;
use crate::types::ProblemInfo;
use std::sync::atomic::AtomicBool;

/// Reads a coding problem out of one or more screenshots.
#[derive(Debug, Clone)]
pub struct ExtractionStage {
    /// Model id for the call.
    pub model: String,
    /// Language the solution will be written in; mentioned in the prompt.
    pub language: String,
    /// Sampling parameters. JSON mode is always on.
    pub config: LlmConfig,
}

impl ExtractionStage {
    pub fn new(model: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            language: language.into(),
            config: LlmConfig::default().with_json_mode(true),
        }
    }

    /// Stage settings from a config snapshot and the resolved language.
    pub fn from_config(config: &ProviderConfig, language: &str) -> Self {
        Self::new(config.extraction_model(), language)
    }

    /// Build the request. At least one image is required.
    pub fn request(&self, images: &[ScreenshotInput]) -> Result<LlmRequest> {
        if images.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "extraction needs at least one screenshot".into(),
            ));
        }
        Ok(LlmRequest::new(&self.model, extraction_prompt(&self.language))
            .with_system(EXTRACTION_SYSTEM_PROMPT)
            .with_images(images.iter().map(ImagePart::from).collect())
            .with_config(self.config.clone()))
    }

    /// Run the call and parse the reply strictly.
    pub async fn run(
        &self,
        client: &ProviderClient,
        images: &[ScreenshotInput],
        cancel: Option<&AtomicBool>,
    ) -> Result<ProblemInfo> {
        let request = self.request(images)?;
        log::info!(
            "[EXTRACT] Extracting problem from {} screenshot(s) with {}",
            images.len(),
            self.model
        );

        let text = client.complete(&request, cancel).await?;
        match parse_problem_info(&text) {
            Ok(problem) => {
                log::debug!(
                    "[EXTRACT] Parsed problem statement ({} chars)",
                    problem.problem_statement.len()
                );
                Ok(problem)
            }
            Err(e) => {
                log::error!("[EXTRACT] Could not parse extraction response: {}", e);
                Err(e.into())
            }
        }
    }
}

//! # Screen Solve
//!
//! Turns screenshots of a coding problem into a solution with two LLM calls:
//! one that reads the problem out of the images, and one that solves it.
//!
//! The host application owns capture, storage and the UI. This crate owns
//! everything between "the user pressed solve" and "here is the answer":
//! provider selection, request building, response parsing, single-flight
//! cancellation, and the lifecycle events the UI listens for.
//!
//! ## Core Concepts
//!
//! - **[`ProcessingManager`]**: the orchestrator. One per application,
//!   shared as `Arc`. Starting a run cancels the previous one.
//! - **[`ProviderClient`]**: an initialized OpenAI or Gemini backend plus its
//!   HTTP client. Rebuilt whenever the provider or key changes.
//! - **[`ExtractionStage`] / [`SolutionStage`]**: one provider call each.
//!   Extraction parses strictly; solution parsing never fails.
//! - **[`Event`]**: what the UI sees, with fixed wire names such as
//!   `initial-start` and `solution-success`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use screen_solve::config::{MemoryConfigSource, ProviderConfig};
//! use screen_solve::events::{Event, FnEventSink};
//! use screen_solve::screenshot::QueueScreenshotSource;
//! use screen_solve::ProcessingManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(MemoryConfigSource::new(ProviderConfig::from_dotenv()?));
//!     let queue = Arc::new(QueueScreenshotSource::new());
//!     queue.push("problem.png");
//!
//!     let sink = Arc::new(FnEventSink(|event: Event| {
//!         println!("{} {}", event.name(), event.payload());
//!     }));
//!
//!     let manager = ProcessingManager::builder(config, queue, sink).build()?;
//!     manager.process().await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod output_parser;
pub mod pipeline;
pub mod prompt;
pub mod run;
pub mod screenshot;
pub mod stage;
pub mod types;

pub use backend::{BackoffConfig, GeminiBackend, LlmConfig, MockBackend, OpenAiBackend};
pub use client::ProviderClient;
pub use config::{ConfigSource, MemoryConfigSource, ProviderConfig, ProviderKind};
pub use diagnostics::ParseDiagnostics;
pub use error::{FailureKind, PipelineError, Result};
pub use events::{Event, EventSink};
pub use pipeline::{ProcessingManager, ProcessingManagerBuilder};
pub use run::{RunHandle, RunOutcome, RunState};
pub use screenshot::{QueueScreenshotSource, ScreenshotInput, ScreenshotSource};
pub use stage::{ExtractionStage, SolutionStage};
pub use types::{ProblemInfo, SolutionResult, View};

//! Solve a coding problem from screenshots given on the command line.
//!
//! ```text
//! SOLVER_PROVIDER=gemini GEMINI_API_KEY=... \
//!     cargo run --example solve_queue -- shot-1.png shot-2.png
//! ```
//!
//! Set `RUST_LOG=debug` to see provider and parser logs.

use std::sync::Arc;

use anyhow::{bail, Context};
use screen_solve::config::{MemoryConfigSource, ProviderConfig};
use screen_solve::events::{Event, FnEventSink};
use screen_solve::screenshot::QueueScreenshotSource;
use screen_solve::{ProcessingManager, RunOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: solve_queue <screenshot>...");
    }

    let config = ProviderConfig::from_dotenv().context("reading provider config")?;
    println!("Provider: {} ({})", config.provider, config.solution_model());

    let queue = Arc::new(QueueScreenshotSource::new());
    for path in &paths {
        queue.push(path);
    }

    let sink = Arc::new(FnEventSink(|event: Event| match event {
        Event::ProblemExtracted(ref problem) => {
            println!("\n=== Problem ===\n{}", problem.problem_statement);
        }
        Event::InitialSolutionError(ref message) => eprintln!("error: {}", message),
        Event::ApiKeyInvalid => eprintln!("error: API key missing or rejected"),
        other => println!("[{}]", other.name()),
    }));

    let manager =
        ProcessingManager::builder(Arc::new(MemoryConfigSource::new(config)), queue, sink)
            .build()?;

    match manager.process().await {
        RunOutcome::Succeeded(solution) => {
            println!("\n=== Code ===\n{}", solution.code);
            println!("\n=== Key insights ===");
            for thought in &solution.thoughts {
                println!("- {}", thought);
            }
            println!("\nTime:  {}", solution.time_complexity);
            println!("Space: {}", solution.space_complexity);
            Ok(())
        }
        other => bail!("run did not produce a solution: {:?}", other),
    }
}

//! Lifecycle events sent to the UI.
//!
//! The orchestrator reports every transition through an [`EventSink`]. Each
//! [`Event`] has a fixed wire name (see [`Event::name`]) and a JSON payload,
//! so a host that only speaks `send(name, payload)` can plug in through
//! [`WindowSink`].

use crate::types::{ProblemInfo, SolutionResult};
use serde_json::Value;

/// Wire name of [`Event::InitialStart`].
pub const INITIAL_START: &str = "initial-start";
/// Wire name of [`Event::NoScreenshots`].
pub const NO_SCREENSHOTS: &str = "no-screenshots";
/// Wire name of [`Event::InitialSolutionError`].
pub const INITIAL_SOLUTION_ERROR: &str = "initial-solution-error";
/// Wire name of [`Event::SolutionSuccess`].
pub const SOLUTION_SUCCESS: &str = "solution-success";
/// Wire name of [`Event::ProblemExtracted`].
pub const PROBLEM_EXTRACTED: &str = "problem-extracted";
/// Wire name of [`Event::ApiKeyInvalid`].
pub const API_KEY_INVALID: &str = "api-key-invalid";

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A run passed its preconditions and is about to call the provider.
    InitialStart,
    /// The screenshot queue was empty, or every queued file had vanished.
    NoScreenshots,
    /// Extraction finished.
    ProblemExtracted(ProblemInfo),
    /// The run finished with a solution.
    SolutionSuccess(SolutionResult),
    /// The run failed. Carries a message for the user.
    InitialSolutionError(String),
    /// The provider key is missing, malformed, or was rejected.
    ApiKeyInvalid,
}

impl Event {
    /// Fixed wire name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::InitialStart => INITIAL_START,
            Event::NoScreenshots => NO_SCREENSHOTS,
            Event::ProblemExtracted(_) => PROBLEM_EXTRACTED,
            Event::SolutionSuccess(_) => SOLUTION_SUCCESS,
            Event::InitialSolutionError(_) => INITIAL_SOLUTION_ERROR,
            Event::ApiKeyInvalid => API_KEY_INVALID,
        }
    }

    /// JSON payload; `null` for events that carry none.
    pub fn payload(&self) -> Value {
        match self {
            Event::ProblemExtracted(problem) => serde_json::to_value(problem).unwrap_or(Value::Null),
            Event::SolutionSuccess(solution) => {
                serde_json::to_value(solution).unwrap_or(Value::Null)
            }
            Event::InitialSolutionError(message) => Value::String(message.clone()),
            Event::InitialStart | Event::NoScreenshots | Event::ApiKeyInvalid => Value::Null,
        }
    }

    /// Whether this event ends a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::NoScreenshots
                | Event::SolutionSuccess(_)
                | Event::InitialSolutionError(_)
                | Event::ApiKeyInvalid
        )
    }
}

/// Receiver for run lifecycle events.
///
/// # Example
///
/// ```
/// use screen_solve::events::{Event, EventSink};
///
/// struct PrintSink;
///
/// impl EventSink for PrintSink {
///     fn on_event(&self, event: Event) {
///         println!("{} {}", event.name(), event.payload());
///     }
/// }
/// ```
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: Event);
}

/// An [`EventSink`] backed by a closure.
///
/// ```
/// use screen_solve::events::{Event, FnEventSink};
/// use std::sync::Arc;
///
/// let sink = Arc::new(FnEventSink(|event: Event| println!("{}", event.name())));
/// ```
pub struct FnEventSink<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventSink for FnEventSink<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}

/// The host window's message channel.
pub trait WindowHandle: Send + Sync {
    fn send(&self, event_name: &str, payload: Value);
}

/// Adapts a [`WindowHandle`] into an [`EventSink`].
pub struct WindowSink<W: WindowHandle>(pub W);

impl<W: WindowHandle> EventSink for WindowSink<W> {
    fn on_event(&self, event: Event) {
        self.0.send(event.name(), event.payload());
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&self, _event: Event) {}
}

/// Log and deliver one event.
pub(crate) fn emit(sink: &dyn EventSink, event: Event) {
    log::debug!("[PIPELINE] emit {}", event.name());
    sink.on_event(event);
}

//! The processing manager: sequences extraction and solution for one batch
//! of screenshots at a time.
//!
//! ## Run lifecycle
//!
//! ```text
//! run_pipeline()/process()
//!   │  cancel previous run, register new RunHandle
//!   ├─ provider client (lazy init)      ── fail ──► api-key-invalid
//!   ├─ screenshot batch                 ── empty ─► no-screenshots
//!   ├─ initial-start, view = solutions
//!   ├─ ExtractionStage                  ── fail ──► initial-solution-error / api-key-invalid
//!   ├─ problem-extracted
//!   ├─ SolutionStage                    ── fail ──► initial-solution-error / api-key-invalid
//!   └─ solution-success, secondary queue cleared
//! ```
//!
//! Cancellation is checked at stage boundaries only. A cancelled run emits
//! nothing further; the run that superseded it reports for itself.

use crate::backend::{Backend, BackoffConfig};
use crate::client::{validate_credentials, ProviderClient, DEFAULT_TIMEOUT};
use crate::config::{ConfigSource, ProviderConfig, ProviderKind, Subscription};
use crate::error::{FailureKind, PipelineError, Result};
use crate::events::{emit, Event, EventSink};
use crate::run::{RunHandle, RunOutcome, RunState};
use crate::screenshot::{load_batch, ScreenshotSource};
use crate::stage::{ExtractionStage, SolutionStage};
use crate::types::{ProblemInfo, SolutionResult, View};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

struct ClientSlot {
    /// The config the client was built from.
    config: ProviderConfig,
    client: Arc<ProviderClient>,
}

#[derive(Debug, Default)]
struct Session {
    view: View,
    problem_info: Option<ProblemInfo>,
    last_state: RunState,
    language_override: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Orchestrates runs over the screenshot queue.
///
/// Built once per application and shared as `Arc<ProcessingManager>`.
/// At most one run is live: starting a run cancels the previous one first.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use screen_solve::config::{MemoryConfigSource, ProviderConfig};
/// use screen_solve::events::{Event, FnEventSink};
/// use screen_solve::pipeline::ProcessingManager;
/// use screen_solve::screenshot::QueueScreenshotSource;
///
/// # async fn demo() -> screen_solve::Result<()> {
/// let config = Arc::new(MemoryConfigSource::new(ProviderConfig::from_env()?));
/// let queue = Arc::new(QueueScreenshotSource::new());
/// queue.push("/tmp/problem.png");
///
/// let sink = Arc::new(FnEventSink(|event: Event| println!("{}", event.name())));
/// let manager = ProcessingManager::builder(config, queue, sink).build()?;
/// let outcome = manager.process().await;
/// println!("{:?}", outcome);
/// # Ok(())
/// # }
/// ```
pub struct ProcessingManager {
    config: Arc<dyn ConfigSource>,
    screenshots: Arc<dyn ScreenshotSource>,
    sink: Arc<dyn EventSink>,
    backend_override: Option<Arc<dyn Backend>>,
    backoff: BackoffConfig,
    timeout: Duration,
    client: Mutex<Option<ClientSlot>>,
    current_run: Mutex<Option<RunHandle>>,
    next_run_id: AtomicU64,
    session: Mutex<Session>,
    _subscription: Subscription,
}

impl std::fmt::Debug for ProcessingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = lock(&self.session);
        f.debug_struct("ProcessingManager")
            .field("provider", &self.active_provider())
            .field("view", &session.view)
            .field("last_state", &session.last_state)
            .field("has_backend_override", &self.backend_override.is_some())
            .finish()
    }
}

impl ProcessingManager {
    /// Start building a manager around its three collaborators.
    pub fn builder(
        config: Arc<dyn ConfigSource>,
        screenshots: Arc<dyn ScreenshotSource>,
        sink: Arc<dyn EventSink>,
    ) -> ProcessingManagerBuilder {
        ProcessingManagerBuilder {
            config,
            screenshots,
            sink,
            backend: None,
            backoff: None,
            timeout: None,
        }
    }

    /// Start a run in the background. The result arrives as events.
    ///
    /// The previous run is cancelled before this returns, so no call of the
    /// new run can be dispatched while the old one may still start a stage.
    pub fn run_pipeline(self: &Arc<Self>) -> tokio::task::JoinHandle<RunOutcome> {
        let handle = self.begin_run();
        let this = Arc::clone(self);
        tokio::spawn(async move { this.execute(handle).await })
    }

    /// Start a run and wait for it.
    pub async fn process(&self) -> RunOutcome {
        let handle = self.begin_run();
        self.execute(handle).await
    }

    /// Cancel whichever run is live. No-op when idle.
    pub fn cancel_current_run(&self) {
        if let Some(handle) = lock(&self.current_run).as_ref() {
            log::info!("[PIPELINE] Cancelling run {}", handle.id());
            handle.cancel();
        }
    }

    /// Override the output language for future runs. Blank clears the override.
    pub fn set_language(&self, language: impl Into<String>) {
        let language = language.into();
        let trimmed = language.trim();
        lock(&self.session).language_override = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    pub fn view(&self) -> View {
        lock(&self.session).view
    }

    pub fn set_view(&self, view: View) {
        lock(&self.session).view = view;
    }

    /// The problem extracted by the latest run, if it got that far.
    pub fn problem_info(&self) -> Option<ProblemInfo> {
        lock(&self.session).problem_info.clone()
    }

    /// State of the latest run.
    pub fn run_state(&self) -> RunState {
        lock(&self.session).last_state
    }

    /// Provider of the current client, if one is initialized.
    pub fn active_provider(&self) -> Option<ProviderKind> {
        lock(&self.client).as_ref().map(|slot| slot.client.kind())
    }

    /// Cancel any live run and return to an empty queue view.
    pub fn reset(&self) {
        self.cancel_current_run();
        let mut session = lock(&self.session);
        session.problem_info = None;
        session.view = View::Queue;
        session.last_state = RunState::Idle;
    }

    /// Drop the current client and build a new one from the current config.
    pub fn reinitialize_client(&self) -> Result<()> {
        self.discard_client();
        self.ensure_client().map(|_| ())
    }

    fn begin_run(&self) -> RunHandle {
        let id = self.next_run_id.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = RunHandle::new(id);
        let previous = lock(&self.current_run).replace(handle.clone());
        if let Some(previous) = previous {
            if !previous.is_cancelled() {
                log::info!(
                    "[PIPELINE] Run {} superseded by run {}",
                    previous.id(),
                    id
                );
            }
            previous.cancel();
        }
        lock(&self.session).last_state = RunState::Idle;
        log::info!("[PIPELINE] Run {} started", id);
        handle
    }

    async fn execute(&self, handle: RunHandle) -> RunOutcome {
        let outcome = match self.run_stages(&handle).await {
            Ok(solution) => self.succeed(&handle, solution),
            Err(e) => self.fail(&handle, e),
        };
        if self.is_current(&handle) {
            lock(&self.session).last_state = outcome.state();
        }
        outcome
    }

    async fn run_stages(&self, handle: &RunHandle) -> Result<SolutionResult> {
        handle.check_cancelled()?;
        let client = self.ensure_client()?;
        let batch = load_batch(self.screenshots.as_ref())?;
        handle.check_cancelled()?;

        {
            let mut session = lock(&self.session);
            session.problem_info = None;
            session.view = View::Solutions;
            session.last_state = RunState::Extracting;
        }
        self.emit_for(handle, Event::InitialStart);

        let config = self.config.load();
        let extraction = ExtractionStage::from_config(&config, &self.resolve_language(&config));
        let problem = extraction
            .run(&client, &batch, Some(handle.cancel_flag()))
            .await?;

        handle.check_cancelled()?;
        if self.is_current(handle) {
            let mut session = lock(&self.session);
            session.problem_info = Some(problem.clone());
            session.last_state = RunState::Solving;
        }
        self.emit_for(handle, Event::ProblemExtracted(problem.clone()));

        let config = self.config.load();
        let solution = SolutionStage::from_config(&config, &self.resolve_language(&config))
            .run(&client, &problem, Some(handle.cancel_flag()))
            .await?;

        handle.check_cancelled()?;
        Ok(solution)
    }

    fn succeed(&self, handle: &RunHandle, solution: SolutionResult) -> RunOutcome {
        log::info!("[PIPELINE] Run {} succeeded", handle.id());
        self.screenshots.clear_secondary_queue();
        self.emit_for(handle, Event::SolutionSuccess(solution.clone()));
        RunOutcome::Succeeded(solution)
    }

    fn fail(&self, handle: &RunHandle, err: PipelineError) -> RunOutcome {
        if handle.is_cancelled() || matches!(err, PipelineError::Cancelled) {
            log::info!("[PIPELINE] Run {} cancelled", handle.id());
            return RunOutcome::Cancelled;
        }

        let outcome = RunOutcome::from_error(&err);
        match err.kind() {
            FailureKind::NoScreenshots => {
                log::info!("[PIPELINE] Run {}: no screenshots to process", handle.id());
                self.emit_for(handle, Event::NoScreenshots);
            }
            FailureKind::ProviderUnavailable => {
                log::error!("[PIPELINE] Run {} failed: {}", handle.id(), err);
                self.discard_client();
                self.return_to_queue(handle);
                self.emit_for(handle, Event::ApiKeyInvalid);
            }
            _ => {
                log::error!("[PIPELINE] Run {} failed: {}", handle.id(), err);
                self.return_to_queue(handle);
                self.emit_for(handle, Event::InitialSolutionError(err.user_message()));
            }
        }
        outcome
    }

    /// Back to the queue view. A failed run keeps no extracted problem.
    fn return_to_queue(&self, handle: &RunHandle) {
        if self.is_current(handle) {
            let mut session = lock(&self.session);
            session.view = View::Queue;
            session.problem_info = None;
        }
    }

    fn emit_for(&self, handle: &RunHandle, event: Event) {
        if handle.is_cancelled() || !self.is_current(handle) {
            log::debug!(
                "[PIPELINE] Dropping {} from stale run {}",
                event.name(),
                handle.id()
            );
            return;
        }
        emit(self.sink.as_ref(), event);
    }

    fn is_current(&self, handle: &RunHandle) -> bool {
        lock(&self.current_run)
            .as_ref()
            .is_some_and(|current| current.id() == handle.id())
    }

    fn resolve_language(&self, config: &ProviderConfig) -> String {
        lock(&self.session)
            .language_override
            .clone()
            .unwrap_or_else(|| config.language().to_string())
    }

    /// The current client, initializing it from the current config if there
    /// is none or the provider/key changed since it was built.
    fn ensure_client(&self) -> Result<Arc<ProviderClient>> {
        let config = self.config.load();
        let mut slot = lock(&self.client);
        if let Some(existing) = slot.as_ref() {
            if !existing.config.client_changed(&config) {
                return Ok(Arc::clone(&existing.client));
            }
        }

        match self.build_client(&config) {
            Ok(client) => {
                let client = Arc::new(client);
                *slot = Some(ClientSlot {
                    config,
                    client: Arc::clone(&client),
                });
                Ok(client)
            }
            Err(e) => {
                *slot = None;
                Err(e)
            }
        }
    }

    fn build_client(&self, config: &ProviderConfig) -> Result<ProviderClient> {
        let client = match self.backend_override {
            Some(ref backend) => {
                validate_credentials(config)?;
                ProviderClient::with_backend_and_timeout(
                    config.provider,
                    Arc::clone(backend),
                    self.timeout,
                )?
            }
            None => ProviderClient::initialize_with_timeout(config, self.timeout)?,
        };
        Ok(client.with_backoff(self.backoff.clone()))
    }

    fn discard_client(&self) {
        if lock(&self.client).take().is_some() {
            log::info!("[PROVIDER] Discarded provider client");
        }
    }

    /// Replace a live client when the provider or key changes.
    ///
    /// A manager with no client stays lazy; the next run initializes it.
    fn on_config_change(&self, config: &ProviderConfig) {
        let mut slot = lock(&self.client);
        let Some(existing) = slot.as_ref() else {
            return;
        };
        if !existing.config.client_changed(config) {
            return;
        }

        log::info!("[CONFIG] Provider or API key changed, reinitializing client");
        *slot = match self.build_client(config) {
            Ok(client) => Some(ClientSlot {
                config: config.clone(),
                client: Arc::new(client),
            }),
            Err(e) => {
                log::warn!("[CONFIG] Client not reinitialized: {}", e);
                None
            }
        };
    }
}

/// Builder for [`ProcessingManager`].
pub struct ProcessingManagerBuilder {
    config: Arc<dyn ConfigSource>,
    screenshots: Arc<dyn ScreenshotSource>,
    sink: Arc<dyn EventSink>,
    backend: Option<Arc<dyn Backend>>,
    backoff: Option<BackoffConfig>,
    timeout: Option<Duration>,
}

impl ProcessingManagerBuilder {
    /// Use this backend for every client instead of the configured provider's.
    /// Keys are still validated against the configured provider.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the transport retry configuration. Default: [`BackoffConfig::interactive()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    /// Set the request timeout. Default: 60 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the manager and subscribe it to config changes.
    ///
    /// The subscription holds only a weak reference, so dropping the last
    /// `Arc` unsubscribes.
    pub fn build(self) -> Result<Arc<ProcessingManager>> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(PipelineError::InvalidConfig(
                "request timeout must be non-zero".into(),
            ));
        }

        Ok(Arc::new_cyclic(|weak: &Weak<ProcessingManager>| {
            let observer = weak.clone();
            let subscription = self.config.subscribe(Box::new(move |config| {
                if let Some(manager) = observer.upgrade() {
                    manager.on_config_change(config);
                }
            }));

            ProcessingManager {
                config: self.config,
                screenshots: self.screenshots,
                sink: self.sink,
                backend_override: self.backend,
                backoff: self.backoff.unwrap_or_default(),
                timeout,
                client: Mutex::new(None),
                current_run: Mutex::new(None),
                next_run_id: AtomicU64::new(0),
                session: Mutex::new(Session::default()),
                _subscription: subscription,
            }
        }))
    }
}

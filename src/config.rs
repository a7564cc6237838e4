//! Provider configuration and change notification.
//!
//! [`ProviderConfig`] is the snapshot a run reads at the start of each stage.
//! [`ConfigSource`] is where snapshots come from; [`MemoryConfigSource`] is the
//! bundled in-memory implementation with observer support.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Output language used when neither an override nor the config names one.
pub const DEFAULT_LANGUAGE: &str = "python";

/// Default model for both stages when the provider is OpenAI.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Default model for both stages when the provider is Gemini.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// The closed set of supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-style chat completions.
    #[default]
    OpenAi,
    /// Gemini-style generate-content.
    Gemini,
}

impl ProviderKind {
    /// Stable lowercase identifier (`"openai"` / `"gemini"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Parse an identifier, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAi),
            "gemini" => Some(ProviderKind::Gemini),
            _ => None,
        }
    }

    /// Model used for both stages when the config leaves them blank.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => DEFAULT_OPENAI_MODEL,
            ProviderKind::Gemini => DEFAULT_GEMINI_MODEL,
        }
    }

    /// Environment variable holding this provider's own key.
    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Cheap local check that a key looks like one this provider issues.
    ///
    /// OpenAI keys start with `sk-` and are at least 20 characters. Gemini
    /// keys are at least 30 characters of `[A-Za-z0-9_-]`.
    pub fn is_valid_key_format(&self, key: &str) -> bool {
        let key = key.trim();
        match self {
            ProviderKind::OpenAi => key.starts_with("sk-") && key.len() >= 20,
            ProviderKind::Gemini => {
                key.len() >= 30
                    && key
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider settings for one run.
///
/// Blank model names and a blank language fall back to the defaults via
/// [`extraction_model`](Self::extraction_model),
/// [`solution_model`](Self::solution_model) and [`language`](Self::language).
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub extraction_model: String,
    pub solution_model: String,
    pub language: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("extraction_model", &self.extraction_model)
            .field("solution_model", &self.solution_model)
            .field("language", &self.language)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(provider: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_extraction_model(mut self, model: impl Into<String>) -> Self {
        self.extraction_model = model.into();
        self
    }

    pub fn with_solution_model(mut self, model: impl Into<String>) -> Self {
        self.solution_model = model.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Whether any API key is set.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn extraction_model(&self) -> &str {
        non_blank(&self.extraction_model).unwrap_or(self.provider.default_model())
    }

    pub fn solution_model(&self) -> &str {
        non_blank(&self.solution_model).unwrap_or(self.provider.default_model())
    }

    /// The configured language, or [`DEFAULT_LANGUAGE`].
    pub fn language(&self) -> &str {
        non_blank(&self.language).unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Whether switching from `self` to `other` requires a new client.
    pub fn client_changed(&self, other: &ProviderConfig) -> bool {
        self.provider != other.provider || self.api_key.trim() != other.api_key.trim()
    }

    /// Read the configuration from environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `SOLVER_PROVIDER` | provider (`openai` / `gemini`) |
    /// | `SOLVER_API_KEY` | api key; falls back to `OPENAI_API_KEY` / `GEMINI_API_KEY` |
    /// | `SOLVER_EXTRACTION_MODEL` | extraction model |
    /// | `SOLVER_SOLUTION_MODEL` | solution model |
    /// | `SOLVER_LANGUAGE` | output language |
    pub fn from_env() -> crate::Result<Self> {
        let provider = match std::env::var("SOLVER_PROVIDER") {
            Ok(raw) if !raw.trim().is_empty() => ProviderKind::parse(&raw).ok_or_else(|| {
                crate::PipelineError::InvalidConfig(format!("unknown provider '{}'", raw))
            })?,
            _ => ProviderKind::default(),
        };
        let api_key = std::env::var("SOLVER_API_KEY")
            .or_else(|_| std::env::var(provider.env_key()))
            .unwrap_or_default();

        Ok(Self {
            provider,
            api_key,
            extraction_model: std::env::var("SOLVER_EXTRACTION_MODEL").unwrap_or_default(),
            solution_model: std::env::var("SOLVER_SOLUTION_MODEL").unwrap_or_default(),
            language: std::env::var("SOLVER_LANGUAGE").unwrap_or_default(),
        })
    }

    /// Load a `.env` file from the working directory (if any), then
    /// [`from_env`](Self::from_env).
    pub fn from_dotenv() -> crate::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("[CONFIG] Ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_env()
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Redact a secret down to a short identifying prefix.
pub(crate) fn redact(secret: &str) -> String {
    if secret.is_empty() {
        "<none>".to_string()
    } else if secret.len() > 6 && secret.is_char_boundary(6) {
        format!("{}***", &secret[..6])
    } else {
        "***".to_string()
    }
}

/// Callback invoked with the new configuration after every change.
pub type ConfigCallback = Box<dyn Fn(&ProviderConfig) + Send + Sync>;

/// Handle for a registered config observer.
///
/// The observer is removed when the handle is dropped or
/// [`unsubscribe`](Self::unsubscribe) is called.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription that never fires and has nothing to remove.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Where provider configuration comes from.
pub trait ConfigSource: Send + Sync {
    /// Current configuration snapshot.
    fn load(&self) -> ProviderConfig;

    /// Register `callback` to run after every configuration change.
    fn subscribe(&self, callback: ConfigCallback) -> Subscription;
}

type ObserverList = Vec<(u64, Arc<dyn Fn(&ProviderConfig) + Send + Sync>)>;

#[derive(Default)]
struct MemoryInner {
    config: ProviderConfig,
    observers: ObserverList,
    next_id: u64,
}

/// An in-memory [`ConfigSource`].
///
/// # Example
///
/// ```
/// use screen_solve::config::{ConfigSource, MemoryConfigSource, ProviderConfig, ProviderKind};
///
/// let source = MemoryConfigSource::new(ProviderConfig::new(ProviderKind::Gemini, ""));
/// source.update(|c| c.language = "rust".into());
/// assert_eq!(source.load().language(), "rust");
/// ```
#[derive(Clone, Default)]
pub struct MemoryConfigSource {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryConfigSource {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                config,
                ..Default::default()
            })),
        }
    }

    /// Apply `f` to the stored config, then notify observers.
    pub fn update(&self, f: impl FnOnce(&mut ProviderConfig)) {
        let (snapshot, observers) = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut inner.config);
            let observers: Vec<_> = inner.observers.iter().map(|(_, cb)| cb.clone()).collect();
            (inner.config.clone(), observers)
        };
        log::info!(
            "[CONFIG] Configuration updated (provider: {}, {} observer(s))",
            snapshot.provider,
            observers.len()
        );
        for observer in observers {
            observer(&snapshot);
        }
    }

    /// Replace the stored config, then notify observers.
    pub fn set(&self, config: ProviderConfig) {
        self.update(move |c| *c = config);
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .observers
            .len()
    }
}

impl ConfigSource for MemoryConfigSource {
    fn load(&self) -> ProviderConfig {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .config
            .clone()
    }

    fn subscribe(&self, callback: ConfigCallback) -> Subscription {
        let id = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push((id, Arc::from(callback)));
            id
        };
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
                inner.observers.retain(|(oid, _)| *oid != id);
            }
        })
    }
}

impl fmt::Debug for MemoryConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryConfigSource")
            .field("config", &self.load())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_defaults_fill_blank_fields() {
        let config = ProviderConfig::new(ProviderKind::Gemini, "key");
        assert_eq!(config.extraction_model(), DEFAULT_GEMINI_MODEL);
        assert_eq!(config.solution_model(), DEFAULT_GEMINI_MODEL);
        assert_eq!(config.language(), DEFAULT_LANGUAGE);

        let config = config.with_solution_model("gemini-1.5-pro").with_language(" java ");
        assert_eq!(config.solution_model(), "gemini-1.5-pro");
        assert_eq!(config.language(), "java");
    }

    #[test]
    fn test_camel_case_round_trip() {
        let json = r#"{"provider":"gemini","apiKey":"abc","extractionModel":"m1"}"#;
        let config: ProviderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.extraction_model(), "m1");
        assert_eq!(config.solution_model(), DEFAULT_GEMINI_MODEL);

        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(out["provider"], "gemini");
        assert_eq!(out["apiKey"], "abc");
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(ProviderKind::parse("OpenAI"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse(" gemini "), Some(ProviderKind::Gemini));
        assert_eq!(ProviderKind::parse("ollama"), None);
    }

    #[test]
    fn test_key_format_validation() {
        assert!(ProviderKind::OpenAi.is_valid_key_format("sk-abcdefghijklmnopqrstu"));
        assert!(!ProviderKind::OpenAi.is_valid_key_format("sk-short"));
        assert!(!ProviderKind::OpenAi.is_valid_key_format("pk-abcdefghijklmnopqrstu"));

        assert!(ProviderKind::Gemini.is_valid_key_format("AIzaSyA1234567890abcdefghijklmnop_-"));
        assert!(!ProviderKind::Gemini.is_valid_key_format("AIza short"));
        assert!(!ProviderKind::Gemini.is_valid_key_format("AIzaSyA1234567890abcdefghijklmnop!!"));
    }

    #[test]
    fn test_client_changed() {
        let a = ProviderConfig::new(ProviderKind::OpenAi, "sk-1");
        let b = a.clone().with_language("rust").with_solution_model("gpt-4o-mini");
        assert!(!a.client_changed(&b));
        assert!(a.client_changed(&ProviderConfig::new(ProviderKind::OpenAi, "sk-2")));
        assert!(a.client_changed(&ProviderConfig::new(ProviderKind::Gemini, "sk-1")));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig::new(ProviderKind::OpenAi, "sk-1234567890abcdef");
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("1234567890abcdef"));
        assert!(debug_output.contains("sk-123***"));
    }

    #[test]
    fn test_memory_source_notifies_observers() {
        let source = MemoryConfigSource::new(ProviderConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let sub = source.subscribe(Box::new(move |config| {
            assert_eq!(config.language, "go");
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        source.update(|c| c.language = "go".into());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.observer_count(), 1);

        sub.unsubscribe();
        assert_eq!(source.observer_count(), 0);
        source.update(|c| c.language = "go".into());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let source = MemoryConfigSource::default();
        {
            let _sub = source.subscribe(Box::new(|_| {}));
            assert_eq!(source.observer_count(), 1);
        }
        assert_eq!(source.observer_count(), 0);
    }
}

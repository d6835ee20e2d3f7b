//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges from a [`CoreConfig`] (asset
//! fetching, audio output, log sink) into the narration core and exposes the
//! handful of calls the UI layer needs: open a topic, answer the quiz, stop
//! or clear narration, and observe state and events. Desktop apps enable the
//! `desktop-shims` feature so missing bridges fall back to `bridge-desktop`.

pub mod error;

pub use error::{CoreError, Result};

pub use core_narration::{
    AudioKey, Catalog, NarrationConfig, NarrationError, NarrationService, NarrationState,
    SpeakOutcome, Topic, TopicContent,
};
pub use core_runtime::config::{CoreConfig, FeatureFlags};
pub use core_runtime::events::{CoreEvent, EventBus};

use core_narration::{QuizNarration, TopicProgress};
use core_runtime::events::Receiver;
use core_runtime::logging::{init_logging, LoggingConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of opening a topic popup.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicOpened {
    pub content: TopicContent,
    pub outcome: SpeakOutcome,
}

struct Inner {
    narrator: NarrationService,
    events: EventBus,
    progress: Mutex<TopicProgress>,
    features: FeatureFlags,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<Inner>,
}

impl CoreService {
    /// Build a service over the built-in catalog with default narration
    /// settings.
    pub fn new(config: CoreConfig) -> Result<Self> {
        Self::with_catalog(config, Arc::new(Catalog::builtin()), NarrationConfig::default())
    }

    /// Build a service over a custom catalog.
    ///
    /// `features.enable_text_fallback` from `config` overrides the value in
    /// `narration`.
    pub fn with_catalog(
        config: CoreConfig,
        catalog: Arc<Catalog>,
        narration: NarrationConfig,
    ) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let narration = narration.with_text_fallback(config.features.enable_text_fallback);
        let narrator = NarrationService::builder(catalog)
            .fetcher(Arc::clone(&config.asset_fetcher))
            .output(Arc::clone(&config.audio_output))
            .config(narration)
            .event_bus(events.clone())
            .build()?;

        let progress = TopicProgress::new().with_event_bus(events.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                narrator,
                events,
                progress: Mutex::new(progress),
                features: config.features,
            }),
        })
    }

    /// Access the narration service.
    pub fn narrator(&self) -> &NarrationService {
        &self.inner.narrator
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    pub fn features(&self) -> FeatureFlags {
        self.inner.features
    }

    // ========================================================================
    // Screens
    // ========================================================================

    /// Play the welcome narration on the main screen.
    pub async fn welcome(&self) -> SpeakOutcome {
        self.inner.narrator.speak(AudioKey::MainScreenWelcome).await
    }

    /// Open a topic popup and narrate it. Locked topics return `None` and
    /// leave the current narration alone.
    pub async fn open_topic(&self, topic: Topic) -> Option<TopicOpened> {
        let content = self.inner.progress.lock().visit(topic)?;
        let outcome = self.inner.narrator.speak(content.narration).await;
        Some(TopicOpened { content, outcome })
    }

    /// Close the popup: stop narrating and remove the caption.
    pub fn close_topic(&self) {
        self.inner.narrator.cancel();
        self.inner.narrator.clear_narration();
    }

    pub fn is_unlocked(&self, topic: Topic) -> bool {
        self.inner.progress.lock().is_unlocked(topic)
    }

    /// All topics visited; the quiz can be offered.
    pub fn quiz_available(&self) -> bool {
        self.inner.progress.lock().all_visited()
    }

    pub async fn ask_quiz(&self) -> SpeakOutcome {
        self.inner.narrator.speak(QuizNarration::QUESTION).await
    }

    pub async fn answer_quiz(&self, correct: bool) -> SpeakOutcome {
        self.inner
            .narrator
            .speak(QuizNarration::for_answer(correct))
            .await
    }

    /// Start over: forget visited topics and clear narration.
    pub fn restart(&self) {
        self.close_topic();
        self.inner.progress.lock().reset();
        info!("Progress reset");
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stop narration and release the audio output. Idempotent.
    pub fn shutdown(&self) {
        self.inner.narrator.dispose();
    }
}

/// Build a [`CoreService`] and, when `enable_preload` is set, decode every
/// recorded clip before returning.
///
/// Preload failures are logged and otherwise ignored; the affected clips are
/// fetched again on first use.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// use core_service::{bootstrap, CoreConfig};
///
/// let config = CoreConfig::builder().asset_root(".").build()?;
/// let core = bootstrap(config).await?;
/// core.welcome().await;
/// # Ok(())
/// # }
/// ```
pub async fn bootstrap(config: CoreConfig) -> Result<CoreService> {
    let preload = config.features.enable_preload;
    let core = CoreService::new(config)?;

    if preload {
        let report = core.narrator().preload_all().await;
        if report.is_complete() {
            info!(loaded = report.loaded.len(), "Narration clips preloaded");
        } else {
            warn!(
                loaded = report.loaded.len(),
                failed = report.failed.len(),
                "Some narration clips could not be preloaded"
            );
        }
    }

    Ok(core)
}

/// Install the global `tracing` subscriber, forwarding to the config's
/// logger sink when one is set.
///
/// Fails if a subscriber is already installed.
pub fn init_core_logging(config: &CoreConfig, logging: LoggingConfig) -> Result<()> {
    let logging = match &config.logger_sink {
        Some(sink) => logging.with_logger_sink(Arc::clone(sink)),
        None => logging,
    };
    init_logging(logging).map_err(|e| CoreError::InitializationFailed(e.to_string()))
}

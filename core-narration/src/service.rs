//! # Narration Service
//!
//! The surface UI code talks to: `speak`, `cancel`, `clear_narration`, and a
//! `watch` channel carrying [`NarrationState`].
//!
//! ## Request lifecycle
//!
//! ```text
//! speak(key) ──> generation += 1 ──> cache.get(key) ──> resume output
//!                                                            │
//!                  ┌─────────────────────────────────────────┘
//!                  ▼
//!        [transition lock] generation unchanged? ──no──> Superseded
//!                  │ yes
//!                  ▼
//!        controller.start ──> publish state ──> spawn frame tracker
//! ```
//!
//! The previous clip keeps playing while the new one loads. If the new request
//! fails and is still the latest, the previous clip is stopped as if
//! cancelled; its caption stays in place.
//!
//! `cancel` bumps the generation under the same lock, so a fetch that resolves
//! after a cancel can never start playing. Every failure is logged, reported
//! on the event bus and returned as [`SpeakOutcome::Failed`]; none of them
//! escapes as an `Err`.

use crate::cache::{BufferCache, DecodedBuffer, PreloadReport};
use crate::config::NarrationConfig;
use crate::controller::{PlaybackController, PlaybackSession, SessionId};
use crate::decoder::ClipDecoder;
use crate::error::{NarrationError, Result};
use crate::registry::{AudioKey, Catalog, NarrationAsset};
use crate::state::NarrationState;
use bridge_traits::{AssetFetcher, AudioOutput};
use core_async::sync::{watch, CancellationToken};
use core_async::task::JoinHandle;
use core_async::time::{interval, Duration, MissedTickBehavior};
use core_runtime::events::{CoreEvent, EventBus, NarrationEvent, OutputEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// What became of a [`NarrationService::speak`] request.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeakOutcome {
    /// The clip is playing under this session.
    Started(SessionId),
    /// A later `speak`, a `cancel` or teardown overtook the request before it
    /// could play.
    Superseded,
    /// Audio is unavailable this session; the transcript is shown instead.
    TextOnly,
    /// Nothing plays. The error has already been logged and reported.
    Failed(NarrationError),
}

impl SpeakOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, SpeakOutcome::Started(_))
    }

    pub fn session(&self) -> Option<SessionId> {
        match self {
            SpeakOutcome::Started(id) => Some(*id),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&NarrationError> {
        match self {
            SpeakOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

struct Tracker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Narration for one application session.
///
/// Create it with [`NarrationService::builder`], share it behind an `Arc`, and
/// call [`dispose`](Self::dispose) (or drop it) when the UI goes away.
pub struct NarrationService {
    catalog: Arc<Catalog>,
    cache: Arc<BufferCache>,
    controller: Arc<PlaybackController>,
    state: Arc<watch::Sender<NarrationState>>,
    events: Option<EventBus>,
    config: NarrationConfig,
    /// Bumped by every `speak` and `cancel`; a request only plays if it still
    /// holds the latest value.
    generation: AtomicU64,
    transition: Mutex<()>,
    tracker: Mutex<Option<Tracker>>,
    shutdown: CancellationToken,
    disposed: AtomicBool,
}

impl NarrationService {
    pub fn builder(catalog: Arc<Catalog>) -> NarrationServiceBuilder {
        NarrationServiceBuilder::new(catalog)
    }

    /// Assemble a service from already constructed parts.
    pub fn from_parts(
        catalog: Arc<Catalog>,
        cache: Arc<BufferCache>,
        controller: Arc<PlaybackController>,
        config: NarrationConfig,
        events: Option<EventBus>,
    ) -> Self {
        let (state, _) = watch::channel(NarrationState::default());
        Self {
            catalog,
            cache,
            controller,
            state: Arc::new(state),
            events,
            config,
            generation: AtomicU64::new(0),
            transition: Mutex::new(()),
            tracker: Mutex::new(None),
            shutdown: CancellationToken::new(),
            disposed: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Narration
    // ========================================================================

    /// Narrate `key`, replacing whatever is playing.
    ///
    /// Suspends while the clip is fetched and decoded. The previous clip keeps
    /// playing until the new one is ready, then stops immediately before the
    /// new one starts. If another `speak` or a `cancel` arrives in the
    /// meantime this request resolves to [`SpeakOutcome::Superseded`].
    #[instrument(skip(self), fields(key = %key))]
    pub async fn speak(&self, key: AudioKey) -> SpeakOutcome {
        if self.is_disposed() {
            debug!("Ignoring speak after dispose");
            return SpeakOutcome::Superseded;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit(CoreEvent::Narration(NarrationEvent::Requested {
            key: key.to_string(),
        }));

        let Some(asset) = self.catalog.get(key) else {
            return self.fail_superseding(generation, key, NarrationError::AssetUnavailable { key });
        };

        if !self.narration_available() {
            return self.show_text_only(generation, asset);
        }

        let buffer = match self.cache.get(key).await {
            Ok(buffer) => buffer,
            Err(e) => return self.fail_superseding(generation, key, e),
        };

        if self.config.resume_before_play {
            match self.controller.ensure_running().await {
                Ok(true) => self.emit(CoreEvent::Output(OutputEvent::Resumed)),
                Ok(false) => {}
                Err(e) => return self.on_environment_failure(generation, asset, e),
            }
        }

        self.commit(generation, asset, &buffer)
    }

    /// Stop narration now and drop any pending request.
    ///
    /// Text and timings stay in place so a caption can linger; use
    /// [`clear_narration`](Self::clear_narration) to remove them. Safe to call
    /// at any time, including when nothing is playing.
    pub fn cancel(&self) {
        let _transition = self.transition.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.halt_playback();
    }

    /// Reset text, timings and time, whether or not anything is playing.
    pub fn clear_narration(&self) {
        if self.state.send_if_modified(NarrationState::clear_caption) {
            debug!("Narration caption cleared");
        }
    }

    /// Resume a suspended output after the host saw a user gesture.
    ///
    /// Returns `true` if the output was resumed.
    pub async fn notify_user_interaction(&self) -> bool {
        if self.is_disposed() || !self.narration_available() {
            return false;
        }

        match self.controller.ensure_running().await {
            Ok(resumed) => {
                if resumed {
                    self.emit(CoreEvent::Output(OutputEvent::Resumed));
                }
                resumed
            }
            Err(e) => {
                warn!(error = %e, "Could not resume audio output after user interaction");
                false
            }
        }
    }

    /// Fetch and decode every recorded clip ahead of time.
    pub async fn preload_all(&self) -> PreloadReport {
        self.cache.preload(self.catalog.recorded_keys()).await
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stop playback, halt the frame tracker and close the output.
    ///
    /// Idempotent. Later `speak` calls resolve to [`SpeakOutcome::Superseded`].
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel();
        self.shutdown.cancel();
        self.controller.close();
        info!("Narration service disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub fn state(&self) -> NarrationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NarrationState> {
        self.state.subscribe()
    }

    pub fn is_speaking(&self) -> bool {
        self.state.borrow().is_speaking
    }

    pub fn narration_available(&self) -> bool {
        self.state.borrow().narration_available
    }

    /// Whether a frame tracker task is still running.
    pub fn is_tracking(&self) -> bool {
        self.tracker
            .lock()
            .as_ref()
            .is_some_and(|tracker| !tracker.handle.is_finished())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> &BufferCache {
        &self.cache
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn config(&self) -> &NarrationConfig {
        &self.config
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn commit(&self, generation: u64, asset: &NarrationAsset, buffer: &DecodedBuffer) -> SpeakOutcome {
        let _transition = self.transition.lock();
        if self.generation.load(Ordering::SeqCst) != generation || self.is_disposed() {
            debug!("Request superseded before playback");
            self.emit(CoreEvent::Narration(NarrationEvent::Superseded {
                key: asset.key.to_string(),
            }));
            return SpeakOutcome::Superseded;
        }

        // The old tracker must be gone before the controller swaps sessions,
        // or it would read the swap as a natural end.
        self.stop_tracker();
        let session = match self.controller.start(buffer) {
            Ok(session) => session,
            Err(e) => return self.disable_audio(generation, asset, e),
        };

        self.state.send_modify(|state| state.begin(asset, &session));
        self.spawn_tracker(session.clone());

        info!(session = %session.id, "Narration started");
        self.emit(CoreEvent::Narration(NarrationEvent::Started {
            key: asset.key.to_string(),
            session_id: session.id.to_string(),
            duration_ms: session.duration.as_millis() as u64,
        }));
        SpeakOutcome::Started(session.id)
    }

    fn on_environment_failure(
        &self,
        generation: u64,
        asset: &NarrationAsset,
        error: NarrationError,
    ) -> SpeakOutcome {
        let _transition = self.transition.lock();
        self.disable_audio(generation, asset, error)
    }

    /// Turn narration into text-only mode for the rest of the session.
    /// Caller holds the transition lock.
    fn disable_audio(&self, generation: u64, asset: &NarrationAsset, error: NarrationError) -> SpeakOutcome {
        error!(error = %error, "Audio output unavailable, narration disabled for this session");
        self.state
            .send_modify(|state| state.narration_available = false);
        self.emit(CoreEvent::Output(OutputEvent::Unavailable {
            message: error.to_string(),
        }));
        self.emit_failure(asset.key, &error);

        if self.generation.load(Ordering::SeqCst) == generation {
            self.stop_tracker();
            self.controller.stop();
            if self.config.text_fallback {
                self.state.send_modify(|state| state.show_text_only(asset));
            } else {
                self.state.send_modify(|state| {
                    state.end_speaking();
                });
            }
        }
        SpeakOutcome::Failed(error)
    }

    fn show_text_only(&self, generation: u64, asset: &NarrationAsset) -> SpeakOutcome {
        if !self.config.text_fallback {
            debug!("Narration unavailable and text fallback disabled");
            return SpeakOutcome::Failed(NarrationError::PlaybackEnvironmentFailure(
                "narration unavailable this session".to_string(),
            ));
        }

        let _transition = self.transition.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            return SpeakOutcome::Superseded;
        }
        self.state.send_modify(|state| state.show_text_only(asset));
        debug!("Showing transcript without audio");
        SpeakOutcome::TextOnly
    }

    /// Caller holds the transition lock.
    fn halt_playback(&self) {
        self.stop_tracker();

        let mut speaking_key = None;
        let was_speaking = self.state.send_if_modified(|state| {
            speaking_key = state.current_key;
            state.end_speaking()
        });
        let stopped = self.controller.stop();

        if was_speaking || stopped.is_some() {
            let key = stopped.map(|session| session.key).or(speaking_key);
            info!(key = ?key, "Narration cancelled");
            self.emit(CoreEvent::Narration(NarrationEvent::Cancelled {
                key: key.map(|k| k.to_string()),
            }));
        }
    }

    /// A request that fails still supersedes the clip that was playing, unless
    /// a newer request has already taken over.
    fn fail_superseding(&self, generation: u64, key: AudioKey, error: NarrationError) -> SpeakOutcome {
        {
            let _transition = self.transition.lock();
            if self.generation.load(Ordering::SeqCst) == generation {
                self.halt_playback();
            }
        }
        self.fail(key, error)
    }

    fn fail(&self, key: AudioKey, error: NarrationError) -> SpeakOutcome {
        warn!(error = %error, kind = error.kind(), "Narration skipped");
        self.emit_failure(key, &error);
        SpeakOutcome::Failed(error)
    }

    fn emit_failure(&self, key: AudioKey, error: &NarrationError) {
        self.emit(CoreEvent::Narration(NarrationEvent::Failed {
            key: key.to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
            recoverable: error.is_transient(),
        }));
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.events {
            // No subscribers is fine.
            let _ = bus.emit(event);
        }
    }

    fn spawn_tracker(&self, session: PlaybackSession) {
        let token = self.shutdown.child_token();
        let handle = core_async::spawn(track_session(
            session,
            Arc::clone(&self.state),
            self.controller.subscribe(),
            token.clone(),
            self.config.frame_interval,
            self.events.clone(),
        ));

        if let Some(previous) = self.tracker.lock().replace(Tracker { token, handle }) {
            previous.token.cancel();
        }
    }

    fn stop_tracker(&self) {
        if let Some(tracker) = self.tracker.lock().take() {
            tracker.token.cancel();
        }
    }
}

impl Drop for NarrationService {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ============================================================================
// Frame Tracker
// ============================================================================

/// Publish `current_time` every frame until `session` ends or `token` fires.
async fn track_session(
    session: PlaybackSession,
    state: Arc<watch::Sender<NarrationState>>,
    mut live: watch::Receiver<Option<PlaybackSession>>,
    token: CancellationToken,
    frame_interval: Duration,
    events: Option<EventBus>,
) {
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // The clip may already have ended between `start` and `subscribe`.
    let mut ended = !still_live(&mut live, session.id);
    while !ended {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            changed = live.changed() => {
                ended = changed.is_err() || !still_live(&mut live, session.id);
            }
            _ = ticker.tick() => publish_time(&state, &session),
        }
    }

    let completed = state.send_if_modified(|current| {
        if !current.is_session(session.id) {
            return false;
        }
        current.current_time = current.current_time.max(session.duration.as_secs_f64());
        current.end_speaking()
    });

    if completed {
        info!(session = %session.id, key = %session.key, "Narration completed");
        if let Some(bus) = events {
            let _ = bus.emit(CoreEvent::Narration(NarrationEvent::Completed {
                key: session.key.to_string(),
                session_id: session.id.to_string(),
            }));
        }
    }
}

fn still_live(live: &mut watch::Receiver<Option<PlaybackSession>>, id: SessionId) -> bool {
    live.borrow_and_update()
        .as_ref()
        .is_some_and(|session| session.id == id)
}

fn publish_time(state: &watch::Sender<NarrationState>, session: &PlaybackSession) {
    let t = session.elapsed().as_secs_f64();
    state.send_if_modified(|current| {
        if current.is_session(session.id) && t > current.current_time {
            current.current_time = t;
            true
        } else {
            false
        }
    });
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`NarrationService`].
///
/// ```rust,ignore
/// let service = NarrationService::builder(Arc::new(Catalog::builtin()))
///     .fetcher(fetcher)
///     .output(output)
///     .event_bus(event_bus.clone())
///     .build()?;
/// ```
pub struct NarrationServiceBuilder {
    catalog: Arc<Catalog>,
    fetcher: Option<Arc<dyn AssetFetcher>>,
    output: Option<Arc<dyn AudioOutput>>,
    decoder: Option<Arc<dyn ClipDecoder>>,
    config: NarrationConfig,
    events: Option<EventBus>,
}

impl NarrationServiceBuilder {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            fetcher: None,
            output: None,
            decoder: None,
            config: NarrationConfig::default(),
            events: None,
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// Replace the built-in decoder.
    pub fn decoder(mut self, decoder: Arc<dyn ClipDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn config(mut self, config: NarrationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// # Errors
    ///
    /// [`NarrationError::InvalidConfig`] if the configuration is invalid or a
    /// required bridge is missing.
    pub fn build(self) -> Result<NarrationService> {
        self.config.validate()?;

        let fetcher = self.fetcher.ok_or_else(|| {
            NarrationError::InvalidConfig("an AssetFetcher is required".to_string())
        })?;
        let output = self.output.ok_or_else(|| {
            NarrationError::InvalidConfig("an AudioOutput is required".to_string())
        })?;
        let decoder = match self.decoder {
            Some(decoder) => decoder,
            None => default_decoder()?,
        };

        let cache = BufferCache::new(Arc::clone(&self.catalog), fetcher, decoder)
            .with_config(&self.config);
        let controller = PlaybackController::new(output)
            .with_resume_before_play(self.config.resume_before_play);

        Ok(NarrationService::from_parts(
            self.catalog,
            Arc::new(cache),
            Arc::new(controller),
            self.config,
            self.events,
        ))
    }
}

#[cfg(feature = "symphonia-decoder")]
fn default_decoder() -> Result<Arc<dyn ClipDecoder>> {
    Ok(Arc::new(crate::decoder::SymphoniaClipDecoder::new()))
}

#[cfg(not(feature = "symphonia-decoder"))]
fn default_decoder() -> Result<Arc<dyn ClipDecoder>> {
    Err(NarrationError::InvalidConfig(
        "no ClipDecoder provided and the symphonia-decoder feature is disabled".to_string(),
    ))
}

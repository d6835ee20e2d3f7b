//! Hand-written bridge doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{AssetFetcher, AudioOutput, CompletionCallback, OutputState, PcmClip, VoiceId};
use bytes::Bytes;
use core_narration::{
    AudioKey, Catalog, ClipDecoder, NarrationAsset, NarrationConfig, NarrationError,
    NarrationService, WordTiming,
};
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Audio output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCall {
    Resume,
    Start(VoiceId),
    Stop(VoiceId),
    Close,
}

struct Voice {
    id: VoiceId,
    on_ended: CompletionCallback,
    stopped: bool,
}

struct Inner {
    state: OutputState,
    voices: Vec<Voice>,
    calls: Vec<OutputCall>,
    refuse_resume: bool,
    refuse_start: bool,
}

/// In-memory [`AudioOutput`].
///
/// Voices finish when the test calls [`finish`](Self::finish), or on their
/// own after the clip's duration when built with
/// [`auto_completing`](Self::auto_completing). Stopped voices keep their
/// completion callback so tests can deliver a late completion.
pub struct FakeOutput {
    inner: Arc<Mutex<Inner>>,
    auto_complete: bool,
}

impl FakeOutput {
    fn build(state: OutputState, auto_complete: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                voices: Vec::new(),
                calls: Vec::new(),
                refuse_resume: false,
                refuse_start: false,
            })),
            auto_complete,
        }
    }

    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(OutputState::Running, false))
    }

    pub fn auto_completing() -> Arc<Self> {
        Arc::new(Self::build(OutputState::Running, true))
    }

    /// Starts suspended, as a browser does before the first gesture.
    pub fn suspended() -> Arc<Self> {
        Arc::new(Self::build(OutputState::Suspended, false))
    }

    /// Suspended and blocked by host policy.
    pub fn refusing_resume() -> Arc<Self> {
        let output = Self::build(OutputState::Suspended, false);
        output.inner.lock().refuse_resume = true;
        Arc::new(output)
    }

    pub fn refusing_start() -> Arc<Self> {
        let output = Self::build(OutputState::Running, false);
        output.inner.lock().refuse_start = true;
        Arc::new(output)
    }

    /// Fire `voice`'s completion, even if it was already stopped.
    pub fn finish(&self, voice: VoiceId) {
        finish_voice(&self.inner, voice, true);
    }

    pub fn calls(&self) -> Vec<OutputCall> {
        self.inner.lock().calls.clone()
    }

    pub fn started(&self) -> Vec<VoiceId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OutputCall::Start(voice) => Some(voice),
                _ => None,
            })
            .collect()
    }

    /// Voices that are neither stopped nor finished.
    pub fn playing(&self) -> Vec<VoiceId> {
        self.inner
            .lock()
            .voices
            .iter()
            .filter(|v| !v.stopped)
            .map(|v| v.id)
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().state == OutputState::Closed
    }
}

fn finish_voice(inner: &Mutex<Inner>, voice: VoiceId, include_stopped: bool) {
    let callback = {
        let mut inner = inner.lock();
        let index = inner
            .voices
            .iter()
            .position(|v| v.id == voice && (include_stopped || !v.stopped));
        index.map(|i| inner.voices.remove(i).on_ended)
    };
    if let Some(on_ended) = callback {
        on_ended();
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    fn state(&self) -> OutputState {
        self.inner.lock().state
    }

    async fn resume(&self) -> BridgeResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(OutputCall::Resume);
        if inner.refuse_resume {
            return Err(BridgeError::NotAvailable(
                "playback blocked by host policy".into(),
            ));
        }
        if inner.state == OutputState::Suspended {
            inner.state = OutputState::Running;
        }
        Ok(())
    }

    fn start(&self, voice: VoiceId, clip: PcmClip, on_ended: CompletionCallback) -> BridgeResult<()> {
        let mut inner = self.inner.lock();
        if inner.refuse_start || inner.state == OutputState::Closed {
            return Err(BridgeError::NotAvailable("no output device".into()));
        }
        inner.calls.push(OutputCall::Start(voice));
        inner.voices.push(Voice {
            id: voice,
            on_ended,
            stopped: false,
        });

        if self.auto_complete {
            let shared = Arc::clone(&self.inner);
            let duration = clip.duration();
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                finish_voice(&shared, voice, false);
            });
        }
        Ok(())
    }

    fn stop(&self, voice: VoiceId) {
        let mut inner = self.inner.lock();
        inner.calls.push(OutputCall::Stop(voice));
        if let Some(v) = inner.voices.iter_mut().find(|v| v.id == voice) {
            v.stopped = true;
        }
    }

    fn close(&self) {
        let mut inner = self.inner.lock();
        inner.calls.push(OutputCall::Close);
        inner.voices.clear();
        inner.state = OutputState::Closed;
    }
}

// ============================================================================
// Asset fetching and decoding
// ============================================================================

/// Serves one-byte "files" whose value is the clip length in seconds.
pub struct ScriptedFetcher {
    clips: HashMap<String, u8>,
    delay: Duration,
    failures_left: AtomicUsize,
    fetches: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            clips: HashMap::new(),
            delay: Duration::ZERO,
            failures_left: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_clip(mut self, source: &str, seconds: u8) -> Self {
        self.clips.insert(source.to_string(), seconds);
        self
    }

    /// Every fetch takes `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The next `count` fetches fail with a transport error.
    pub fn failing_first(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Make the next `count` fetches fail from now on.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetFetcher for ScriptedFetcher {
    async fn fetch(&self, source: &str) -> BridgeResult<Bytes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BridgeError::OperationFailed("connection reset".into()));
        }

        self.clips
            .get(source)
            .map(|seconds| Bytes::from(vec![*seconds]))
            .ok_or_else(|| BridgeError::NotFound(source.to_string()))
    }
}

/// Turns a [`ScriptedFetcher`] byte into a silent mono clip at 100 Hz.
pub struct SecondsDecoder;

impl ClipDecoder for SecondsDecoder {
    fn decode(&self, bytes: Bytes, _extension: Option<&str>) -> Result<PcmClip, NarrationError> {
        let seconds = *bytes
            .first()
            .ok_or_else(|| NarrationError::InvalidFormat("empty file".into()))?;
        Ok(PcmClip::new(vec![0.0f32; seconds as usize * 100], 100, 1))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub const WELCOME_SECONDS: u8 = 3;
pub const TEMPERATURE_SECONDS: u8 = 5;

pub fn catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::new()
            .with_asset(
                NarrationAsset::recorded(AudioKey::MainScreenWelcome, "welcome.wav", "Olá, mundo!")
                    .with_timings(vec![
                        WordTiming::new("Olá,", 0.0, 1.5),
                        WordTiming::new("mundo!", 1.5, 3.0),
                    ]),
            )
            .with_asset(NarrationAsset::recorded(
                AudioKey::TemperatureTopic,
                "temperature.wav",
                "Eu sou muito quente.",
            ))
            .with_asset(NarrationAsset::placeholder(
                AudioKey::Credits,
                "Até a próxima aventura!",
            )),
    )
}

pub fn fetcher() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .with_clip("welcome.wav", WELCOME_SECONDS)
        .with_clip("temperature.wav", TEMPERATURE_SECONDS)
}

pub fn test_config() -> NarrationConfig {
    NarrationConfig {
        decode_on_blocking_pool: false,
        ..NarrationConfig::default()
    }
}

pub struct Harness {
    pub service: Arc<NarrationService>,
    pub output: Arc<FakeOutput>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub events: Receiver<CoreEvent>,
}

pub fn harness(fetcher: ScriptedFetcher, output: Arc<FakeOutput>) -> Harness {
    harness_with_config(fetcher, output, test_config())
}

pub fn harness_with_config(
    fetcher: ScriptedFetcher,
    output: Arc<FakeOutput>,
    config: NarrationConfig,
) -> Harness {
    let fetcher = Arc::new(fetcher);
    let bus = EventBus::new(64);
    let events = bus.subscribe();
    let service = NarrationService::builder(catalog())
        .fetcher(fetcher.clone())
        .output(output.clone())
        .decoder(Arc::new(SecondsDecoder))
        .config(config)
        .event_bus(bus)
        .build()
        .expect("valid test service");

    Harness {
        service: Arc::new(service),
        output,
        fetcher,
        events,
    }
}

/// Events received so far, without waiting.
pub fn drain(events: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

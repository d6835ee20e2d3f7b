//! Audio output bridge and the PCM clip type handed to it.
//!
//! The core decodes narration clips itself and hands fully decoded PCM to the
//! host. The host owns the physical output device, which may start out
//! suspended (browsers and some mobile platforms refuse to emit sound before
//! the first user gesture) and may fail to open entirely.

use crate::{error::Result, platform::PlatformSendSync};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Fully decoded, interleaved PCM audio.
///
/// Samples are shared behind an `Arc`, so cloning a clip to hand it to an
/// output is cheap and never copies audio data.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmClip {
    /// Interleaved samples in the range `[-1.0, 1.0]`.
    pub samples: Arc<[f32]>,
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl PcmClip {
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels,
        }
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Playback length at the clip's native sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

/// Identifies one started clip on an [`AudioOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(Uuid);

impl VoiceId {
    /// Generate a new voice identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for VoiceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of the host's output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Ready to emit sound.
    Running,
    /// Open but not emitting; must be resumed before playback is audible.
    Suspended,
    /// Released. No further playback is possible.
    Closed,
}

/// Callback invoked by the output when a voice reaches its natural end.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Host audio output capable of playing one or more decoded clips.
///
/// # Completion
///
/// `on_ended` passed to [`start`](AudioOutput::start) must be invoked at most
/// once. Outputs invoke it when the clip plays to the end and may also invoke
/// it after [`stop`](AudioOutput::stop); callers are expected to check the
/// voice identity before acting on it.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::playback::{AudioOutput, OutputState, PcmClip, VoiceId};
///
/// async fn beep(output: &dyn AudioOutput, clip: PcmClip) -> bridge_traits::error::Result<()> {
///     if output.state() == OutputState::Suspended {
///         output.resume().await?;
///     }
///     output.start(VoiceId::new(), clip, Box::new(|| println!("done")))
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioOutput: PlatformSendSync {
    /// Current device state.
    fn state(&self) -> OutputState;

    /// Bring a suspended device back to `Running`. A no-op when already running.
    async fn resume(&self) -> Result<()>;

    /// Begin emitting `clip` immediately under `voice`.
    fn start(&self, voice: VoiceId, clip: PcmClip, on_ended: CompletionCallback) -> Result<()>;

    /// Stop `voice` and release its resources. Unknown or finished voices are ignored.
    fn stop(&self, voice: VoiceId);

    /// Stop everything and release the device.
    fn close(&self);
}
